//! Dispatcher configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use stats_dispatcher::domain::DispatcherConfigBuilder;
//! use std::time::Duration;
//!
//! let config = DispatcherConfigBuilder::new()
//!     .realtime_interval(Duration::from_secs(2))
//!     .poll_lookback_minutes(30)
//!     .build()
//!     .expect("Valid config");
//! ```

use serde::{Deserialize, Serialize};
use stats_types::PollOptions;
use std::env;
use std::time::Duration;

use super::message::{MessageBuilder, DEFAULT_NOISE_FILTER};
use super::source::Cadence;
use crate::error::DispatchError;

/// Shortest interval a timer may be armed with.
pub const MIN_INTERVAL: Duration = Duration::from_millis(5);

/// Dispatcher configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Period of the standard timer
    pub standard_interval: Duration,
    /// Period of the realtime timer
    pub realtime_interval: Duration,
    /// Sample step sent with every request
    pub poll_step: u64,
    /// How far back each request's window starts, in minutes
    pub poll_lookback_minutes: u64,
    /// Metric types never requested
    pub noise_filter: Vec<String>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            standard_interval: Duration::from_millis(60_000),
            realtime_interval: Duration::from_millis(5_000),
            poll_step: 10,
            poll_lookback_minutes: 10,
            noise_filter: DEFAULT_NOISE_FILTER.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DispatcherConfig {
    /// Validate ranges.
    pub fn validate(&self) -> Result<(), DispatchError> {
        for (cadence, interval) in [
            (Cadence::Standard, self.standard_interval),
            (Cadence::Realtime, self.realtime_interval),
        ] {
            if interval < MIN_INTERVAL {
                return Err(DispatchError::InvalidConfig(format!(
                    "{cadence} interval {interval:?} is below {MIN_INTERVAL:?}"
                )));
            }
        }

        if self.poll_step == 0 {
            return Err(DispatchError::InvalidConfig(
                "poll_step cannot be 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Load from environment variables, falling back to defaults.
    ///
    /// # Environment Variables
    ///
    /// - `STATS_STANDARD_INTERVAL_MS`: standard timer period (default: 60000)
    /// - `STATS_REALTIME_INTERVAL_MS`: realtime timer period (default: 5000)
    /// - `STATS_POLL_STEP`: request step (default: 10)
    /// - `STATS_POLL_LOOKBACK_MINUTES`: request window (default: 10)
    pub fn from_env() -> Result<Self, DispatchError> {
        let mut builder = DispatcherConfigBuilder::new();

        if let Some(ms) = read_u64("STATS_STANDARD_INTERVAL_MS")? {
            builder = builder.standard_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = read_u64("STATS_REALTIME_INTERVAL_MS")? {
            builder = builder.realtime_interval(Duration::from_millis(ms));
        }
        if let Some(step) = read_u64("STATS_POLL_STEP")? {
            builder = builder.poll_step(step);
        }
        if let Some(minutes) = read_u64("STATS_POLL_LOOKBACK_MINUTES")? {
            builder = builder.poll_lookback_minutes(minutes);
        }

        builder.build()
    }

    /// Timer period for a cadence.
    pub fn interval(&self, cadence: Cadence) -> Duration {
        match cadence {
            Cadence::Standard => self.standard_interval,
            Cadence::Realtime => self.realtime_interval,
        }
    }

    pub fn poll_options(&self) -> PollOptions {
        PollOptions::new(self.poll_step, self.poll_lookback_minutes)
    }

    /// Message builder honoring the noise filter and polling window.
    pub fn message_builder(&self) -> MessageBuilder {
        MessageBuilder::new(self.noise_filter.clone(), self.poll_options())
    }
}

fn read_u64(var: &str) -> Result<Option<u64>, DispatchError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| DispatchError::InvalidConfig(format!("{var}={raw:?}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Builder for DispatcherConfig with validation
#[derive(Default)]
pub struct DispatcherConfigBuilder {
    standard_interval: Option<Duration>,
    realtime_interval: Option<Duration>,
    poll_step: Option<u64>,
    poll_lookback_minutes: Option<u64>,
    noise_filter: Option<Vec<String>>,
}

impl DispatcherConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standard_interval(mut self, interval: Duration) -> Self {
        self.standard_interval = Some(interval);
        self
    }

    pub fn realtime_interval(mut self, interval: Duration) -> Self {
        self.realtime_interval = Some(interval);
        self
    }

    pub fn poll_step(mut self, step: u64) -> Self {
        self.poll_step = Some(step);
        self
    }

    pub fn poll_lookback_minutes(mut self, minutes: u64) -> Self {
        self.poll_lookback_minutes = Some(minutes);
        self
    }

    /// Replace the set of metric types that are never requested.
    pub fn noise_filter<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.noise_filter = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Build the DispatcherConfig, validating all parameters
    pub fn build(self) -> Result<DispatcherConfig, DispatchError> {
        let defaults = DispatcherConfig::default();

        let config = DispatcherConfig {
            standard_interval: self.standard_interval.unwrap_or(defaults.standard_interval),
            realtime_interval: self.realtime_interval.unwrap_or(defaults.realtime_interval),
            poll_step: self.poll_step.unwrap_or(defaults.poll_step),
            poll_lookback_minutes: self
                .poll_lookback_minutes
                .unwrap_or(defaults.poll_lookback_minutes),
            noise_filter: self.noise_filter.unwrap_or(defaults.noise_filter),
        };

        config.validate()?;
        Ok(config)
    }
}
