//! Message building
//!
//! Turns one key of a source into one `StatsRequest`. The response-event name
//! tells the subscriber which series came back; the data items name every
//! `{source, type, dataset}` triple to sample.

use stats_types::{DataItem, PollOptions, RequestArgs, StatsRequest};

use super::source::{KeyMode, MetricSource};
use crate::error::DispatchError;

/// Metric types that are never requested.
pub const DEFAULT_NOISE_FILTER: [&str; 2] = ["cpu-idle", "ps_state-idle"];

/// Dataset name for single-series metric types.
const VALUE_DATASET: &str = "value";

/// Uppercase the first character.
///
/// # Errors
///
/// `MalformedInput` for an empty string.
pub fn capitalize(s: &str) -> Result<String, DispatchError> {
    let mut chars = s.chars();
    let first = chars
        .next()
        .ok_or_else(|| DispatchError::MalformedInput("cannot capitalize an empty key".into()))?;
    Ok(first.to_uppercase().chain(chars).collect())
}

/// Builds request messages for a source.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    noise_filter: Vec<String>,
    options: PollOptions,
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new(
            DEFAULT_NOISE_FILTER.iter().map(|s| s.to_string()).collect(),
            PollOptions::default(),
        )
    }
}

impl MessageBuilder {
    pub fn new(noise_filter: Vec<String>, options: PollOptions) -> Self {
        Self {
            noise_filter,
            options,
        }
    }

    pub fn options(&self) -> &PollOptions {
        &self.options
    }

    fn is_noise(&self, metric_type: &str) -> bool {
        self.noise_filter.iter().any(|n| n == metric_type)
    }

    /// Response-event name for `key`.
    ///
    /// Prefix-matched sources append the feed suffix verbatim. Otherwise the
    /// capitalized key is appended unless it merely repeats the source name.
    pub fn response_event(&self, key: &str, source: &MetricSource) -> Result<String, DispatchError> {
        if source.mode().is_prefix_matched() {
            return Ok(format!("{}{}", source.name(), source.strip_prefix(key)));
        }

        let capitalized = capitalize(key)?;
        if source.name().eq_ignore_ascii_case(&capitalized) {
            Ok(source.name().to_string())
        } else {
            Ok(format!("{}{}", source.name(), capitalized))
        }
    }

    /// Build the request for one key.
    ///
    /// For prefix-matched sources `key` is a full feed id; for the others it
    /// is appended to the source prefix.
    pub fn build(&self, key: &str, source: &MetricSource) -> Result<StatsRequest, DispatchError> {
        let feed = if source.mode().is_prefix_matched() {
            key.to_string()
        } else {
            format!("{}{}", source.prefix(), key)
        };
        let response_event = self.response_event(key, source)?;

        let mut items = Vec::new();
        for property in source.properties() {
            if self.is_noise(property) {
                continue;
            }
            match source.mode() {
                KeyMode::DatasetKeys { datasets_type, .. } => {
                    items.push(DataItem::new(
                        datasets_type.as_str(),
                        datasets_type.as_str(),
                        property.as_str(),
                    ));
                }
                KeyMode::Bidirectional { forward, reverse } => {
                    items.push(DataItem::new(&*feed, property.as_str(), forward.as_str()));
                    items.push(DataItem::new(&*feed, property.as_str(), reverse.as_str()));
                }
                KeyMode::Wildcard | KeyMode::ExplicitKeys(_) => {
                    items.push(DataItem::new(&*feed, property.as_str(), VALUE_DATASET));
                }
            }
        }

        let legend_prefix = source
            .descriptor()
            .legend_prefix
            .as_ref()
            .map(|legend| format!("{feed}{legend}"));

        Ok(StatsRequest {
            response_event,
            legend_prefix,
            args: RequestArgs(items, self.options.clone()),
        })
    }
}
