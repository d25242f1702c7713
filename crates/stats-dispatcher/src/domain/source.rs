//! Metric source descriptors
//!
//! A source pairs a static descriptor (name, feed prefix, key mode, cadence)
//! with the state the dispatcher derives at runtime: which feeds are live,
//! which metric types they offer, and who is listening.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::listeners::ListenerSet;

/// Which timer a source's job is replayed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cadence {
    /// Slow loop, one minute by default.
    Standard,
    /// Fast loop, five seconds by default.
    Realtime,
}

impl Cadence {
    /// Both cadences, standard first.
    pub const ALL: [Cadence; 2] = [Cadence::Standard, Cadence::Realtime];

    /// Lowercase label for logs and metrics.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Realtime => "realtime",
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a source turns listener keys into feed ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyMode {
    /// Every announced feed starting with the prefix.
    Wildcard,
    /// A fixed list of keys, each naming the feed `prefix + key`.
    ExplicitKeys(Vec<String>),
    /// One announced feed whose sub-series are the declared keys.
    DatasetKeys {
        /// Feed id that must be announced, also used as source and type.
        datasets_type: String,
        /// Sub-series requested from that feed.
        keys: Vec<String>,
    },
    /// Prefix-matched like `Wildcard`; every metric type is requested in
    /// both directions of the pair.
    Bidirectional {
        /// First direction, e.g. `rx`.
        forward: String,
        /// Second direction, e.g. `tx`.
        reverse: String,
    },
}

impl KeyMode {
    /// `true` for modes whose keys are concrete feed ids matched by prefix.
    #[must_use]
    pub fn is_prefix_matched(&self) -> bool {
        matches!(self, Self::Wildcard | Self::Bidirectional { .. })
    }

    /// Keys declared up front. Empty for prefix-matched modes.
    #[must_use]
    pub fn declared_keys(&self) -> &[String] {
        match self {
            Self::ExplicitKeys(keys) | Self::DatasetKeys { keys, .. } => keys,
            Self::Wildcard | Self::Bidirectional { .. } => &[],
        }
    }

    /// Build a bidirectional mode from `"a/b"`.
    ///
    /// Returns `None` unless the input has exactly two non-empty halves.
    #[must_use]
    pub fn bidirectional(pair: &str) -> Option<Self> {
        let (forward, reverse) = pair.split_once('/')?;
        if forward.is_empty() || reverse.is_empty() || reverse.contains('/') {
            return None;
        }
        Some(Self::Bidirectional {
            forward: forward.to_string(),
            reverse: reverse.to_string(),
        })
    }
}

/// Static description of a metric source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Catalog name, e.g. `Cpu`. Also the stem of response-event names.
    pub name: String,
    /// Feed-id prefix, e.g. `cpu-`. May be empty.
    pub prefix: String,
    /// Appended to the feed id to form the chart legend prefix.
    pub legend_prefix: Option<String>,
    /// Key expansion mode.
    pub mode: KeyMode,
    /// Timer the source's job runs on.
    pub cadence: Cadence,
}

impl SourceDescriptor {
    /// Create a descriptor without a legend prefix.
    pub fn new(
        name: impl Into<String>,
        prefix: impl Into<String>,
        mode: KeyMode,
        cadence: Cadence,
    ) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            legend_prefix: None,
            mode,
            cadence,
        }
    }

    /// Set the legend prefix.
    #[must_use]
    pub fn with_legend_prefix(mut self, legend_prefix: impl Into<String>) -> Self {
        self.legend_prefix = Some(legend_prefix.into());
        self
    }
}

/// A catalog entry plus its runtime state.
#[derive(Debug, Clone)]
pub struct MetricSource {
    descriptor: SourceDescriptor,
    /// Live feed ids (or the datasets type) this source can request.
    pub(crate) available: Vec<String>,
    /// Metric types requested for every key.
    pub(crate) properties: Vec<String>,
    /// Active registrations.
    pub(crate) listeners: ListenerSet,
}

impl MetricSource {
    /// Wrap a descriptor with empty runtime state.
    pub fn new(descriptor: SourceDescriptor) -> Self {
        Self {
            descriptor,
            available: Vec::new(),
            properties: Vec::new(),
            listeners: ListenerSet::new(),
        }
    }

    pub fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn prefix(&self) -> &str {
        &self.descriptor.prefix
    }

    pub fn mode(&self) -> &KeyMode {
        &self.descriptor.mode
    }

    pub fn cadence(&self) -> Cadence {
        self.descriptor.cadence
    }

    pub fn available(&self) -> &[String] {
        &self.available
    }

    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    pub fn listeners(&self) -> &ListenerSet {
        &self.listeners
    }

    pub fn has_listeners(&self) -> bool {
        !self.listeners.is_empty()
    }

    /// Strip this source's prefix from a feed id, leaving ids without it as-is.
    #[must_use]
    pub fn strip_prefix<'a>(&self, feed_id: &'a str) -> &'a str {
        feed_id.strip_prefix(self.prefix()).unwrap_or(feed_id)
    }

    /// Keys a named listener may ask for.
    ///
    /// Prefix-matched sources offer the suffixes of their live feeds; the
    /// others offer their declared keys.
    #[must_use]
    pub fn current_keys(&self) -> Vec<String> {
        if self.mode().is_prefix_matched() {
            self.available
                .iter()
                .map(|id| self.strip_prefix(id).to_string())
                .collect()
        } else {
            self.mode().declared_keys().to_vec()
        }
    }

    /// Keys a listener without a named key receives: one per live feed, in
    /// the form the message builder expects for this mode.
    #[must_use]
    pub fn all_keys(&self) -> Vec<String> {
        match self.mode() {
            KeyMode::ExplicitKeys(_) => self
                .available
                .iter()
                .map(|id| self.strip_prefix(id).to_string())
                .collect(),
            KeyMode::Wildcard | KeyMode::Bidirectional { .. } | KeyMode::DatasetKeys { .. } => {
                self.available.clone()
            }
        }
    }

    /// Builder key for a listener's named key.
    ///
    /// Prefix-matched keys are feed suffixes and keep their case so the
    /// result is the live feed id; declared keys are lowercased.
    #[must_use]
    pub fn named_key(&self, key: &str) -> String {
        if self.mode().is_prefix_matched() {
            format!("{}{}", self.prefix(), key)
        } else {
            key.to_lowercase()
        }
    }
}
