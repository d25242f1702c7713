//! Error types for the stats dispatcher

use crate::domain::Cadence;
use thiserror::Error;

/// Errors that can occur while dispatching stats requests.
///
/// None of these is fatal: the dispatcher logs and carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// An add-listener request named a source missing from the catalog.
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// A listener asked for a key the source does not currently offer.
    #[error("Key {key:?} is not available on source {source_name}")]
    KeyUnavailable { source_name: String, key: String },

    /// A cadence was asked to start with nothing to dispatch.
    #[error("No jobs installed for {0} cadence")]
    EmptyJobList(Cadence),

    /// Input failed validation, e.g. an empty key.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Configuration values out of range or unparsable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DispatchError {
    /// Short label used for the listener rejection metric.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::SourceNotFound(_) => "source_not_found",
            Self::KeyUnavailable { .. } => "key_unavailable",
            Self::EmptyJobList(_) => "empty_job_list",
            Self::MalformedInput(_) => "malformed_input",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}
