//! Error types for alert correlation and investigation.

use thiserror::Error;

/// Errors raised while talking to Grafana or interpreting LLM output.
///
/// These never escape [`crate::Investigator::investigate`]; that boundary
/// folds them into an [`crate::InvestigationResult::Failed`] value.
#[derive(Debug, Error)]
pub enum InvestigatorError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Grafana answered with a non-success status
    #[error("Request to {path} failed with status {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    /// Response body or LLM content was not the JSON we expected
    #[error("{0}")]
    Serialization(#[from] serde_json::Error),

    /// Completion response had no `choices[0].message.content`
    #[error("No content in LLM response")]
    NoContent,

    /// Client configuration is unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Another investigation is still loading
    #[error("Investigation of alert {index} is already in progress")]
    Busy { index: usize },

    /// No alert at the requested row
    #[error("No active alert at index {index} ({count} loaded)")]
    InvalidIndex { index: usize, count: usize },
}

/// Result alias used across the crate.
pub type Result<T, E = InvestigatorError> = std::result::Result<T, E>;
