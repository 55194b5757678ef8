//! Error types for row-relay
//!
//! Only hard stops are modelled here:
//! - [`ParseError`] when an input file cannot be turned into rows
//! - [`ValidationError`] when a run is requested with incomplete configuration
//! - run guard violations ([`Error::RunInProgress`], [`Error::NoRows`])
//!
//! Per-row delivery problems are never errors. They are recorded as
//! [`DeliveryOutcome::Failure`](crate::types::DeliveryOutcome) values in the run status.

use thiserror::Error;

/// Result type alias for row-relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for row-relay
#[derive(Debug, Error)]
pub enum Error {
    /// The input file could not be parsed into rows
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The delivery configuration is incomplete or invalid
    #[error("invalid delivery configuration: {0}")]
    Validation(#[from] ValidationError),

    /// Relay configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "event_buffer")
        key: Option<String>,
    },

    /// A run was requested but no rows are loaded
    #[error("no rows loaded")]
    NoRows,

    /// A run is already active; the operation must wait until it ends
    #[error("a delivery run is already in progress")]
    RunInProgress,

    /// The spawned run task ended abnormally
    #[error("delivery task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// HTTP client construction failed
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Errors raised while reading tabular input
#[derive(Debug, Error)]
pub enum ParseError {
    /// The input could not be read at all
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// The input has no header line (empty file or header without columns)
    #[error("input has no header row")]
    MissingHeader,

    /// The header line could not be decoded
    #[error("malformed header row: {0}")]
    Header(String),
}

/// Missing or invalid delivery configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No destination endpoint configured
    #[error("endpoint is required")]
    MissingEndpoint,

    /// No source label configured
    #[error("source label is required")]
    MissingSourceLabel,

    /// The endpoint is not an absolute http(s) URL
    #[error("endpoint '{endpoint}' is not a valid http(s) URL: {reason}")]
    InvalidEndpoint {
        /// The endpoint as configured
        endpoint: String,
        /// Why it was rejected
        reason: String,
    },
}

impl Error {
    /// Whether this error came from configuration validation
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}
