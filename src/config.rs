//! Configuration types for row-relay

use crate::error::{Error, Result, ValidationError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where and how rows are delivered
///
/// Edited freely between runs. A run clones the configuration when it starts,
/// so later edits never reach an in-flight run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Destination URL every row is POSTed to (required)
    #[serde(default)]
    pub endpoint: String,

    /// Label sent as the `source` field of every payload (required)
    #[serde(default)]
    pub source_label: String,

    /// Free text sent as the `notes` field of every payload
    #[serde(default)]
    pub notes: String,
}

impl DeliveryConfig {
    /// Create a configuration with the two required fields and empty notes
    pub fn new(endpoint: impl Into<String>, source_label: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            source_label: source_label.into(),
            notes: String::new(),
        }
    }

    /// Builder-style setter for notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Whether both required fields are filled in (ignoring whitespace)
    pub fn is_complete(&self) -> bool {
        !self.endpoint.trim().is_empty() && !self.source_label.trim().is_empty()
    }

    /// Check that a run can be started with this configuration
    ///
    /// Fields are checked in order: endpoint presence, source label presence,
    /// then endpoint URL shape.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ValidationError::MissingEndpoint);
        }
        if self.source_label.trim().is_empty() {
            return Err(ValidationError::MissingSourceLabel);
        }

        let parsed = url::Url::parse(endpoint).map_err(|e| ValidationError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(ValidationError::InvalidEndpoint {
                endpoint: self.endpoint.clone(),
                reason: format!("unsupported scheme '{}'", other),
            }),
        }
    }
}

/// Relay behaviour settings
///
/// Every field has a default, so an empty JSON object is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Pause between consecutive deliveries in milliseconds (default: 200)
    ///
    /// Acts as a simple rate limit toward the destination. The pause is skipped
    /// after the last row and cut short by cancellation.
    #[serde(default = "default_pacing_interval", with = "millis_serde")]
    pub pacing_interval: Duration,

    /// Per-request timeout in milliseconds (default: none)
    ///
    /// Without a timeout a destination that never answers stalls the run until
    /// the transport gives up on its own.
    #[serde(default, with = "optional_millis_serde")]
    pub request_timeout: Option<Duration>,

    /// User-Agent header sent with every delivery
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Capacity of the event broadcast channel (default: 1000)
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Number of rows returned by [`RowSet::preview`](crate::types::RowSet::preview)
    /// when callers use the configured default (default: 5)
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            pacing_interval: default_pacing_interval(),
            request_timeout: None,
            user_agent: default_user_agent(),
            event_buffer: default_event_buffer(),
            preview_rows: default_preview_rows(),
        }
    }
}

impl RelayConfig {
    /// Reject settings the relay cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer == 0 {
            return Err(Error::Config {
                message: "event_buffer must be greater than zero".to_string(),
                key: Some("event_buffer".to_string()),
            });
        }
        Ok(())
    }
}

/// Default pause between deliveries
pub const DEFAULT_PACING_INTERVAL: Duration = Duration::from_millis(200);

/// Default number of preview rows
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

fn default_pacing_interval() -> Duration {
    DEFAULT_PACING_INTERVAL
}

fn default_user_agent() -> String {
    concat!("row-relay/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_event_buffer() -> usize {
    1000
}

fn default_preview_rows() -> usize {
    DEFAULT_PREVIEW_ROWS
}

mod millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

mod optional_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
