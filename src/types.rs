//! Core types for row-relay

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;

/// One record of a tabular file
///
/// Column names are shared by every row parsed from the same file. Values line
/// up with the columns positionally, so iteration order is header order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<String>,
}

impl Row {
    /// Create a row over a shared column set
    ///
    /// Missing trailing values are filled with empty strings and values beyond
    /// the column count are dropped, so a row always has one value per column.
    pub fn new(columns: Arc<[String]>, mut values: Vec<String>) -> Self {
        values.resize(columns.len(), String::new());
        Self { columns, values }
    }

    /// Build a standalone row from `(column, value)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let (columns, values): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    /// Value of the first column with this name
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i].as_str())
    }

    /// Column names in header order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// `(column, value)` pairs in header order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Rows parsed from one file, in file order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RowSet {
    /// Column names from the header line
    pub headers: Vec<String>,
    /// Data rows; their order is the delivery order
    pub rows: Vec<Row>,
    /// File name the rows were read from, when known
    pub source_name: Option<String>,
}

impl RowSet {
    /// Build a row set from already-parsed rows
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            headers,
            rows,
            source_name: None,
        }
    }

    /// Attach the name of the file the rows came from
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first `limit` rows
    pub fn preview(&self, limit: usize) -> &[Row] {
        &self.rows[..limit.min(self.rows.len())]
    }
}

impl From<Vec<Row>> for RowSet {
    fn from(rows: Vec<Row>) -> Self {
        let headers = rows
            .first()
            .map(|r| r.columns().to_vec())
            .unwrap_or_default();
        Self::new(headers, rows)
    }
}

/// Result of one delivery attempt
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// The destination accepted the row
    Success,
    /// The destination rejected the row or could not be reached
    Failure {
        /// Human-readable reason
        reason: String,
    },
}

impl DeliveryOutcome {
    /// Build a failure outcome
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    /// Whether this is [`DeliveryOutcome::Success`]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// A row that failed, with the reason
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    /// The row as it was sent
    pub row: Row,
    /// Why delivery failed
    pub reason: String,
}

/// Progress of the current or most recent run
///
/// Published as an immutable snapshot after every change. For every snapshot
/// `processed == successful + failed`, `processed <= total` and
/// `failures.len() == failed`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunStatus {
    /// Rows in the working subset (1 for a test run)
    pub total: usize,
    /// Rows whose delivery attempt finished
    pub processed: usize,
    /// Rows delivered successfully
    pub successful: usize,
    /// Rows that failed
    pub failed: usize,
    /// Row currently being delivered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_row: Option<Row>,
    /// Failed rows in processing order
    pub failures: Vec<FailureRecord>,
    /// Whether the run loop is active
    pub running: bool,
    /// Whether this run only delivers the first row
    pub test_run: bool,
    /// Whether the run stopped early because cancellation was requested
    pub cancelled: bool,
    /// When the run started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the run ended
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunStatus {
    /// Status before any run, sized for `total` loaded rows
    pub fn idle(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Completion percentage, rounded to the nearest whole number
    pub fn progress_percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.processed as f64 / self.total as f64) * 100.0).round() as u8
    }

    /// Whether every row of the subset has been attempted
    pub fn is_complete(&self) -> bool {
        self.processed > 0 && self.processed == self.total
    }

    /// Lifecycle state described by this snapshot
    pub fn state(&self) -> RunState {
        if self.running {
            RunState::Running
        } else if self.finished_at.is_none() {
            RunState::Idle
        } else if self.cancelled {
            RunState::Cancelled
        } else {
            RunState::Completed
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} processed ({}%), {} successful, {} failed",
            self.processed,
            self.total,
            self.progress_percent(),
            self.successful,
            self.failed
        )
    }
}

/// Lifecycle of the relay's run loop
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// No run has happened since the last load or reset
    Idle,
    /// A run is delivering rows
    Running,
    /// The last run attempted every row of its subset
    Completed,
    /// The last run stopped early on request
    Cancelled,
}

/// Event emitted during the relay lifecycle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A new row set replaced the previous one
    RowsLoaded {
        /// Number of data rows
        rows: usize,
        /// File name, when known
        source_name: Option<String>,
    },

    /// A run started
    RunStarted {
        /// Rows in the working subset
        total: usize,
        /// Whether only the first row will be delivered
        test_run: bool,
    },

    /// Delivery of a row started
    RowStarted {
        /// Zero-based position of the row in the subset
        index: usize,
    },

    /// A row was delivered successfully
    RowDelivered {
        /// Zero-based position of the row in the subset
        index: usize,
    },

    /// A row failed
    RowFailed {
        /// Zero-based position of the row in the subset
        index: usize,
        /// Why delivery failed
        reason: String,
    },

    /// A run ended, either exhausted or cancelled
    RunFinished {
        /// Rows attempted
        processed: usize,
        /// Rows delivered
        successful: usize,
        /// Rows failed
        failed: usize,
        /// Whether the run stopped early
        cancelled: bool,
    },

    /// Rows, configuration and status were cleared
    Reset,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Arc<[String]> {
        names.iter().map(|s| s.to_string()).collect::<Vec<_>>().into()
    }

    #[test]
    fn row_pads_short_values_and_drops_extras() {
        let cols = columns(&["a", "b", "c"]);
        let short = Row::new(cols.clone(), vec!["1".into()]);
        assert_eq!(short.get("a"), Some("1"));
        assert_eq!(short.get("c"), Some(""));

        let long = Row::new(cols, vec!["1".into(), "2".into(), "3".into(), "4".into()]);
        assert_eq!(long.len(), 3);
    }

    #[test]
    fn row_serializes_in_column_order() {
        let row = Row::from_pairs([("zeta", "1"), ("alpha", "2")]);
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"zeta":"1","alpha":"2"}"#);
    }

    #[test]
    fn preview_is_clamped_to_row_count() {
        let rows: RowSet = vec![
            Row::from_pairs([("Name", "A")]),
            Row::from_pairs([("Name", "B")]),
        ]
        .into();
        assert_eq!(rows.headers, vec!["Name".to_string()]);
        assert_eq!(rows.preview(5).len(), 2);
        assert_eq!(rows.preview(1)[0].get("Name"), Some("A"));
    }

    #[test]
    fn progress_percent_rounds() {
        let status = RunStatus {
            total: 3,
            processed: 2,
            ..Default::default()
        };
        assert_eq!(status.progress_percent(), 67);
        assert_eq!(RunStatus::idle(0).progress_percent(), 0);
    }

    #[test]
    fn is_complete_requires_progress() {
        assert!(!RunStatus::idle(0).is_complete());
        let status = RunStatus {
            total: 2,
            processed: 2,
            successful: 2,
            ..Default::default()
        };
        assert!(status.is_complete());
    }

    #[test]
    fn state_follows_flags() {
        let mut status = RunStatus::idle(4);
        assert_eq!(status.state(), RunState::Idle);
        status.running = true;
        assert_eq!(status.state(), RunState::Running);
        status.running = false;
        status.finished_at = Some(Utc::now());
        assert_eq!(status.state(), RunState::Completed);
        status.cancelled = true;
        assert_eq!(status.state(), RunState::Cancelled);
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let json = serde_json::to_value(Event::RowFailed {
            index: 1,
            reason: "Server responded with status 500".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "row_failed");
        assert_eq!(json["index"], 1);
    }
}
