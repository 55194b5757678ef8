//! Row loading and delivery configuration edits.

use crate::config::DeliveryConfig;
use crate::error::{Error, Result};
use crate::parser;
use crate::types::{Event, RowSet, RunStatus};
use std::path::Path;
use std::sync::Arc;

use super::{Relay, RunGuard};

impl Relay {
    /// Replace the loaded rows
    ///
    /// Refused while a run is active. The status is reset to a never-run
    /// snapshot sized for the new rows.
    ///
    /// # Returns
    ///
    /// The number of data rows loaded.
    pub async fn load_rows(&self, rows: RowSet) -> Result<usize> {
        let _guard = RunGuard::claim(&self.run_control.running).ok_or(Error::RunInProgress)?;

        let count = rows.len();
        let source_name = rows.source_name.clone();
        {
            let mut session = self.session.write().await;
            session.rows = Arc::new(rows);
        }
        self.status_tx.send_replace(RunStatus::idle(count));

        tracing::info!(rows = count, source = ?source_name, "rows loaded");
        self.emit_event(Event::RowsLoaded {
            rows: count,
            source_name,
        });

        Ok(count)
    }

    /// Parse a CSV file and load its rows
    ///
    /// A parse failure leaves the previously loaded rows and status untouched.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use row_relay::{Relay, RelayConfig};
    /// # async fn example() -> row_relay::Result<()> {
    /// let relay = Relay::with_http_client(RelayConfig::default())?;
    /// let rows = relay.load_file("leads.csv").await?;
    /// println!("loaded {} rows", rows);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn load_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let rows = parser::parse_file(path).await.map_err(|e| {
            tracing::warn!(path = ?path, error = %e, "failed to parse input file");
            Error::Parse(e)
        })?;
        self.load_rows(rows).await
    }

    /// Current delivery configuration
    pub async fn delivery_config(&self) -> DeliveryConfig {
        self.session.read().await.delivery.clone()
    }

    /// Replace the whole delivery configuration
    ///
    /// An active run keeps using the configuration it started with.
    pub async fn set_delivery_config(&self, config: DeliveryConfig) {
        self.session.write().await.delivery = config;
    }

    /// Set the destination endpoint
    pub async fn set_endpoint(&self, endpoint: impl Into<String>) {
        self.session.write().await.delivery.endpoint = endpoint.into();
    }

    /// Set the source label sent with every row
    pub async fn set_source_label(&self, source_label: impl Into<String>) {
        self.session.write().await.delivery.source_label = source_label.into();
    }

    /// Set the notes sent with every row
    pub async fn set_notes(&self, notes: impl Into<String>) {
        self.session.write().await.delivery.notes = notes.into();
    }

    /// Whether rows are loaded and both required settings are filled in
    pub async fn is_ready(&self) -> bool {
        let session = self.session.read().await;
        !session.rows.is_empty() && session.delivery.is_complete()
    }
}
