//! Sequential delivery orchestrator split into focused submodules.
//!
//! The [`Relay`] struct and its methods are organized by concern:
//! - [`config_ops`] - Row loading and delivery configuration edits
//! - [`control`] - Run lifecycle control (run/start/cancel/reset)
//! - [`run_task`] - The row-by-row delivery loop

mod config_ops;
mod control;
mod run_task;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::client::{DeliveryClient, HttpDeliveryClient};
use crate::config::{DeliveryConfig, RelayConfig};
use crate::error::Result;
use crate::types::{Event, Row, RowSet, RunState, RunStatus};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

/// Rows and delivery settings edited between runs
#[derive(Clone, Debug, Default)]
pub(crate) struct Session {
    /// Parsed rows; replaced wholesale on load
    pub(crate) rows: Arc<RowSet>,
    /// Destination settings; cloned into each run at start
    pub(crate) delivery: DeliveryConfig,
}

/// Single-run guard and cancellation handle for the active run
#[derive(Clone, Default)]
pub(crate) struct RunControl {
    /// Set while a run (or a reset/load that must exclude runs) holds the relay
    pub(crate) running: Arc<AtomicBool>,
    /// Cancellation token of the active run; cleared when the run ends
    pub(crate) cancel_token: CancelSlot,
}

/// Holds the active run's cancellation token
///
/// A plain mutex so the run can clear it from a synchronous finish path,
/// including when the run future is dropped.
#[derive(Clone, Default)]
pub(crate) struct CancelSlot(Arc<std::sync::Mutex<Option<CancellationToken>>>);

impl CancelSlot {
    fn slot(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub(crate) fn install(&self, token: CancellationToken) {
        *self.slot() = Some(token);
    }

    pub(crate) fn clear(&self) {
        self.slot().take();
    }

    /// Cancel the installed token, if any
    pub(crate) fn cancel(&self) -> bool {
        match self.slot().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

/// Exclusive claim on the relay, released on drop
pub(crate) struct RunGuard {
    running: Arc<AtomicBool>,
}

impl RunGuard {
    /// Claim the relay, or `None` if something else holds it
    pub(crate) fn claim(running: &Arc<AtomicBool>) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                running: Arc::clone(running),
            })
    }

    /// Release the claim early; dropping afterwards is a no-op
    pub(crate) fn release(&self) {
        self.running.store(false, Ordering::Release);
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Delivers loaded rows one at a time to a configured endpoint
///
/// Cloneable; all clones share the same rows, configuration and run state.
/// Status is published as snapshots through a watch channel and lifecycle
/// events through a broadcast channel.
#[derive(Clone)]
pub struct Relay {
    /// Relay behaviour settings
    pub(crate) config: Arc<RelayConfig>,
    /// Transport used for every row
    pub(crate) client: Arc<dyn DeliveryClient>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Latest status snapshot; the run loop is the only writer while running
    pub(crate) status_tx: Arc<tokio::sync::watch::Sender<RunStatus>>,
    /// Rows and delivery configuration
    pub(crate) session: Arc<tokio::sync::RwLock<Session>>,
    /// Run guard and cancellation
    pub(crate) run_control: RunControl,
}

impl Relay {
    /// Create a relay that delivers through `client`
    pub fn new(config: RelayConfig, client: Arc<dyn DeliveryClient>) -> Result<Self> {
        config.validate()?;

        let (event_tx, _rx) = tokio::sync::broadcast::channel(config.event_buffer);
        let (status_tx, _status_rx) = tokio::sync::watch::channel(RunStatus::default());

        Ok(Self {
            config: Arc::new(config),
            client,
            event_tx,
            status_tx: Arc::new(status_tx),
            session: Arc::new(tokio::sync::RwLock::new(Session::default())),
            run_control: RunControl::default(),
        })
    }

    /// Create a relay that POSTs rows over HTTP
    pub fn with_http_client(config: RelayConfig) -> Result<Self> {
        let client = HttpDeliveryClient::new(&config)?;
        Self::new(config, Arc::new(client))
    }

    /// Subscribe to relay events
    ///
    /// Each subscriber receives all events independently. A subscriber that
    /// falls more than `event_buffer` events behind gets `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Watch status snapshots as they are published
    pub fn watch_status(&self) -> tokio::sync::watch::Receiver<RunStatus> {
        self.status_tx.subscribe()
    }

    /// Current status snapshot
    pub fn status(&self) -> RunStatus {
        self.status_tx.borrow().clone()
    }

    /// Current lifecycle state
    pub fn state(&self) -> RunState {
        self.status_tx.borrow().state()
    }

    /// Whether a run is active
    pub fn is_running(&self) -> bool {
        self.run_control.running.load(Ordering::Acquire)
    }

    /// Currently loaded rows
    pub async fn rows(&self) -> Arc<RowSet> {
        Arc::clone(&self.session.read().await.rows)
    }

    /// First rows of the loaded set, as many as `preview_rows` allows
    pub async fn preview(&self) -> Vec<Row> {
        let session = self.session.read().await;
        session.rows.preview(self.config.preview_rows).to_vec()
    }

    /// Emit an event to all subscribers; dropped when nobody listens
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
