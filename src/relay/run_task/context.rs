//! Run context — configuration snapshot, status publishing and guarded delivery.

use crate::client::DeliveryClient;
use crate::config::DeliveryConfig;
use crate::types::{DeliveryOutcome, Event, Row, RowSet, RunStatus};
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use super::super::{CancelSlot, RunGuard};

/// Writes status snapshots; held only by the active run loop
pub(crate) struct StatusPublisher {
    tx: Arc<tokio::sync::watch::Sender<RunStatus>>,
}

impl StatusPublisher {
    pub(crate) fn new(tx: Arc<tokio::sync::watch::Sender<RunStatus>>) -> Self {
        Self { tx }
    }

    /// Apply one complete mutation and notify observers
    ///
    /// Observers never see a half-applied change, so counter invariants hold
    /// for every snapshot.
    pub(crate) fn update(&self, mutate: impl FnOnce(&mut RunStatus)) {
        self.tx.send_modify(mutate);
    }
}

/// Everything one run needs, captured when the run starts
pub(crate) struct RunContext {
    pub(crate) rows: Arc<RowSet>,
    /// Delivery settings as they were at start; later edits do not apply
    pub(crate) delivery: DeliveryConfig,
    pub(crate) test_only: bool,
    pub(crate) cancel_token: tokio_util::sync::CancellationToken,
    pub(crate) client: Arc<dyn DeliveryClient>,
    pub(crate) pacing_interval: Duration,
    pub(crate) status: StatusPublisher,
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Relay-wide slot holding `cancel_token`; emptied when the run ends
    pub(crate) cancel_slot: CancelSlot,
    pub(crate) guard: RunGuard,
    /// Set once the terminal status has been published
    pub(crate) finished: bool,
}

impl RunContext {
    /// Rows this run delivers: only the first for a test run
    pub(super) fn subset(&self) -> &[Row] {
        let rows = &self.rows.rows;
        if self.test_only {
            &rows[..rows.len().min(1)]
        } else {
            rows
        }
    }

    pub(super) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Publish the terminal status, emit `RunFinished` and release the relay
    ///
    /// The guard is released inside the final update so a new run can only
    /// publish after observers have seen this one end.
    pub(super) fn finish(&mut self, cancelled: bool) -> RunStatus {
        self.cancel_slot.clear();

        let mut final_status = RunStatus::default();
        self.status.update(|status| {
            status.current_row = None;
            status.running = false;
            status.cancelled = cancelled;
            status.finished_at = Some(Utc::now());
            self.emit(Event::RunFinished {
                processed: status.processed,
                successful: status.successful,
                failed: status.failed,
                cancelled,
            });
            self.guard.release();
            final_status = status.clone();
        });
        self.finished = true;

        tracing::info!(
            processed = final_status.processed,
            successful = final_status.successful,
            failed = final_status.failed,
            cancelled,
            "delivery run finished"
        );

        final_status
    }

    /// Deliver one row, turning a panicking client into a failure outcome
    pub(super) async fn deliver(&self, index: usize, row: &Row) -> DeliveryOutcome {
        let attempt = AssertUnwindSafe(self.client.deliver(row, &self.delivery));
        match attempt.catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => {
                let reason = format!("Delivery client panicked: {}", panic_message(&*payload));
                tracing::error!(row = index, reason = %reason, "delivery client panicked");
                DeliveryOutcome::Failure { reason }
            }
        }
    }
}

impl Drop for RunContext {
    fn drop(&mut self) {
        // The run future was dropped mid-run
        if !self.finished {
            tracing::warn!("delivery run abandoned before completion");
            self.finish(true);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
