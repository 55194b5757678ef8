//! Run orchestration — top-level lifecycle for a single delivery run.

use crate::types::{DeliveryOutcome, Event, FailureRecord, RunStatus};
use chrono::Utc;

use super::context::RunContext;

/// Core run loop -- delivers the working subset strictly in order.
///
/// Phases:
/// 1. Publish a fresh status for the subset
/// 2. For each row: check cancellation, deliver, record the outcome, pause
/// 3. Publish the final status and release the run guard
///
/// Cancellation is honoured before each row and during the pause. A delivery
/// that has started always completes and is counted, unless the future itself
/// is dropped; the context then publishes a cancelled final status.
pub(crate) async fn run_delivery(mut ctx: RunContext) -> RunStatus {
    let subset = ctx.subset();
    let total = subset.len();
    let test_run = ctx.test_only;

    ctx.status.update(|status| {
        *status = RunStatus {
            total,
            running: true,
            test_run,
            started_at: Some(Utc::now()),
            ..Default::default()
        };
    });
    tracing::info!(
        total,
        test_run,
        endpoint = %ctx.delivery.endpoint,
        "delivery run started"
    );
    ctx.emit(Event::RunStarted { total, test_run });

    let mut cancelled = false;

    for (index, row) in subset.iter().enumerate() {
        if ctx.cancel_token.is_cancelled() {
            cancelled = true;
            break;
        }

        ctx.status
            .update(|status| status.current_row = Some(row.clone()));
        ctx.emit(Event::RowStarted { index });

        match ctx.deliver(index, row).await {
            DeliveryOutcome::Success => {
                ctx.status.update(|status| {
                    status.processed += 1;
                    status.successful += 1;
                });
                tracing::debug!(row = index, "row delivered");
                ctx.emit(Event::RowDelivered { index });
            }
            DeliveryOutcome::Failure { reason } => {
                tracing::warn!(row = index, reason = %reason, "row delivery failed");
                ctx.status.update(|status| {
                    status.processed += 1;
                    status.failed += 1;
                    status.failures.push(FailureRecord {
                        row: row.clone(),
                        reason: reason.clone(),
                    });
                });
                ctx.emit(Event::RowFailed { index, reason });
            }
        }

        if index + 1 < total {
            if ctx.cancel_token.is_cancelled() {
                cancelled = true;
                break;
            }
            tokio::select! {
                biased;
                _ = ctx.cancel_token.cancelled() => {
                    cancelled = true;
                    break;
                }
                _ = tokio::time::sleep(ctx.pacing_interval) => {}
            }
        }
    }

    ctx.finish(cancelled)
}
