//! Run lifecycle control — run, start, cancel, reset.

use crate::error::{Error, Result};
use crate::types::{Event, RunStatus};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::run_task::{RunContext, StatusPublisher, run_delivery};
use super::{Relay, RunGuard, Session};

impl Relay {
    /// Deliver the loaded rows and wait for the run to end
    ///
    /// With `test_only` only the first row is delivered. Fails without touching
    /// the status when no rows are loaded, the delivery configuration is
    /// incomplete, or another run is active. Per-row failures never fail the
    /// call; they are recorded in the returned status.
    ///
    /// Dropping the returned future ends the run: the row in flight is
    /// abandoned and the status is published as cancelled.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use row_relay::{DeliveryConfig, Relay, RelayConfig};
    /// # async fn example() -> row_relay::Result<()> {
    /// let relay = Relay::with_http_client(RelayConfig::default())?;
    /// relay.load_file("leads.csv").await?;
    /// relay
    ///     .set_delivery_config(DeliveryConfig::new("https://example.com/hook", "expo"))
    ///     .await;
    ///
    /// // Try the first row before sending everything
    /// let test = relay.run(true).await?;
    /// if test.failed == 0 {
    ///     let status = relay.run(false).await?;
    ///     println!("{}", status);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run(&self, test_only: bool) -> Result<RunStatus> {
        let ctx = self.prepare_run(test_only).await?;
        Ok(run_delivery(ctx).await)
    }

    /// Start a run in the background
    ///
    /// Same preconditions as [`Relay::run`]. The returned handle resolves to
    /// the final status; progress is observable through
    /// [`Relay::watch_status`] and [`Relay::subscribe`] meanwhile.
    pub async fn start(&self, test_only: bool) -> Result<tokio::task::JoinHandle<RunStatus>> {
        let ctx = self.prepare_run(test_only).await?;
        Ok(tokio::spawn(run_delivery(ctx)))
    }

    /// Request cancellation of the active run
    ///
    /// The run stops before its next row or during the pause between rows. A
    /// delivery already in flight always finishes and is counted.
    ///
    /// # Returns
    ///
    /// `true` if a run was active when cancellation was requested. Loading or
    /// resetting rows, or a run that has not installed its token yet, is not
    /// an active run.
    pub async fn cancel(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        let requested = self.run_control.cancel_token.cancel();
        if requested {
            tracing::info!("cancellation requested");
        }
        requested
    }

    /// Clear rows, delivery configuration and status
    ///
    /// Only allowed while no run is active; returns the relay to its
    /// pre-upload state.
    pub async fn reset(&self) -> Result<()> {
        let _guard = RunGuard::claim(&self.run_control.running).ok_or(Error::RunInProgress)?;

        *self.session.write().await = Session::default();
        self.run_control.cancel_token.clear();
        self.status_tx.send_replace(RunStatus::default());

        tracing::info!("relay reset");
        self.emit_event(Event::Reset);
        Ok(())
    }

    /// Claim the relay and snapshot everything a run needs
    async fn prepare_run(&self, test_only: bool) -> Result<RunContext> {
        let guard = RunGuard::claim(&self.run_control.running).ok_or(Error::RunInProgress)?;

        let (rows, delivery) = {
            let session = self.session.read().await;
            (Arc::clone(&session.rows), session.delivery.clone())
        };
        if rows.is_empty() {
            return Err(Error::NoRows);
        }
        delivery.validate().inspect_err(|e| {
            tracing::warn!(error = %e, "run refused: invalid delivery configuration");
        })?;

        let cancel_token = CancellationToken::new();
        self.run_control.cancel_token.install(cancel_token.clone());

        Ok(RunContext {
            rows,
            delivery,
            test_only,
            cancel_token,
            client: Arc::clone(&self.client),
            pacing_interval: self.config.pacing_interval,
            status: StatusPublisher::new(Arc::clone(&self.status_tx)),
            event_tx: self.event_tx.clone(),
            cancel_slot: self.run_control.cancel_token.clone(),
            guard,
            finished: false,
        })
    }
}
