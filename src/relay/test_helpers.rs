//! Shared test helpers for creating Relay instances in tests.

use crate::client::DeliveryClient;
use crate::config::{DeliveryConfig, RelayConfig};
use crate::relay::Relay;
use crate::types::{DeliveryOutcome, Row, RowSet};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Pause used by test relays so runs finish quickly
pub(crate) const TEST_PACING: Duration = Duration::from_millis(5);

/// Endpoint that passes validation; never contacted by [`ScriptedClient`]
pub(crate) const TEST_ENDPOINT: &str = "http://relay.test/hook";

/// [`DeliveryClient`] that replays scripted outcomes and records every call.
///
/// Outcomes are consumed in call order; once the script runs out every call
/// succeeds. With a gate, each delivery waits for one permit before returning.
#[derive(Default)]
pub(crate) struct ScriptedClient {
    outcomes: Mutex<VecDeque<DeliveryOutcome>>,
    calls: Mutex<Vec<(Row, DeliveryConfig)>>,
    gate: Option<Arc<tokio::sync::Semaphore>>,
    panic_on_call: Option<usize>,
}

impl ScriptedClient {
    pub(crate) fn succeeding() -> Self {
        Self::default()
    }

    pub(crate) fn with_outcomes(outcomes: Vec<DeliveryOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            ..Default::default()
        }
    }

    /// Every delivery blocks until a permit is added to the returned semaphore
    pub(crate) fn gated() -> (Self, Arc<tokio::sync::Semaphore>) {
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        let client = Self {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        };
        (client, gate)
    }

    /// Panic on the given zero-based call instead of returning an outcome
    pub(crate) fn panicking_on(call: usize) -> Self {
        Self {
            panic_on_call: Some(call),
            ..Default::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<(Row, DeliveryConfig)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn delivered_names(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|(row, _)| row.get("Name").unwrap_or_default().to_string())
            .collect()
    }
}

#[async_trait::async_trait]
impl DeliveryClient for ScriptedClient {
    async fn deliver(&self, row: &Row, config: &DeliveryConfig) -> DeliveryOutcome {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((row.clone(), config.clone()));
            calls.len() - 1
        };

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        if self.panic_on_call == Some(call) {
            panic!("scripted client exploded on call {}", call);
        }

        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(DeliveryOutcome::Success)
    }
}

/// Rows with a single `Name` column, one per name
pub(crate) fn named_rows(names: &[&str]) -> RowSet {
    names
        .iter()
        .map(|name| Row::from_pairs([("Name", *name)]))
        .collect::<Vec<_>>()
        .into()
}

/// Relay with fast pacing around `client`
pub(crate) fn create_test_relay(client: Arc<ScriptedClient>) -> Relay {
    let config = RelayConfig {
        pacing_interval: TEST_PACING,
        ..Default::default()
    };
    Relay::new(config, client).unwrap()
}

/// Relay with rows and a complete delivery configuration already in place
pub(crate) async fn create_loaded_relay(client: Arc<ScriptedClient>, names: &[&str]) -> Relay {
    let relay = create_test_relay(client);
    relay.load_rows(named_rows(names)).await.unwrap();
    relay
        .set_delivery_config(DeliveryConfig::new(TEST_ENDPOINT, "test-source").with_notes("note"))
        .await;
    relay
}

/// Wait until the relay emits an event matching `pred`
pub(crate) async fn wait_for_event(
    events: &mut tokio::sync::broadcast::Receiver<crate::types::Event>,
    pred: impl Fn(&crate::types::Event) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.unwrap();
            if pred(&event) {
                return;
            }
        }
    })
    .await
    .expect("timed out waiting for event");
}
