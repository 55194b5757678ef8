//! Fixtures for integration tests: mock endpoints, relays and CSV input

use row_relay::{DeliveryConfig, Event, Relay, RelayConfig};
use std::time::Duration;
use wiremock::MockServer;

/// Path every mock endpoint listens on
pub const HOOK_PATH: &str = "/hook";

/// Three-lead CSV used by most scenarios
pub const LEADS_CSV: &str = "Name,Email\nA,a@example.com\nB,b@example.com\nC,c@example.com\n";

/// Install a test log subscriber once; later calls are ignored
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// HTTP relay with a short pacing interval
pub fn http_relay(pacing: Duration) -> Relay {
    init_tracing();
    let config = RelayConfig {
        pacing_interval: pacing,
        request_timeout: Some(Duration::from_secs(5)),
        ..Default::default()
    };
    Relay::with_http_client(config).expect("relay should build")
}

/// Delivery configuration pointing at the mock server
pub fn delivery_for(server: &MockServer) -> DeliveryConfig {
    DeliveryConfig::new(format!("{}{}", server.uri(), HOOK_PATH), "integration")
        .with_notes("automated test")
}

/// Load CSV text into the relay and point it at the mock server
pub async fn prepare(relay: &Relay, server: &MockServer, csv: &str) {
    let rows = row_relay::parser::parse_str(csv).expect("fixture CSV should parse");
    relay.load_rows(rows).await.expect("rows should load");
    relay.set_delivery_config(delivery_for(server)).await;
}

/// Names (the `Name` field) of every request body the server received, in order
pub async fn received_names(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| {
            let body: serde_json::Value =
                serde_json::from_slice(&request.body).expect("body should be JSON");
            body["Name"].as_str().unwrap_or_default().to_string()
        })
        .collect()
}

/// Wait until the relay emits an event matching `pred`
pub async fn wait_for_event(
    events: &mut tokio::sync::broadcast::Receiver<Event>,
    pred: impl Fn(&Event) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return,
                Ok(_) => continue,
                Err(e) => panic!("event channel failed: {}", e),
            }
        }
    })
    .await
    .expect("timed out waiting for event");
}
