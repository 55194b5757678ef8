//! Row delivery over HTTP.
//!
//! [`DeliveryClient`] is the seam between the run loop and the transport, so
//! tests and embedders can swap in their own implementation.

use crate::config::{DeliveryConfig, RelayConfig};
use crate::error::Result;
use crate::types::{DeliveryOutcome, Row};
use serde_json::{Map, Value};

/// Sends one row to the configured endpoint
///
/// Implementations make exactly one attempt and never fail: every problem is
/// reported as [`DeliveryOutcome::Failure`].
#[async_trait::async_trait]
pub trait DeliveryClient: Send + Sync {
    /// Deliver `row`, merged with the static fields of `config`
    async fn deliver(&self, row: &Row, config: &DeliveryConfig) -> DeliveryOutcome;
}

/// Build the JSON body for one row
///
/// Every row column becomes a string field, then `source` and `notes` are set
/// from the configuration. A column with either name is overwritten.
pub fn build_payload(row: &Row, config: &DeliveryConfig) -> Map<String, Value> {
    let mut payload: Map<String, Value> = row
        .iter()
        .map(|(column, value)| (column.to_string(), Value::String(value.to_string())))
        .collect();
    payload.insert(
        "source".to_string(),
        Value::String(config.source_label.clone()),
    );
    payload.insert("notes".to_string(), Value::String(config.notes.clone()));
    payload
}

/// Production [`DeliveryClient`] that POSTs JSON with reqwest
#[derive(Clone, Debug)]
pub struct HttpDeliveryClient {
    client: reqwest::Client,
}

impl HttpDeliveryClient {
    /// Build a client honouring the relay's timeout and user agent settings
    pub fn new(config: &RelayConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait::async_trait]
impl DeliveryClient for HttpDeliveryClient {
    async fn deliver(&self, row: &Row, config: &DeliveryConfig) -> DeliveryOutcome {
        let payload = build_payload(row, config);
        let endpoint = config.endpoint.trim();

        match self.client.post(endpoint).json(&payload).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    DeliveryOutcome::Success
                } else {
                    DeliveryOutcome::failure(format!(
                        "Server responded with status {}",
                        status.as_u16()
                    ))
                }
            }
            Err(e) => DeliveryOutcome::failure(describe_transport_error(endpoint, &e)),
        }
    }
}

fn describe_transport_error(endpoint: &str, err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("Request to '{}' timed out: {}", endpoint, err)
    } else if err.is_connect() {
        format!("Connection failed for '{}': {}", endpoint, err)
    } else {
        format!("Request to '{}' failed: {}", endpoint, err)
    }
}
