//! # row-relay
//!
//! Delivers the rows of a CSV file one at a time to an HTTP endpoint.
//!
//! ## Design Philosophy
//!
//! row-relay is designed to be:
//! - **Sequential** - Rows are sent strictly in file order, one request at a time,
//!   with a short pause between requests
//! - **Forgiving** - A failing row is recorded and the run moves on
//! - **Cancellable** - A run can be stopped between rows; in-flight requests finish
//! - **Library-first** - No CLI or UI; presenters read status snapshots and events
//!
//! ## Quick Start
//!
//! ```no_run
//! use row_relay::{DeliveryConfig, Relay, RelayConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let relay = Relay::with_http_client(RelayConfig::default())?;
//!     relay.load_file("leads.csv").await?;
//!     relay
//!         .set_delivery_config(
//!             DeliveryConfig::new("https://hooks.example.com/leads", "spring-expo")
//!                 .with_notes("imported from badge scanner"),
//!         )
//!         .await;
//!
//!     // Watch progress
//!     let mut status = relay.watch_status();
//!     tokio::spawn(async move {
//!         while status.changed().await.is_ok() {
//!             println!("{}", *status.borrow());
//!         }
//!     });
//!
//!     let finished = relay.run(false).await?;
//!     for failure in &finished.failures {
//!         println!("failed: {:?} ({})", failure.row, failure.reason);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP delivery client
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// CSV parsing
pub mod parser;
/// Sequential delivery orchestrator
pub mod relay;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use client::{DeliveryClient, HttpDeliveryClient, build_payload};
pub use config::{DeliveryConfig, RelayConfig};
pub use error::{Error, ParseError, Result, ValidationError};
pub use relay::Relay;
pub use types::{
    DeliveryOutcome, Event, FailureRecord, Row, RowSet, RunState, RunStatus,
};
