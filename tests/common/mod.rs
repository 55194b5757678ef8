//! Common test utilities for row-relay integration tests

#[allow(dead_code)]
pub mod fixtures;

pub use fixtures::*;
