//! Run task execution -- the sequential delivery loop.
//!
//! Split into focused submodules:
//! - [`context`] - Run snapshot, status publisher, panic-safe delivery
//! - [`orchestration`] - Row-by-row loop with pacing and cancellation

mod context;
mod orchestration;

pub(crate) use context::{RunContext, StatusPublisher};
pub(crate) use orchestration::run_delivery;
