//! Scheduler layer for the worker
//!
//! Drives repeated fetch+send cycles with at most one batch in flight,
//! and stops admitting work once shutdown has been requested.

pub mod controller;

pub use controller::{DrainOutcome, JobLoopController, StartOutcome};
