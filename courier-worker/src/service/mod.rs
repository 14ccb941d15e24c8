//! Service layer
//!
//! Business logic for the worker. The batch executor drives one batch of
//! tasks through the queue and transport gateways.

mod executor;

pub use executor::{BatchExecutor, BatchReport};
