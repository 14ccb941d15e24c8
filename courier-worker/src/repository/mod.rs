//! Repository layer
//!
//! Gateways to the worker's external collaborators: the durable task queue
//! and the mail transport. They expose narrow interfaces without any
//! batch or lifecycle logic.
//!
//! All gateways are trait-based so the executor can be tested against
//! recording doubles.

mod memory;
mod postgres;
mod queue;
mod transport;

#[cfg(test)]
pub mod testing;

// Re-export traits
pub use queue::QueueGateway;
pub use transport::TransportGateway;

// Re-export implementations
pub use memory::InMemoryQueue;
pub use postgres::PgQueue;
pub use transport::SimulatedTransport;
