//! Shutdown layer
//!
//! Two-phase shutdown protocol for the job loop, plus the adapter that
//! turns process termination signals into calls to it.

mod coordinator;
mod signal;

pub use coordinator::ShutdownCoordinator;
pub use signal::wait_for_signal;
