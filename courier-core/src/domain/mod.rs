//! Core domain types
//!
//! These types are shared between the queue gateways (which persist them)
//! and the batch executor (which drives their status transitions).

pub mod task;
