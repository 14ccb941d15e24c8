//! Data Transfer Objects for the worker's HTTP surface
//!
//! Lightweight request/response shapes, kept apart from the domain types
//! so the wire format can evolve independently.

pub mod status;
pub mod task;
