//! Courier Core
//!
//! Core types shared by the Courier email worker.
//!
//! This crate contains:
//! - Domain types: the email task and its delivery status
//! - DTOs: request/response shapes for the worker's HTTP surface
pub mod domain;
pub mod dto;
