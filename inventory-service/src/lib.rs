//! Inventory service
//!
//! Consumes stock reservation messages and decrements variant stock through
//! the mutation gateway, one line at a time, with bounded retries.

pub mod api;
pub mod config;
pub mod reconciler;
pub mod state;
pub mod workers;
