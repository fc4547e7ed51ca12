//! Order service
//!
//! Accepts orders over HTTP, persists them through the mutation gateway and
//! publishes the stock reservation and order created events.

pub mod api;
pub mod config;
pub mod error;
pub mod money;
pub mod service;
pub mod state;
