//! Shared building blocks for the storefront services
//!
//! Everything the order, inventory and payment services have in common:
//! error codes and the error body, bearer-token identity, the message
//! channel and its events, domain models, the mutation gateway client and
//! the background task manager.

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod logger;
pub mod message;
pub mod models;
pub mod mutation;
pub mod tasks;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCode};
pub use events::{OrderCreatedEvent, ReconciliationFailure, StockItem, StockReservationEvent};
pub use message::{AckMode, MessageChannel, WireEvent};
pub use mutation::{MutationExecutor, RetryPolicy};
