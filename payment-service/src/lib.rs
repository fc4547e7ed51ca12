//! Payment service
//!
//! Records a payment for every new order, settles online payments against
//! the mutation gateway, and confirms cash-on-delivery payments on request.

pub mod api;
pub mod bridge;
pub mod cod;
pub mod config;
pub mod db;
pub mod error;
pub mod reconciler;
pub mod state;
pub mod workers;
