//! Data models
//!
//! Rows owned by the order and payment services. All IDs are `i64`, money is
//! `f64` in currency units (see the order service for how totals are summed).

pub mod order;
pub mod payment;

pub use order::*;
pub use payment::*;
