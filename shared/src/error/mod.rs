//! Error codes and the HTTP error body shared by every service
//!
//! Each [`ErrorCode`] belongs to one [`ErrorCategory`] of the failure
//! taxonomy (validation, auth, not found, transient remote, persistence,
//! internal); the category decides the HTTP status and whether the failure
//! is logged.
//!
//! ```
//! use shared::error::{AppError, ErrorBody, ErrorCode};
//!
//! let err = AppError::new(ErrorCode::OrderEmpty).with_detail("field", "order_items");
//! let body = ErrorBody::from(&err);
//! assert_eq!(body.code.code(), 4007);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::ErrorCode;
pub use types::{AppError, AppResult, ErrorBody};
