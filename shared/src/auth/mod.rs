//! Credential & claims module
//!
//! Shared by every service to authenticate callers without a session store:
//! - [`JwtService`] - issue and verify signed bearer tokens
//! - [`Claims`] - token payload (identity, role, gateway namespace)
//! - [`CurrentUser`] - verified caller, available as an axum extractor
//! - [`Role`] - buyer / seller / admin

pub mod extractor;
pub mod jwt;
pub mod role;
pub mod user;

pub use jwt::{Claims, GatewayClaims, Identity, JwtConfig, JwtService, TokenError};
pub use role::Role;
pub use user::CurrentUser;
