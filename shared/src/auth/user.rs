//! Verified caller identity

use super::jwt::{Claims, TokenError};
use super::role::Role;
use crate::error::{AppError, ErrorCode};

/// Current user context (built from verified claims)
///
/// Handlers receive this through the [`FromRequestParts`](axum::extract::FromRequestParts)
/// extractor in [`super::extractor`].
///
/// ```ignore
/// async fn handler(user: CurrentUser) -> AppResult<Json<()>> {
///     user.require_role(&[Role::Seller, Role::Admin])?;
///     // ...
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub shop_name: Option<String>,
    /// Roles the token may act as (from the gateway namespace; defaults to `[role]`)
    pub allowed_roles: Vec<Role>,
}

impl TryFrom<Claims> for CurrentUser {
    type Error = TokenError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id = claims
            .resolved_user_id()
            .ok_or(TokenError::MissingClaim("user_id"))?;
        let allowed_roles = claims
            .gateway
            .as_ref()
            .map(|g| g.allowed_roles.clone())
            .filter(|roles| !roles.is_empty())
            .unwrap_or_else(|| vec![claims.role]);

        Ok(Self {
            id,
            username: claims.username,
            email: claims.email,
            role: claims.role,
            shop_name: claims.shop_name,
            allowed_roles,
        })
    }
}

impl CurrentUser {
    /// Admins pass every role check
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.is_admin() || self.role == role
    }

    /// Fail with `RoleRequired` unless the caller holds one of `roles`
    pub fn require_role(&self, roles: &[Role]) -> Result<(), AppError> {
        if roles.iter().any(|r| self.has_role(*r)) {
            return Ok(());
        }
        let wanted: Vec<&str> = roles.iter().map(Role::as_str).collect();
        Err(AppError::with_message(
            ErrorCode::RoleRequired,
            format!("Requires role: {}", wanted.join(" or ")),
        )
        .with_detail("role", self.role.as_str()))
    }
}
