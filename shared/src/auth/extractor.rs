//! JWT Extractor
//!
//! Custom extractor for automatically validating bearer tokens

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;

use super::{CurrentUser, JwtService};
use crate::error::AppError;

/// Works for any service state that can hand out its [`JwtService`].
impl<S> FromRequestParts<S> for CurrentUser
where
    JwtService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Check if already extracted
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let token = match auth_header {
            Some(header) => JwtService::extract_from_header(header)
                .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
            None => {
                tracing::warn!(uri = %parts.uri, "Missing Authorization header");
                return Err(AppError::unauthorized());
            }
        };

        let jwt_service = JwtService::from_ref(state);
        let user = jwt_service
            .verify_token(token)
            .and_then(CurrentUser::try_from)
            .map_err(|e| {
                crate::security_log!(WARN, "token_rejected", uri = %parts.uri, error = %e);
                AppError::from(e)
            })?;

        parts.extensions.insert(user.clone());
        Ok(user)
    }
}
