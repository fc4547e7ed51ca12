//! JWT token service
//!
//! Issues and verifies the bearer tokens every service trusts. Verification is
//! stateless: there is no revocation list, so a token stays valid until `exp`
//! even if the user's role changes server-side.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::role::Role;
use crate::config::{env_parse, require_secret};
use crate::error::AppError;

/// Claim namespace understood by the data-mutation gateway
pub const GATEWAY_CLAIMS_NAMESPACE: &str = "https://hasura.io/jwt/claims";

/// Minimum accepted secret length in bytes
const MIN_SECRET_LEN: usize = 32;

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// HMAC secret (at least 32 bytes outside development)
    pub secret: String,
    /// Default token lifetime in minutes
    pub expiration_minutes: i64,
    /// Issuer written into new tokens and required on verification when set
    pub issuer: Option<String>,
}

impl JwtConfig {
    /// Load from `JWT_SECRET`, `JWT_EXPIRATION_MINUTES` and `JWT_ISSUER`
    pub fn from_env(environment: &str) -> Result<Self, TokenError> {
        let secret = require_secret("JWT_SECRET", environment)
            .map_err(|e| TokenError::Config(e.to_string()))?;
        if secret.len() < MIN_SECRET_LEN && environment != "development" {
            return Err(TokenError::Config(format!(
                "JWT_SECRET must be at least {MIN_SECRET_LEN} characters long"
            )));
        }

        Ok(Self {
            secret,
            expiration_minutes: env_parse("JWT_EXPIRATION_MINUTES", 1440),
            issuer: std::env::var("JWT_ISSUER").ok().filter(|s| !s.is_empty()),
        })
    }
}

/// Gateway-scoped claims, mirrored so the mutation gateway can authorize the
/// same token directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayClaims {
    #[serde(rename = "x-hasura-default-role")]
    pub default_role: Role,
    #[serde(rename = "x-hasura-allowed-roles")]
    pub allowed_roles: Vec<Role>,
    #[serde(rename = "x-hasura-user-id")]
    pub user_id: String,
    #[serde(rename = "x-hasura-user-name", default)]
    pub user_name: Option<String>,
}

/// Claims stored in the token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID; optional on the wire so that its absence is reported as a
    /// missing claim rather than a malformed token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
    /// Seller shop name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
    /// Expiry (Unix seconds)
    pub exp: i64,
    /// Issued at (Unix seconds)
    #[serde(default)]
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(
        rename = "https://hasura.io/jwt/claims",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub gateway: Option<GatewayClaims>,
}

impl Claims {
    /// Resolve the caller's user id.
    ///
    /// Falls back to the gateway namespace, where older tokens carry the id
    /// as a decimal string.
    pub fn resolved_user_id(&self) -> Option<i64> {
        self.user_id.or_else(|| {
            self.gateway
                .as_ref()
                .and_then(|g| g.user_id.parse::<i64>().ok())
        })
    }
}

/// Identity a token is issued for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub shop_name: Option<String>,
}

/// JWT errors
#[derive(Error, Debug)]
pub enum TokenError {
    /// Bad signature, wrong algorithm, malformed structure or expired
    #[error("Invalid token: {reason}")]
    InvalidToken { reason: String, expired: bool },

    /// Token verified but a required field is absent
    #[error("Missing claim: {0}")]
    MissingClaim(&'static str),

    #[error("Token generation failed: {0}")]
    GenerationFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TokenError {
    fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidToken {
            reason: reason.into(),
            expired: false,
        }
    }

    /// Whether the token failed only because it expired
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::InvalidToken { expired: true, .. })
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::InvalidToken { expired: true, .. } => AppError::token_expired(),
            TokenError::InvalidToken { reason, .. } => AppError::invalid_token(reason),
            TokenError::MissingClaim(claim) => AppError::missing_claim(claim),
            TokenError::GenerationFailed(msg) | TokenError::Config(msg) => {
                AppError::internal(msg)
            }
        }
    }
}

/// JWT token service
#[derive(Clone)]
pub struct JwtService {
    pub config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("expiration_minutes", &self.config.expiration_minutes)
            .field("issuer", &self.config.issuer)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    /// Create a JWT service from configuration
    pub fn with_config(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Shortcut for a service with default lifetime and no issuer
    pub fn from_secret(secret: impl Into<String>) -> Self {
        Self::with_config(JwtConfig {
            secret: secret.into(),
            expiration_minutes: 1440,
            issuer: None,
        })
    }

    /// Issue a signed token for `identity` acting as `role`, valid for `expiry`
    pub fn issue_token(
        &self,
        identity: &Identity,
        role: Role,
        expiry: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();

        let claims = Claims {
            user_id: Some(identity.user_id),
            username: identity.username.clone(),
            email: identity.email.clone(),
            role,
            shop_name: identity.shop_name.clone(),
            exp: (now + expiry).timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
            gateway: Some(GatewayClaims {
                default_role: role,
                allowed_roles: Role::ALL.to_vec(),
                user_id: identity.user_id.to_string(),
                user_name: Some(identity.username.clone()),
            }),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::GenerationFailed(e.to_string()))
    }

    /// Issue a token with the configured default lifetime
    pub fn issue_default(&self, identity: &Identity, role: Role) -> Result<String, TokenError> {
        self.issue_token(
            identity,
            role,
            Duration::minutes(self.config.expiration_minutes),
        )
    }

    /// Verify and decode a token
    ///
    /// Only HS256 is accepted; a token whose header names another algorithm
    /// is refused before its signature is looked at.
    pub fn verify_token(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);
        if let Some(issuer) = &self.config.issuer {
            validation.set_issuer(&[issuer]);
        }

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::InvalidToken {
                        reason: "token expired".to_string(),
                        expired: true,
                    },
                    ErrorKind::InvalidSignature => TokenError::invalid("signature mismatch"),
                    ErrorKind::InvalidAlgorithm => TokenError::invalid("algorithm not allowed"),
                    _ => TokenError::invalid(format!("token validation failed: {e}")),
                }
            })?;

        let claims = token_data.claims;
        if claims.resolved_user_id().is_none() {
            return Err(TokenError::MissingClaim("user_id"));
        }
        Ok(claims)
    }

    /// Extract the token from an Authorization header value
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header.strip_prefix("Bearer ").map(str::trim)
    }

    /// Seconds until the claims expire (0 when already expired)
    pub fn get_expiration_seconds(&self, claims: &Claims) -> i64 {
        let now = Utc::now().timestamp();
        (claims.exp - now).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET_A: &str = "secret-a-0123456789abcdef0123456789abcdef";
    const SECRET_B: &str = "secret-b-0123456789abcdef0123456789abcdef";

    fn buyer() -> Identity {
        Identity {
            user_id: 7,
            username: "maria".to_string(),
            email: "maria@example.com".to_string(),
            shop_name: None,
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let service = JwtService::from_secret(SECRET_A);
        let token = service
            .issue_token(&buyer(), Role::Buyer, Duration::hours(1))
            .expect("issue");

        let claims = service.verify_token(&token).expect("verify");
        assert_eq!(claims.user_id, Some(7));
        assert_eq!(claims.username, "maria");
        assert_eq!(claims.email, "maria@example.com");
        assert_eq!(claims.role, Role::Buyer);

        let gateway = claims.gateway.expect("gateway claims");
        assert_eq!(gateway.user_id, "7");
        assert_eq!(gateway.allowed_roles, Role::ALL.to_vec());
    }

    #[test]
    fn test_other_secret_is_rejected() {
        let issuer = JwtService::from_secret(SECRET_A);
        let verifier = JwtService::from_secret(SECRET_B);
        let token = issuer
            .issue_token(&buyer(), Role::Buyer, Duration::hours(1))
            .unwrap();

        let err = verifier.verify_token(&token).unwrap_err();
        assert!(matches!(err, TokenError::InvalidToken { expired: false, .. }));
    }

    #[test]
    fn test_expired_token_is_rejected_with_correct_secret() {
        let service = JwtService::from_secret(SECRET_A);
        let token = service
            .issue_token(&buyer(), Role::Buyer, Duration::minutes(-5))
            .unwrap();

        let err = service.verify_token(&token).unwrap_err();
        assert!(err.is_expired());
        assert_eq!(AppError::from(err).code, crate::error::ErrorCode::TokenExpired);
    }

    #[test]
    fn test_other_algorithm_family_is_rejected() {
        let service = JwtService::from_secret(SECRET_A);
        let claims = serde_json::json!({
            "user_id": 7,
            "username": "maria",
            "email": "maria@example.com",
            "role": "buyer",
            "exp": (Utc::now() + Duration::hours(1)).timestamp(),
        });
        // Same secret, different HMAC variant
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET_A.as_bytes()),
        )
        .unwrap();

        let err = service.verify_token(&token).unwrap_err();
        assert!(matches!(err, TokenError::InvalidToken { .. }));
    }

    #[test]
    fn test_malformed_token_is_rejected() {
        let service = JwtService::from_secret(SECRET_A);
        assert!(matches!(
            service.verify_token("not.a.token"),
            Err(TokenError::InvalidToken { .. })
        ));
        assert!(matches!(
            service.verify_token(""),
            Err(TokenError::InvalidToken { .. })
        ));
    }

    #[test]
    fn test_missing_user_id_is_missing_claim() {
        let service = JwtService::from_secret(SECRET_A);
        let claims = serde_json::json!({
            "username": "ghost",
            "email": "ghost@example.com",
            "role": "buyer",
            "exp": (Utc::now() + Duration::hours(1)).timestamp(),
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET_A.as_bytes()),
        )
        .unwrap();

        let err = service.verify_token(&token).unwrap_err();
        assert!(matches!(err, TokenError::MissingClaim("user_id")));
    }

    #[test]
    fn test_gateway_user_id_fallback() {
        let service = JwtService::from_secret(SECRET_A);
        let claims = serde_json::json!({
            "username": "seller1",
            "email": "s@example.com",
            "role": "seller",
            "exp": (Utc::now() + Duration::hours(1)).timestamp(),
            "https://hasura.io/jwt/claims": {
                "x-hasura-default-role": "seller",
                "x-hasura-allowed-roles": ["seller", "buyer", "admin"],
                "x-hasura-user-id": "42",
                "x-hasura-user-name": "seller1"
            }
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET_A.as_bytes()),
        )
        .unwrap();

        let claims = service.verify_token(&token).expect("verify");
        assert_eq!(claims.user_id, None);
        assert_eq!(claims.resolved_user_id(), Some(42));
    }

    #[test]
    fn test_unknown_role_is_invalid() {
        let service = JwtService::from_secret(SECRET_A);
        let claims = serde_json::json!({
            "user_id": 1,
            "role": "superuser",
            "exp": (Utc::now() + Duration::hours(1)).timestamp(),
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET_A.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            service.verify_token(&token),
            Err(TokenError::InvalidToken { .. })
        ));
    }

    #[test]
    fn test_issuer_is_enforced_when_configured() {
        let issuer = JwtService::from_secret(SECRET_A);
        let verifier = JwtService::with_config(JwtConfig {
            secret: SECRET_A.to_string(),
            expiration_minutes: 60,
            issuer: Some("auth-service".to_string()),
        });
        let token = issuer
            .issue_token(&buyer(), Role::Buyer, Duration::hours(1))
            .unwrap();

        assert!(verifier.verify_token(&token).is_err());

        let token = verifier.issue_default(&buyer(), Role::Buyer).unwrap();
        assert!(verifier.verify_token(&token).is_ok());
    }

    #[test]
    fn test_extract_from_header() {
        assert_eq!(JwtService::extract_from_header("Bearer abc"), Some("abc"));
        assert_eq!(JwtService::extract_from_header("Basic abc"), None);
    }
}
