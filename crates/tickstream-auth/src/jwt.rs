// JWT validation for already-issued identity claims.

use crate::context::AuthenticatedUser;
use crate::error::{AuthError, AuthResult};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tickstream_commons::UserId;

/// JWT claims structure for tickstream tokens.
///
/// Standard JWT claims plus the optional username custom claim. Tokens are
/// issued by the surrounding identity service; this process only validates
/// and consumes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Username (custom claim)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl JwtClaims {
    pub fn user_id(&self) -> UserId {
        UserId::new(self.sub.clone())
    }
}

/// Extract the token from a `Bearer <token>` Authorization header value.
pub fn extract_bearer(header: &str) -> AuthResult<&str> {
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or_else(|| {
            AuthError::MalformedAuthorization("Expected 'Bearer <token>'".to_string())
        })?;

    if token.is_empty() {
        return Err(AuthError::MalformedAuthorization("Empty bearer token".to_string()));
    }
    Ok(token)
}

/// Validate a token and return the authenticated user it asserts.
///
/// HS256 only; the issuer must match the configured one.
pub fn validate_token(
    token: &str,
    secret: &str,
    trusted_issuer: &str,
) -> AuthResult<AuthenticatedUser> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[trusted_issuer]);

    let data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidIssuer => AuthError::UntrustedIssuer(trusted_issuer.to_string()),
        _ => AuthError::InvalidToken(e.to_string()),
    })?;

    Ok(AuthenticatedUser::from_claims(&data.claims))
}

/// Sign a token for the given user. Test/tooling helper; the server itself
/// never issues tokens.
pub fn issue_token_for_tests(
    user_id: &UserId,
    issuer: &str,
    secret: &str,
    ttl_seconds: i64,
) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp();
    let claims = JwtClaims {
        sub: user_id.to_string(),
        iss: issuer.to_string(),
        exp: (now + ttl_seconds) as usize,
        iat: now as usize,
        username: None,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("HS256 signing cannot fail with a valid secret")
}
