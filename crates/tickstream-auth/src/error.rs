use thiserror::Error;

/// Authentication failures surfaced at admission time.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingAuthorization,

    #[error("Malformed Authorization header: {0}")]
    MalformedAuthorization(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Untrusted issuer: {0}")]
    UntrustedIssuer(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

impl AuthError {
    /// Stable machine-readable code for API error bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthorization => "MISSING_AUTHORIZATION",
            AuthError::MalformedAuthorization(_) => "MALFORMED_AUTHORIZATION",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::InvalidSignature => "INVALID_SIGNATURE",
            AuthError::UntrustedIssuer(_) => "UNTRUSTED_ISSUER",
            AuthError::InvalidToken(_) => "INVALID_TOKEN",
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
