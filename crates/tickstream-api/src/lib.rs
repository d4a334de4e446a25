//! # tickstream-api
//!
//! HTTP surface for the streaming core: the two stream endpoints, the health
//! endpoint, and the mapping from core/auth errors to HTTP statuses. All
//! admission-time failures are visible here; in-stream failures surface to
//! clients only as stream termination.

pub mod error;
pub mod handlers;
pub mod routes;

pub use error::ApiError;
pub use routes::configure_routes;

/// JWT validation parameters shared with the stream handlers via app data.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
}
