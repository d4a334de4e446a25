//! HTTP error mapping.
//!
//! One `ApiError` wraps the admission-time failures of the core and the
//! claim-validation failures of the auth crate, and renders them as the JSON
//! error body used across the API.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use tickstream_auth::AuthError;
use tickstream_core::CoreError;

/// Suggested reconnect delay attached to capacity rejections.
const RETRY_AFTER_SECS: u32 = 5;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ApiError {
    /// Stable machine-readable code for the error body.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Core(core) => match core {
                CoreError::Unauthenticated(_) => "UNAUTHENTICATED",
                CoreError::Forbidden(_) => "FORBIDDEN",
                CoreError::NotFound(_) => "NOT_FOUND",
                CoreError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
                CoreError::ShuttingDown => "SHUTTING_DOWN",
                _ => "INTERNAL_ERROR",
            },
            ApiError::Auth(auth) => auth.error_code(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Core(core) => match core {
                CoreError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
                CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
                CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                CoreError::CapacityExceeded { .. } | CoreError::ShuttingDown => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());

        // Capacity rejections carry an explicit retry hint rather than
        // letting clients hammer a full instance.
        if matches!(
            self,
            ApiError::Core(CoreError::CapacityExceeded { .. }) | ApiError::Core(CoreError::ShuttingDown)
        ) {
            builder.insert_header(("Retry-After", RETRY_AFTER_SECS.to_string()));
        }

        builder.json(json!({
            "status": "error",
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        }))
    }
}
