//! # tickstream-auth
//!
//! Consumption of already-issued identity claims for bound streams. This
//! crate validates bearer tokens and produces an [`AuthenticatedUser`]
//! context; it performs no login flows and issues no tokens outside of test
//! helpers.

pub mod context;
pub mod error;
pub mod jwt;

pub use context::AuthenticatedUser;
pub use error::AuthError;
pub use jwt::{extract_bearer, validate_token, JwtClaims};
