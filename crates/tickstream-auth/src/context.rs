//! Authenticated request context.

use crate::jwt::JwtClaims;
use tickstream_commons::UserId;

/// The identity a validated claim asserts. Handlers pass this to the
/// admission gate; nothing downstream re-derives identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub username: Option<String>,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: &JwtClaims) -> Self {
        Self {
            user_id: claims.user_id(),
            username: claims.username.clone(),
        }
    }
}
