//! Authentication user types.

use crate::db::UserRole;
use crate::jwt::AccessClaims;

/// The principal behind a request that passed the auth gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub username: String,
    pub role: UserRole,
}

impl From<AccessClaims> for AuthenticatedUser {
    fn from(claims: AccessClaims) -> Self {
        Self {
            username: claims.username,
            role: claims.role,
        }
    }
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
