//! The auth gate: an axum extractor that admits a request only with a valid
//! access token and, when required, the admin role.
//!
//! The gate never issues tokens. An expired access token is rejected and the
//! client must call `/refresh` itself.

use std::marker::PhantomData;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};

use super::cookie::{ACCESS_COOKIE_NAME, get_cookie};
use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthBackend;
use super::types::AuthenticatedUser;
use crate::db::UserRole;
use crate::jwt::JwtConfig;

/// Capability level a protected route demands.
pub trait RoleConstraint: Send + Sync + 'static {
    const REQUIRE_ADMIN: bool;
}

/// Any authenticated user.
pub struct AnyRole;

impl RoleConstraint for AnyRole {
    const REQUIRE_ADMIN: bool = false;
}

/// Only users whose token carries the admin role.
pub struct AdminOnly;

impl RoleConstraint for AdminOnly {
    const REQUIRE_ADMIN: bool = true;
}

/// Check the access token cookie and role requirement.
pub fn authorize(
    headers: &HeaderMap,
    jwt: &JwtConfig,
    require_admin: bool,
) -> Result<AuthenticatedUser, ApiAuthError> {
    let token = get_cookie(headers, ACCESS_COOKIE_NAME)
        .filter(|t| !t.is_empty())
        .ok_or(ApiAuthError::new(AuthErrorKind::MissingToken))?;

    let claims = jwt.validate_access_token(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        ApiAuthError::new(AuthErrorKind::InvalidToken)
    })?;

    if require_admin && claims.role != UserRole::Admin {
        tracing::warn!(username = %claims.username, "Non-admin denied admin route");
        return Err(ApiAuthError::new(AuthErrorKind::InsufficientRole));
    }

    Ok(AuthenticatedUser::from(claims))
}

/// Extractor for protected endpoints, parameterised by the role constraint.
///
/// `Auth` (or `Auth<AnyRole>`) admits any valid token, `Auth<AdminOnly>` only admins.
pub struct Auth<R: RoleConstraint = AnyRole> {
    pub user: AuthenticatedUser,
    _role: PhantomData<R>,
}

impl<S, R> FromRequestParts<S> for Auth<R>
where
    S: HasAuthBackend + Send + Sync,
    R: RoleConstraint,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authorize(&parts.headers, state.jwt(), R::REQUIRE_ADMIN).map(|user| Auth {
            user,
            _role: PhantomData,
        })
    }
}
