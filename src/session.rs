//! Login and refresh orchestration.
//!
//! Every successful login or refresh leaves exactly one refresh token row for
//! the user: the one just issued. Older sessions stop being refreshable.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::credentials::CredentialVerifier;
use crate::db::{Database, UserRole};
use crate::jwt::{AccessTokenResult, JwtConfig, RefreshTokenResult};

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub username: String,
    pub role: UserRole,
    pub access: AccessTokenResult,
    pub refresh: RefreshTokenResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Bad credentials or an unusable refresh token. The message is safe to show.
    Unauthorized(&'static str),
    /// Signing or store failure. Details are logged, never returned.
    Internal,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            SessionError::Internal => write!(f, "Internal session error"),
        }
    }
}

impl std::error::Error for SessionError {}

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";
pub const REFRESH_TOKEN_NOT_FOUND: &str = "Refresh token not found";

fn internal(context: &str, e: impl std::fmt::Display) -> SessionError {
    error!(error = %e, "{}", context);
    SessionError::Internal
}

#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    jwt: Arc<JwtConfig>,
    verifier: CredentialVerifier,
}

impl SessionManager {
    pub fn new(db: Database, jwt: Arc<JwtConfig>, verifier: CredentialVerifier) -> Self {
        Self { db, jwt, verifier }
    }

    /// Verify a username/password and start a new session.
    ///
    /// Unknown users and wrong passwords produce the same error.
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedSession, SessionError> {
        let credential = self
            .db
            .users()
            .get_credential(username)
            .await
            .map_err(|e| internal("Failed to look up credential", e))?;

        let hash = credential.as_ref().map(|c| c.password_hash.as_str());
        if !self.verifier.verify(password, hash).await {
            warn!(username = %username, "Failed login attempt");
            return Err(SessionError::Unauthorized(INVALID_CREDENTIALS));
        }

        // verify() only succeeds with a stored hash.
        let Some(credential) = credential else {
            return Err(SessionError::Unauthorized(INVALID_CREDENTIALS));
        };

        let session = self.issue(&credential.username, credential.role)?;
        self.persist(&session).await?;

        info!(username = %session.username, role = %session.role, "Login successful");
        Ok(session)
    }

    /// Exchange a refresh token for a new pair, retiring the presented one.
    pub async fn refresh(&self, presented: &str) -> Result<IssuedSession, SessionError> {
        let claims = self
            .jwt
            .validate_refresh_token(presented)
            .map_err(|_| SessionError::Unauthorized(INVALID_REFRESH_TOKEN))?;
        let username = claims.username;

        let known = self
            .db
            .refresh_tokens()
            .exists(&username, presented)
            .await
            .map_err(|e| internal("Failed to check refresh token", e))?;
        if !known {
            warn!(username = %username, "Refresh with rotated or revoked token");
            return Err(SessionError::Unauthorized(REFRESH_TOKEN_NOT_FOUND));
        }

        // The role may have changed since login.
        let role = self
            .db
            .users()
            .get_role(&username)
            .await
            .map_err(|e| internal("Failed to look up role", e))?;
        let Some(role) = role else {
            warn!(username = %username, "Refresh for deleted user");
            if let Err(e) = self.db.refresh_tokens().delete_all(&username).await {
                warn!(error = %e, "Failed to drop refresh tokens of deleted user");
            }
            return Err(SessionError::Unauthorized(INVALID_REFRESH_TOKEN));
        };

        let session = self.issue(&username, role)?;
        self.persist(&session).await?;

        info!(username = %session.username, "Token refreshed");
        Ok(session)
    }

    /// Revoke the presented refresh token, if it is a valid one.
    /// Unknown or invalid tokens are ignored.
    pub async fn logout(&self, presented: &str) {
        let Ok(claims) = self.jwt.validate_refresh_token(presented) else {
            return;
        };
        match self
            .db
            .refresh_tokens()
            .delete(&claims.username, presented)
            .await
        {
            Ok(true) => info!(username = %claims.username, "Logged out"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Failed to revoke refresh token"),
        }
    }

    fn issue(&self, username: &str, role: UserRole) -> Result<IssuedSession, SessionError> {
        let access = self
            .jwt
            .generate_access_token(username, role)
            .map_err(|e| internal("Failed to generate access token", e))?;
        let refresh = self
            .jwt
            .generate_refresh_token(username)
            .map_err(|e| internal("Failed to generate refresh token", e))?;

        Ok(IssuedSession {
            username: username.to_string(),
            role,
            access,
            refresh,
        })
    }

    /// Make the new refresh token the user's only one.
    async fn persist(&self, session: &IssuedSession) -> Result<(), SessionError> {
        self.db
            .refresh_tokens()
            .rotate(
                &session.username,
                &session.refresh.token,
                session.refresh.expires_at,
            )
            .await
            .map_err(|e| internal("Failed to store refresh token", e))
    }
}
