//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Why the gate rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    MissingToken,
    InvalidToken,
    InsufficientRole,
}

/// Auth gate rejection, rendered as a JSON error body.
///
/// Cookies are left alone so the client can still call `/refresh`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiAuthError {
    pub kind: AuthErrorKind,
}

impl ApiAuthError {
    pub(super) fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            AuthErrorKind::MissingToken | AuthErrorKind::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthErrorKind::InsufficientRole => StatusCode::FORBIDDEN,
        }
    }

    pub fn message(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::MissingToken => "Access token missing",
            AuthErrorKind::InvalidToken => "Invalid access token",
            AuthErrorKind::InsufficientRole => "Admin only",
        }
    }
}

impl std::fmt::Display for ApiAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ApiAuthError {}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
