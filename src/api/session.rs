//! Session endpoints.
//!
//! - POST `/login` - Exchange username/password (form) for token cookies
//! - POST `/refresh` - Exchange the refresh cookie for a new pair
//! - POST `/logout` - Revoke the refresh token and clear both cookies

use axum::{
    Form, Json, Router,
    extract::{State, rejection::FormRejection},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    middleware,
    response::{AppendHeaders, IntoResponse},
    routing::post,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::error::ApiError;
use crate::auth::{ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, clear_cookie, get_cookie, session_cookie};
use crate::rate_limit::{RateLimitConfig, rate_limit_login};
use crate::session::{IssuedSession, SessionManager};

#[derive(Clone)]
pub struct SessionState {
    pub sessions: SessionManager,
    pub secure_cookies: bool,
}

pub fn router(state: SessionState, rate_limit: Arc<RateLimitConfig>) -> Router {
    Router::new()
        .route(
            "/login",
            post(login).route_layer(middleware::from_fn_with_state(rate_limit, rate_limit_login)),
        )
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .with_state(state)
}

#[derive(Deserialize, Default)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

fn session_cookies(
    session: &IssuedSession,
    secure: bool,
) -> AppendHeaders<[(axum::http::HeaderName, String); 2]> {
    AppendHeaders([
        (
            SET_COOKIE,
            session_cookie(
                ACCESS_COOKIE_NAME,
                &session.access.token,
                session.access.duration,
                secure,
            ),
        ),
        (
            SET_COOKIE,
            session_cookie(
                REFRESH_COOKIE_NAME,
                &session.refresh.token,
                session.refresh.duration,
                secure,
            ),
        ),
    ])
}

async fn login(
    State(state): State<SessionState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // An unreadable body is answered like any failed login
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            debug!("Login form rejected: {}", rejection.body_text());
            LoginForm::default()
        }
    };
    let session = state.sessions.login(&form.username, &form.password).await?;

    Ok((
        StatusCode::OK,
        session_cookies(&session, state.secure_cookies),
        Json(json!({ "message": "Login successful" })),
    ))
}

async fn refresh(
    State(state): State<SessionState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let presented = get_cookie(&headers, REFRESH_COOKIE_NAME)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Refresh token missing"))?;

    let session = state.sessions.refresh(presented).await?;

    Ok((
        StatusCode::OK,
        session_cookies(&session, state.secure_cookies),
        Json(json!({ "message": "Token refreshed" })),
    ))
}

async fn logout(State(state): State<SessionState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(presented) = get_cookie(&headers, REFRESH_COOKIE_NAME) {
        state.sessions.logout(presented).await;
    }

    (
        StatusCode::OK,
        AppendHeaders([
            (SET_COOKIE, clear_cookie(ACCESS_COOKIE_NAME, state.secure_cookies)),
            (SET_COOKIE, clear_cookie(REFRESH_COOKIE_NAME, state.secure_cookies)),
        ]),
        Json(json!({ "message": "Logged out" })),
    )
}
