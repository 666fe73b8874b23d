mod error;
mod files;
mod session;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::rate_limit::RateLimitConfig;
use crate::session::SessionManager;
use crate::storage::FileStorage;

pub use error::{ApiError, ResultExt};
pub use files::MAX_UPLOAD_BYTES;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    sessions: SessionManager,
    storage: FileStorage,
    secure_cookies: bool,
    rate_limit: Arc<RateLimitConfig>,
) -> Router {
    let session_state = session::SessionState {
        sessions,
        secure_cookies,
    };

    let files_state = files::FilesState { db, jwt, storage };

    Router::new()
        .merge(session::router(session_state, rate_limit))
        .merge(files::router(files_state))
}
