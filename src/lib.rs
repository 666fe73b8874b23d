pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod credentials;
pub mod db;
pub mod jwt;
pub mod rate_limit;
pub mod session;
pub mod storage;
pub mod thumbnail;

use api::create_api_router;
use axum::Router;
use credentials::{CredentialError, CredentialVerifier};
use db::Database;
use jwt::{JwtConfig, JwtError};
use rate_limit::RateLimitConfig;
use session::SessionManager;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use storage::{FileStorage, StorageError};
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Secret for signing access tokens
    pub access_secret: Vec<u8>,
    /// Secret for signing refresh tokens, must differ from `access_secret`
    pub refresh_secret: Vec<u8>,
    /// Root directory for uploaded files and thumbnails
    pub upload_dir: PathBuf,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// bcrypt cost used for the dummy hash that equalizes login timing
    pub bcrypt_cost: u32,
    pub rate_limit: RateLimitConfig,
}

/// Failure to assemble the application from its configuration.
#[derive(Debug)]
pub enum StartupError {
    Jwt(JwtError),
    Credentials(CredentialError),
    Storage(StorageError),
}

impl std::fmt::Display for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartupError::Jwt(e) => write!(f, "Invalid token configuration: {}", e),
            StartupError::Credentials(e) => write!(f, "Failed to prepare password verifier: {}", e),
            StartupError::Storage(e) => write!(f, "Failed to prepare upload directory: {}", e),
        }
    }
}

impl std::error::Error for StartupError {}

/// Create the application router with the given configuration.
pub async fn create_app(config: &ServerConfig) -> Result<Router, StartupError> {
    let jwt = Arc::new(
        JwtConfig::new(&config.access_secret, &config.refresh_secret).map_err(StartupError::Jwt)?,
    );
    let verifier = CredentialVerifier::new(config.bcrypt_cost)
        .await
        .map_err(StartupError::Credentials)?;
    let storage = FileStorage::init(config.upload_dir.clone())
        .await
        .map_err(StartupError::Storage)?;

    let sessions = SessionManager::new(config.db.clone(), jwt.clone(), verifier);

    Ok(create_api_router(
        config.db.clone(),
        jwt,
        sessions,
        storage,
        config.secure_cookies,
        Arc::new(config.rate_limit.clone()),
    ))
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Purges expired refresh tokens before accepting connections.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    cleanup::run_cleanup(&config.db).await;
    let app = create_app(&config).await.map_err(std::io::Error::other)?;
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}
