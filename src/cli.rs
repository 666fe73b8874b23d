//! CLI argument parsing, validation, and startup helpers.

use std::path::PathBuf;

use crate::ServerConfig;
use crate::credentials::hash_password;
use crate::db::{Database, UserRole};
use crate::rate_limit::RateLimitConfig;
use clap::Parser;
use tracing::{error, info};

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "filekeep", about = "File storage with cookie-based JWT sessions")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "filekeep.db")]
    pub database: String,

    /// Directory for uploaded files and thumbnails
    #[arg(short, long, default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// Set the Secure flag on session cookies (use behind HTTPS)
    #[arg(long)]
    pub secure_cookies: bool,

    /// Rate limit logins by X-Forwarded-For (only behind a proxy that sets it)
    #[arg(long, env = "TRUST_PROXY")]
    pub trust_proxy: bool,

    /// bcrypt cost for hashing and verifying passwords
    #[arg(long, default_value_t = bcrypt::DEFAULT_COST,
        value_parser = clap::value_parser!(u32).range(4..=31))]
    pub bcrypt_cost: u32,

    /// Path to file containing the access token secret. Prefer ACCESS_TOKEN_SECRET
    #[arg(long)]
    pub access_secret_file: Option<String>,

    /// Path to file containing the refresh token secret. Prefer REFRESH_TOKEN_SECRET
    #[arg(long)]
    pub refresh_secret_file: Option<String>,

    /// Create an admin with this username on startup (password from ADMIN_PASSWORD)
    #[arg(long, value_name = "USERNAME")]
    pub create_admin: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load a secret from the environment variable `env_var` or from `file`.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_secret(env_var: &str, file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var(env_var) {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(env_var) };
        secret
    } else if let Some(path) = file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else {
        error!(
            variable = %env_var,
            "Secret is required. Set the environment variable (recommended) or pass a secret file"
        );
        return None;
    };

    validate_secret(env_var, &secret)?;
    Some(secret)
}

fn validate_secret(name: &str, secret: &str) -> Option<()> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            variable = %name,
            "Secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }
    Some(())
}

/// Load both token secrets and make sure they differ.
pub fn load_token_secrets(args: &Args) -> Option<(String, String)> {
    let access = load_secret("ACCESS_TOKEN_SECRET", args.access_secret_file.as_deref())?;
    let refresh = load_secret("REFRESH_TOKEN_SECRET", args.refresh_secret_file.as_deref())?;

    if access == refresh {
        error!("Access and refresh token secrets must be different");
        return None;
    }

    Some((access, refresh))
}

/// Handle the --create-admin flag: create the admin, or promote an existing user.
pub async fn handle_create_admin(db: &Database, username: &str, bcrypt_cost: u32) {
    let Ok(password) = std::env::var("ADMIN_PASSWORD") else {
        error!("ADMIN_PASSWORD must be set when using --create-admin");
        std::process::exit(1);
    };
    // SAFETY: single-threaded startup, nothing else reads this variable.
    unsafe { std::env::remove_var("ADMIN_PASSWORD") };

    if password.is_empty() {
        error!("ADMIN_PASSWORD must not be empty");
        std::process::exit(1);
    }

    match db.users().get_role(username).await {
        Ok(Some(UserRole::Admin)) => {
            info!(username = %username, "Admin already exists");
        }
        Ok(Some(UserRole::User)) => match db.users().set_role(username, UserRole::Admin).await {
            Ok(_) => info!(username = %username, "Existing user promoted to admin"),
            Err(e) => {
                error!(error = %e, "Failed to promote user");
                std::process::exit(1);
            }
        },
        Ok(None) => {
            let hash = match hash_password(&password, bcrypt_cost).await {
                Ok(hash) => hash,
                Err(e) => {
                    error!(error = %e, "Failed to hash admin password");
                    std::process::exit(1);
                }
            };
            match db.users().create(username, &hash, UserRole::Admin).await {
                Ok(_) => info!(username = %username, "Admin user created"),
                Err(e) => {
                    error!(error = %e, "Failed to create admin user");
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to check for existing admin");
            std::process::exit(1);
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    db: Database,
    access_secret: String,
    refresh_secret: String,
) -> ServerConfig {
    ServerConfig {
        db,
        access_secret: access_secret.into_bytes(),
        refresh_secret: refresh_secret.into_bytes(),
        upload_dir: args.upload_dir.clone(),
        secure_cookies: args.secure_cookies,
        bcrypt_cost: args.bcrypt_cost,
        rate_limit: RateLimitConfig::new().with_trusted_proxy(args.trust_proxy),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
