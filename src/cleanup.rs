//! Startup cleanup of expired data.

use crate::db::Database;
use tracing::{error, info};

/// Delete refresh token rows that have passed their expiry.
pub async fn run_cleanup(db: &Database) {
    match db.refresh_tokens().delete_expired().await {
        Ok(count) if count > 0 => info!("Cleaned up {} expired refresh tokens", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up expired refresh tokens: {}", e),
    }
}
