//! Refresh token storage.
//!
//! A refresh token is only honoured while a row matching exactly
//! (username, token) exists here. Access tokens are never stored.

use sqlx::sqlite::SqlitePool;

/// Store for the refresh tokens each user may currently redeem.
#[derive(Clone)]
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a refresh token for a user.
    pub async fn insert(
        &self,
        username: &str,
        token: &str,
        expires_at: u64,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO refresh_tokens (username, token, expires_at) VALUES (?, ?, ?)")
                .bind(username)
                .bind(token)
                .bind(timestamp_to_datetime(expires_at))
                .execute(&self.pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    /// Delete every refresh token of a user.
    pub async fn delete_all(&self, username: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Whether a row matching exactly this user and token exists.
    pub async fn exists(&self, username: &str, token: &str) -> Result<bool, sqlx::Error> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens WHERE username = ? AND token = ?")
                .bind(username)
                .bind(token)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0 > 0)
    }

    /// Replace all of a user's refresh tokens with a single new one.
    ///
    /// Delete and insert run in one transaction: either the user ends up with
    /// exactly the new row, or nothing changes.
    pub async fn rotate(
        &self,
        username: &str,
        token: &str,
        expires_at: u64,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM refresh_tokens WHERE username = ?")
            .bind(username)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO refresh_tokens (username, token, expires_at) VALUES (?, ?, ?)")
            .bind(username)
            .bind(token)
            .bind(timestamp_to_datetime(expires_at))
            .execute(&mut *tx)
            .await?;

        tx.commit().await
    }

    /// Delete a single refresh token (logout).
    pub async fn delete(&self, username: &str, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE username = ? AND token = ?")
            .bind(username)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all rows whose expiry has passed.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < datetime('now')")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Number of rows held for a user.
    pub async fn count_for_user(&self, username: &str) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}

/// Convert a Unix timestamp to the `YYYY-MM-DD HH:MM:SS` form SQLite's `datetime()` produces.
fn timestamp_to_datetime(timestamp: u64) -> String {
    let days_since_epoch = timestamp / 86400;
    let time_of_day = timestamp % 86400;
    let hours = time_of_day / 3600;
    let minutes = (time_of_day % 3600) / 60;
    let seconds = time_of_day % 60;

    let (year, month, day) = days_to_ymd(days_since_epoch as i64);

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year, month, day, hours, minutes, seconds
    )
}

/// Convert days since Unix epoch to year, month, day.
fn days_to_ymd(days: i64) -> (i32, u32, u32) {
    // Algorithm from http://howardhinnant.github.io/date_algorithms.html
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y as i32, m, d)
}
