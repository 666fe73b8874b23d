//! Audit trail of file operations.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct FileHistoryStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Upload,
    Download,
    Delete,
}

impl FileAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileAction::Upload => "upload",
            FileAction::Download => "download",
            FileAction::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileHistoryEntry {
    pub file_id: i64,
    pub username: String,
    pub action: String,
    pub created_at: String,
}

impl FileHistoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record(
        &self,
        file_id: i64,
        username: &str,
        action: FileAction,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO file_history (file_id, username, action) VALUES (?, ?, ?)")
            .bind(file_id)
            .bind(username)
            .bind(action.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// History of one file, oldest first.
    pub async fn for_file(&self, file_id: i64) -> Result<Vec<FileHistoryEntry>, sqlx::Error> {
        sqlx::query_as(
            "SELECT file_id, username, action, created_at FROM file_history
             WHERE file_id = ? ORDER BY id",
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await
    }
}
