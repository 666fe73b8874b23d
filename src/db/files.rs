//! Metadata for uploaded files. The bytes live on disk, see `storage`.

use serde::Serialize;
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct FileStore {
    pool: SqlitePool,
}

/// A full file record.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub id: i64,
    pub original_name: String,
    pub saved_name: String,
    pub use_type: String,
    pub content_type: String,
    pub size: i64,
    pub has_thumbnail: bool,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct StoredFileRow {
    id: i64,
    original_name: String,
    saved_name: String,
    use_type: String,
    content_type: String,
    size: i64,
    has_thumbnail: i32,
    created_at: String,
}

impl From<StoredFileRow> for StoredFile {
    fn from(row: StoredFileRow) -> Self {
        Self {
            id: row.id,
            original_name: row.original_name,
            saved_name: row.saved_name,
            use_type: row.use_type,
            content_type: row.content_type,
            size: row.size,
            has_thumbnail: row.has_thumbnail != 0,
            created_at: row.created_at,
        }
    }
}

/// Listing entry, serialized as-is in the `/files` response.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FileSummary {
    pub id: i64,
    pub original_name: String,
    pub use_type: String,
    pub size: i64,
    pub created_at: String,
}

/// Input for creating a file record.
pub struct NewFile<'a> {
    pub original_name: &'a str,
    pub saved_name: &'a str,
    pub use_type: &'a str,
    pub content_type: &'a str,
    pub size: i64,
}

impl FileStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a file record. Returns the file ID.
    pub async fn create(&self, file: NewFile<'_>) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO files (original_name, saved_name, use_type, content_type, size)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(file.original_name)
        .bind(file.saved_name)
        .bind(file.use_type)
        .bind(file.content_type)
        .bind(file.size)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn mark_thumbnail(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE files SET has_thumbnail = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get(&self, id: i64) -> Result<Option<StoredFile>, sqlx::Error> {
        let row: Option<StoredFileRow> = sqlx::query_as(
            "SELECT id, original_name, saved_name, use_type, content_type, size, has_thumbnail, created_at
             FROM files WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(StoredFile::from))
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// One page of files, newest first. `page` is 1-based.
    pub async fn list(&self, page: u32, page_size: u32) -> Result<Vec<FileSummary>, sqlx::Error> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(page_size);
        sqlx::query_as(
            "SELECT id, original_name, use_type, size, created_at
             FROM files ORDER BY id DESC LIMIT ? OFFSET ?",
        )
        .bind(i64::from(page_size))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }
}
