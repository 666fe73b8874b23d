//! File endpoints.
//!
//! - POST `/upload` - Multipart upload (`useType`, `file`), any role
//! - GET `/download?id=` - Original bytes as an attachment, any role
//! - DELETE `/delete?id=` - Remove blob, thumbnail and record, admin only
//! - GET `/files?page=&pageSize=` - Newest-first listing, any role

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
    routing::{delete, get, post},
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use super::error::{ApiError, ResultExt, parse_file_id};
use crate::auth::{AdminOnly, Auth};
use crate::db::{Database, FileAction, FileSummary, NewFile, StoredFile};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::storage::{FileStorage, UploadCategory, extension_for, is_image};
use crate::thumbnail::generate_thumbnail;

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Clone)]
pub struct FilesState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub storage: FileStorage,
}

impl_has_auth_backend!(FilesState);

pub fn router(state: FilesState) -> Router {
    Router::new()
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/download", get(download_file))
        .route("/delete", delete(delete_file))
        .route("/files", get(list_files))
        .with_state(state)
}

// --- Request/response types ---

#[derive(Deserialize)]
struct IdQuery {
    id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    page: Option<String>,
    page_size: Option<String>,
}

#[derive(Serialize)]
struct UploadResponse {
    id: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    files: Vec<FileSummary>,
    page: u32,
    page_size: u32,
}

/// Missing, zero or unparsable values fall back to the default.
fn positive_or(value: Option<&str>, default: u32) -> u32 {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

struct UploadedFile {
    original_name: String,
    content_type: String,
    data: Vec<u8>,
}

// --- Handlers ---

async fn upload_file(
    State(state): State<FilesState>,
    Auth { user, .. }: Auth,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut use_type: Option<String> = None;
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("Invalid multipart data"))?
    {
        match field.name().unwrap_or("") {
            "useType" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Failed to read useType"))?;
                use_type = Some(text);
            }
            "file" => {
                let original_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::bad_request("Failed to read file data"))?;
                file = Some(UploadedFile {
                    original_name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let category = use_type
        .as_deref()
        .and_then(UploadCategory::parse)
        .ok_or_else(|| ApiError::bad_request("Invalid useType"))?;
    let file = file.ok_or_else(|| ApiError::bad_request("File missing"))?;
    if !category.allows(&file.content_type) {
        return Err(ApiError::bad_request("Unsupported file type"));
    }

    let extension = extension_for(&file.original_name, &file.content_type);
    let saved_name = state
        .storage
        .save(category, &extension, &file.data)
        .await
        .storage_err("Failed to save file")?;

    let created = state
        .db
        .files()
        .create(NewFile {
            original_name: &file.original_name,
            saved_name: &saved_name,
            use_type: category.as_str(),
            content_type: &file.content_type,
            size: file.data.len() as i64,
        })
        .await;
    let id = match created {
        Ok(id) => id,
        Err(e) => {
            if let Err(e) = state.storage.remove(category, &saved_name).await {
                warn!(error = %e, "Failed to remove orphaned upload");
            }
            return Err(ApiError::db_error("Failed to record file", e));
        }
    };

    if is_image(&file.content_type) {
        store_thumbnail(&state, id, &saved_name, file.data).await;
    }

    state
        .db
        .history()
        .record(id, &user.username, FileAction::Upload)
        .await
        .db_err("Failed to record history")?;

    info!(id, username = %user.username, use_type = category.as_str(), "File uploaded");
    Ok((StatusCode::OK, Json(UploadResponse { id })))
}

/// Thumbnail failures are logged and never fail the upload.
async fn store_thumbnail(state: &FilesState, id: i64, saved_name: &str, data: Vec<u8>) {
    let thumb = match generate_thumbnail(data).await {
        Ok(thumb) => thumb,
        Err(e) => {
            warn!(id, error = %e, "Thumbnail generation failed");
            return;
        }
    };
    if let Err(e) = state.storage.save_thumbnail(saved_name, &thumb).await {
        warn!(id, error = %e, "Failed to write thumbnail");
        return;
    }
    if let Err(e) = state.db.files().mark_thumbnail(id).await {
        warn!(id, error = %e, "Failed to mark thumbnail");
    }
}

async fn find_file(state: &FilesState, id: i64) -> Result<(StoredFile, UploadCategory), ApiError> {
    let file = state
        .db
        .files()
        .get(id)
        .await
        .db_err("Failed to get file")?
        .ok_or_else(|| ApiError::not_found("File not found"))?;
    let category = UploadCategory::parse(&file.use_type).ok_or_else(|| {
        warn!(id, use_type = %file.use_type, "Stored file has unknown use type");
        ApiError::not_found("File not found")
    })?;
    Ok((file, category))
}

/// RFC 5987 `attr-char`: everything else is percent-encoded in `filename*`.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Content-Disposition for a download.
///
/// `filename` carries an ASCII-only fallback. Names that needed rewriting
/// also get `filename*` with the UTF-8 original percent-encoded.
fn disposition(original_name: &str) -> HeaderValue {
    let fallback: String = original_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    let value = if fallback == original_name {
        format!("attachment; filename=\"{}\"", fallback)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            utf8_percent_encode(original_name, ATTR_CHAR)
        )
    };
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

async fn download_file(
    State(state): State<FilesState>,
    Auth { user, .. }: Auth,
    Query(query): Query<IdQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_file_id(query.id.as_deref())?;
    let (file, category) = find_file(&state, id).await?;

    let data = state
        .storage
        .read(category, &file.saved_name)
        .await
        .storage_err("Failed to read file")?
        .ok_or_else(|| {
            warn!(id, "File record without blob");
            ApiError::not_found("File not found")
        })?;

    state
        .db
        .history()
        .record(id, &user.username, FileAction::Download)
        .await
        .db_err("Failed to record history")?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&file.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_DISPOSITION, disposition(&file.original_name));

    Ok((headers, Body::from(data)))
}

async fn delete_file(
    State(state): State<FilesState>,
    Auth { user, .. }: Auth<AdminOnly>,
    Query(query): Query<IdQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_file_id(query.id.as_deref())?;
    let (file, category) = find_file(&state, id).await?;

    state
        .db
        .files()
        .delete(id)
        .await
        .db_err("Failed to delete file")?;
    state
        .db
        .history()
        .record(id, &user.username, FileAction::Delete)
        .await
        .db_err("Failed to record history")?;

    // The record is gone, leftover files are only logged.
    if let Err(e) = state.storage.remove(category, &file.saved_name).await {
        warn!(id, error = %e, "Failed to remove file");
    }
    if file.has_thumbnail {
        if let Err(e) = state.storage.remove_thumbnail(&file.saved_name).await {
            warn!(id, error = %e, "Failed to remove thumbnail");
        }
    }

    info!(id, username = %user.username, "File deleted");
    Ok((StatusCode::OK, Json(json!({ "message": "File deleted" }))))
}

async fn list_files(
    State(state): State<FilesState>,
    Auth { .. }: Auth,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = positive_or(query.page.as_deref(), 1);
    let page_size = positive_or(query.page_size.as_deref(), DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);

    let files = state
        .db
        .files()
        .list(page, page_size)
        .await
        .db_err("Failed to list files")?;

    Ok(Json(ListResponse {
        files,
        page,
        page_size,
    }))
}
