//! File upload, download and management handlers.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::envelope;
use crate::error::AppError;
use crate::models::{FileMeta, ListFilesQuery, TransferFile};
use crate::page_offset;
use crate::state::{AppState, StoredFile};

pub const FILE_TTL_HEADER: &str = "x-file-ttl";

/// Normalize a repository-relative path. `..` is refused outright; empty and
/// `.` segments are dropped.
pub fn validate_path(raw: &str) -> Result<String, AppError> {
    let mut segments = Vec::new();
    for segment in raw.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => return Err(AppError::Forbidden("Path traversal not allowed".into())),
            s if s.contains('\0') => {
                return Err(AppError::BadRequest("Null bytes not allowed in path".into()))
            }
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        return Err(AppError::BadRequest("Empty path".into()));
    }
    Ok(segments.join("/"))
}

pub fn content_type_for(path: &str) -> &'static str {
    let ext = path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("js") => "text/javascript",
        Some("xml") => "text/xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("gz") => "application/gzip",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

fn etag_of(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn metadata_headers(meta: &FileMeta) -> [(header::HeaderName, String); 4] {
    [
        (header::CONTENT_TYPE, meta.content_type.clone()),
        (header::ETAG, format!("\"{}\"", meta.etag)),
        (header::CACHE_CONTROL, "no-cache".to_string()),
        (header::LAST_MODIFIED, http_date(meta.updated_at)),
    ]
}

fn expires_after(now: DateTime<Utc>, secs: u64) -> Result<DateTime<Utc>, AppError> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| AppError::BadRequest(format!("TTL of {secs} seconds is out of range")))
}

pub async fn upload_file(
    State(state): State<AppState>,
    Path((repo_id, file_path)): Path<(Uuid, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, [(header::HeaderName, String); 1], Json<Value>), AppError> {
    let path = validate_path(&file_path)?;
    let size = body.len() as u64;
    let ttl: Option<u64> = headers
        .get(FILE_TTL_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());

    let mut db = state.db.write().await;
    let entry = db.repo_mut(repo_id)?;
    let now = Utc::now();
    let expires_at = ttl
        .or(entry.meta.default_ttl_seconds)
        .map(|secs| expires_after(now, secs))
        .transpose()?;

    let old_size = entry.files.get(&path).map_or(0, |f| f.meta.size_bytes);
    entry.reserve(old_size, size)?;
    let meta = FileMeta {
        repo_id,
        path: path.clone(),
        size_bytes: size,
        etag: etag_of(&body),
        content_type: content_type_for(&path).to_string(),
        created_at: now,
        updated_at: now,
        last_accessed_at: now,
        access_count: 0,
        expires_at,
    };
    entry.insert_file(
        StoredFile {
            meta: meta.clone(),
            content: body,
        },
        now,
    );
    tracing::info!(repo_id = %repo_id, path = %path, size, "file uploaded");

    let etag = format!("\"{}\"", meta.etag);
    Ok((StatusCode::CREATED, [(header::ETAG, etag)], envelope(meta)))
}

pub async fn download_file(
    State(state): State<AppState>,
    Path((repo_id, file_path)): Path<(Uuid, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let path = validate_path(&file_path)?;
    let mut db = state.db.write().await;
    let file = db
        .repo_mut(repo_id)?
        .files
        .get_mut(&path)
        .ok_or_else(|| AppError::NotFound(format!("File not found: {path}")))?;

    if let Some(inm) = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
    {
        if inm.trim_matches('"') == file.meta.etag {
            return Ok(StatusCode::NOT_MODIFIED.into_response());
        }
    }

    file.meta.access_count += 1;
    file.meta.last_accessed_at = Utc::now();
    Ok((
        StatusCode::OK,
        metadata_headers(&file.meta),
        file.content.clone(),
    )
        .into_response())
}

pub async fn head_file(
    State(state): State<AppState>,
    Path((repo_id, file_path)): Path<(Uuid, String)>,
) -> Result<Response, AppError> {
    let path = validate_path(&file_path)?;
    let db = state.db.read().await;
    let file = db
        .repo(repo_id)?
        .files
        .get(&path)
        .ok_or_else(|| AppError::NotFound(format!("File not found: {path}")))?;

    Ok((
        StatusCode::OK,
        metadata_headers(&file.meta),
        [(header::CONTENT_LENGTH, file.meta.size_bytes.to_string())],
    )
        .into_response())
}

pub async fn delete_file(
    State(state): State<AppState>,
    Path((repo_id, file_path)): Path<(Uuid, String)>,
) -> Result<StatusCode, AppError> {
    let path = validate_path(&file_path)?;
    let mut db = state.db.write().await;
    db.repo_mut(repo_id)?
        .remove_file(&path, Utc::now())
        .ok_or_else(|| AppError::NotFound(format!("File not found: {path}")))?;
    tracing::info!(repo_id = %repo_id, path = %path, "file deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_files(
    State(state): State<AppState>,
    Path(repo_id): Path<Uuid>,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<Value>, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(100).clamp(1, 1000);
    let recursive = query.recursive.unwrap_or(true);
    let prefix = query.prefix.unwrap_or_default();

    let db = state.db.read().await;
    let files: Vec<&FileMeta> = db
        .repo(repo_id)?
        .files
        .iter()
        .filter(|(path, _)| path.starts_with(prefix.as_str()))
        .filter(|(path, _)| {
            recursive || !path[prefix.len()..].trim_start_matches('/').contains('/')
        })
        .map(|(_, file)| &file.meta)
        .skip(page_offset(page, per_page))
        .take(per_page as usize)
        .collect();

    Ok(envelope(json!({
        "files": files,
        "page": page,
        "per_page": per_page,
    })))
}

pub async fn move_file(
    State(state): State<AppState>,
    Path(repo_id): Path<Uuid>,
    Json(input): Json<TransferFile>,
) -> Result<Json<Value>, AppError> {
    let source = validate_path(&input.source)?;
    let destination = validate_path(&input.destination)?;
    let mut db = state.db.write().await;
    let entry = db.repo_mut(repo_id)?;
    check_transfer(&entry.files, &source, &destination)?;

    let now = Utc::now();
    let Some(mut file) = entry.remove_file(&source, now) else {
        return Err(AppError::NotFound(format!("Source file not found: {source}")));
    };
    file.meta.path = destination.clone();
    file.meta.updated_at = now;
    let meta = file.meta.clone();
    entry.insert_file(file, now);
    tracing::info!(repo_id = %repo_id, source = %source, destination = %destination, "file moved");
    Ok(envelope(meta))
}

pub async fn copy_file(
    State(state): State<AppState>,
    Path(repo_id): Path<Uuid>,
    Json(input): Json<TransferFile>,
) -> Result<Json<Value>, AppError> {
    let source = validate_path(&input.source)?;
    let destination = validate_path(&input.destination)?;
    let mut db = state.db.write().await;
    let entry = db.repo_mut(repo_id)?;
    check_transfer(&entry.files, &source, &destination)?;

    let now = Utc::now();
    let original = &entry.files[&source];
    entry.reserve(0, original.meta.size_bytes)?;
    let meta = FileMeta {
        path: destination.clone(),
        created_at: now,
        updated_at: now,
        last_accessed_at: now,
        access_count: 0,
        ..original.meta.clone()
    };
    let copy = StoredFile {
        meta: meta.clone(),
        content: original.content.clone(),
    };
    entry.insert_file(copy, now);
    tracing::info!(repo_id = %repo_id, source = %source, destination = %destination, "file copied");
    Ok(envelope(meta))
}

fn check_transfer(
    files: &std::collections::BTreeMap<String, StoredFile>,
    source: &str,
    destination: &str,
) -> Result<(), AppError> {
    if !files.contains_key(source) {
        return Err(AppError::NotFound(format!("Source file not found: {source}")));
    }
    if files.contains_key(destination) {
        return Err(AppError::Conflict(format!(
            "Destination already exists: {destination}"
        )));
    }
    Ok(())
}
