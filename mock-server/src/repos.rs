//! `/api/v1/repos` handlers.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::envelope;
use crate::error::AppError;
use crate::models::{CreateRepo, ListReposQuery, Repo, UpdateRepo};
use crate::page_offset;
use crate::state::{AppState, RepoEntry, DEFAULT_MAX_REPO_SIZE};

pub async fn create_repo(
    State(state): State<AppState>,
    Json(input): Json<CreateRepo>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".into()));
    }
    let now = Utc::now();
    let repo = Repo {
        id: Uuid::new_v4(),
        name: input.name,
        max_size_bytes: input.max_size_bytes.unwrap_or(DEFAULT_MAX_REPO_SIZE),
        current_size_bytes: 0,
        file_count: 0,
        created_at: now,
        updated_at: now,
        last_accessed_at: now,
        default_ttl_seconds: input.default_ttl_seconds,
        tags: HashMap::new(),
    };
    state
        .db
        .write()
        .await
        .repos
        .insert(repo.id, RepoEntry::new(repo.clone()));
    tracing::info!(repo_id = %repo.id, name = %repo.name, "repository created");
    Ok((StatusCode::CREATED, envelope(repo)))
}

pub async fn list_repos(
    State(state): State<AppState>,
    Query(query): Query<ListReposQuery>,
) -> Json<Value> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let db = state.db.read().await;
    let mut repos: Vec<Repo> = db.repos.values().map(|r| r.meta.clone()).collect();
    match query.sort.as_deref() {
        Some("name") => repos.sort_by(|a, b| a.name.cmp(&b.name)),
        Some("size") => repos.sort_by(|a, b| b.current_size_bytes.cmp(&a.current_size_bytes)),
        _ => repos.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
    let total = repos.len();
    let repos: Vec<Repo> = repos
        .into_iter()
        .skip(page_offset(page, per_page))
        .take(per_page as usize)
        .collect();

    envelope(json!({
        "repos": repos,
        "page": page,
        "per_page": per_page,
        "total": total,
    }))
}

pub async fn get_repo(
    State(state): State<AppState>,
    Path(repo_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let mut db = state.db.write().await;
    let entry = db.repo_mut(repo_id)?;
    entry.meta.last_accessed_at = Utc::now();
    Ok(envelope(json!({
        "repo": entry.meta,
        "file_count": entry.files.len(),
    })))
}

pub async fn update_repo(
    State(state): State<AppState>,
    Path(repo_id): Path<Uuid>,
    Json(input): Json<UpdateRepo>,
) -> Result<Json<Value>, AppError> {
    let mut db = state.db.write().await;
    let repo = &mut db.repo_mut(repo_id)?.meta;
    if let Some(name) = input.name {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("Name must not be empty".into()));
        }
        repo.name = name;
    }
    if let Some(max_size) = input.max_size_bytes {
        repo.max_size_bytes = max_size;
    }
    if let Some(ttl) = input.default_ttl_seconds {
        repo.default_ttl_seconds = Some(ttl);
    }
    if let Some(tags) = input.tags {
        repo.tags = tags;
    }
    repo.updated_at = Utc::now();
    tracing::info!(repo_id = %repo_id, "repository updated");
    Ok(envelope(repo.clone()))
}

pub async fn delete_repo(
    State(state): State<AppState>,
    Path(repo_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .db
        .write()
        .await
        .repos
        .remove(&repo_id)
        .ok_or_else(|| AppError::repo_not_found(repo_id))?;
    tracing::info!(repo_id = %repo_id, "repository deleted");
    Ok(StatusCode::NO_CONTENT)
}
