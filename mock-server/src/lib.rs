//! In-memory stand-in for the file-repository service.
//!
//! Serves the same routes, envelopes and status codes as the real service so
//! the client SDK can be exercised end to end without disk or sandbox.

mod error;
mod files;
mod models;
mod repos;
mod state;
mod tools;

use axum::extract::{DefaultBodyLimit, Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::error::AppError;

pub use models::{FileMeta, Repo};
pub use state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Wrap a payload in the success envelope.
pub fn envelope<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "data": data, "error": null }))
}

/// Items to skip before a 1-based `page`. Saturates instead of overflowing.
pub(crate) fn page_offset(page: u64, per_page: u64) -> usize {
    let offset = page.saturating_sub(1).saturating_mul(per_page);
    usize::try_from(offset).unwrap_or(usize::MAX)
}

pub fn app(api_key: &str) -> Router {
    let state = AppState::new(api_key);

    let api = Router::new()
        .route("/status", get(tools::status))
        .route("/repos", get(repos::list_repos).post(repos::create_repo))
        .route(
            "/repos/{repo_id}",
            get(repos::get_repo)
                .patch(repos::update_repo)
                .delete(repos::delete_repo),
        )
        .route("/repos/{repo_id}/files", get(files::list_files))
        .route(
            "/repos/{repo_id}/files/{*file_path}",
            post(files::upload_file)
                .get(files::download_file)
                .head(files::head_file)
                .delete(files::delete_file),
        )
        .route("/repos/{repo_id}/files-move", post(files::move_file))
        .route("/repos/{repo_id}/files-copy", post(files::copy_file))
        .route("/repos/{repo_id}/exec", post(tools::exec_command))
        .route("/repos/{repo_id}/archive", post(tools::create_archive))
        .layer(DefaultBodyLimit::max(state::MAX_UPLOAD_SIZE as usize))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/health", get(tools::health))
        .nest("/api/v1", api)
        .with_state(state)
}

pub async fn run(listener: TcpListener, api_key: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(api_key)).await
}

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if provided != &*state.api_key {
        return AppError::Unauthorized.into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn envelope_has_null_error() {
        let Json(value) = envelope(json!({ "status": "ok" }));
        assert_eq!(value["data"]["status"], "ok");
        assert!(value["error"].is_null());
    }

    #[test]
    fn page_offset_saturates() {
        assert_eq!(page_offset(1, 20), 0);
        assert_eq!(page_offset(3, 20), 40);
        assert_eq!(page_offset(u64::MAX, 1000), usize::MAX);
    }

    #[test]
    fn repo_roundtrips_through_json() {
        let now = Utc::now();
        let repo = Repo {
            id: Uuid::new_v4(),
            name: "roundtrip".to_string(),
            max_size_bytes: 10,
            current_size_bytes: 0,
            file_count: 0,
            created_at: now,
            updated_at: now,
            last_accessed_at: now,
            default_ttl_seconds: None,
            tags: Default::default(),
        };
        let json = serde_json::to_string(&repo).unwrap();
        let back: Repo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, repo);
    }
}
