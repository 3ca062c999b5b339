//! Domain DTOs for the file-repository API.
//!
//! # Design
//! These types mirror the server's JSON schema but are defined independently
//! of the mock-server crate; the integration tests catch schema drift.
//! Optional request fields carry `skip_serializing_if` so an unset field is
//! absent from the body rather than sent as `null`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Response of the unauthenticated `GET /health` probe. Not enveloped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Health {
    pub status: String,
}

/// Server-wide counters returned by `GET /api/v1/status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerStatus {
    pub repo_count: u64,
    pub total_size_bytes: u64,
    pub uptime_seconds: i64,
    pub version: String,
}

/// A named storage namespace with a size quota.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repo {
    pub id: Uuid,
    pub name: String,
    pub max_size_bytes: u64,
    pub current_size_bytes: u64,
    pub file_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub default_ttl_seconds: Option<u64>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

/// `GET /api/v1/repos/{id}` payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoDetails {
    pub repo: Repo,
    pub file_count: u64,
}

/// One page of repositories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoList {
    pub repos: Vec<Repo>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
}

/// Request payload for creating a repository. Quota and TTL fall back to
/// server defaults when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateRepoRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_ttl_seconds: Option<u64>,
}

impl CreateRepoRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Partial update of a repository. Only fields that are `Some` are sent.
///
/// The server has no way to clear a default TTL once set: a `null` on the
/// wire reads the same as an omitted field. `tags` replaces the whole tag
/// map.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct UpdateRepoRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_ttl_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

/// Sort order accepted by `list_repos`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RepoSort {
    /// Ascending by name.
    Name,
    /// Newest first. The server default.
    CreatedAt,
    /// Largest first.
    Size,
}

/// Query parameters for `GET /api/v1/repos`. Pages are 1-based.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ListReposParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<RepoSort>,
}

/// Metadata of a stored file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileMeta {
    pub repo_id: Uuid,
    pub path: String,
    pub size_bytes: u64,
    pub etag: String,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub access_count: u64,
    pub expires_at: Option<DateTime<Utc>>,
}

/// One page of files, sorted by path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileList {
    pub files: Vec<FileMeta>,
    pub page: u64,
    pub per_page: u64,
}

/// Query parameters for `GET /api/v1/repos/{id}/files`.
///
/// The server lists recursively unless `recursive` is `Some(false)`, in
/// which case only direct children of `prefix` are returned.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ListFilesParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recursive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u64>,
}

/// Extra knobs for an upload. Both travel as headers, not in the body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Sent as `X-File-TTL`; overrides the repository default.
    pub ttl_seconds: Option<u64>,
    /// Sent as `Content-Type`; defaults to `application/octet-stream`.
    pub content_type: Option<String>,
}

/// Body of `files-move` and `files-copy`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferFileRequest {
    pub source: String,
    pub destination: String,
}

impl TransferFileRequest {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

pub type MoveFileRequest = TransferFileRequest;
pub type CopyFileRequest = TransferFileRequest;

/// A downloaded file body plus the caching headers that came with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub content: Vec<u8>,
    pub content_type: Option<String>,
    /// Unquoted entity tag.
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

/// Outcome of a conditional download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Download {
    /// The server answered 304 to `If-None-Match`.
    NotModified,
    Content(FileContent),
}

/// File metadata as reported by `HEAD` response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileHead {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

/// Command to run inside a repository's sandbox. The server only accepts a
/// fixed set of read-only tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecRequest {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_bytes: Option<u64>,
}

impl ExecRequest {
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// Result of a sandboxed command. A timeout surfaces as `exit_code == -1`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub truncated: bool,
}

/// Body of `POST /api/v1/repos/{id}/archive`. Only `tar.gz` is supported.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiveRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// A downloaded archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
    /// Taken from `Content-Disposition`.
    pub file_name: Option<String>,
}
