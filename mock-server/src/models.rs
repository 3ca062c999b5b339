//! Wire types as the server sees them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
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
    pub tags: HashMap<String, String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
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

#[derive(Debug, Deserialize)]
pub struct CreateRepo {
    pub name: String,
    pub max_size_bytes: Option<u64>,
    pub default_ttl_seconds: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRepo {
    pub name: Option<String>,
    pub max_size_bytes: Option<u64>,
    /// Absent and `null` both leave the TTL alone.
    pub default_ttl_seconds: Option<u64>,
    pub tags: Option<HashMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListReposQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub sort: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListFilesQuery {
    pub prefix: Option<String>,
    pub recursive: Option<bool>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct TransferFile {
    pub source: String,
    pub destination: String,
}

#[derive(Debug, Deserialize)]
pub struct ExecRequest {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub timeout_seconds: Option<u64>,
    pub max_output_bytes: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ExecResponse {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub truncated: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArchiveRequest {
    pub path: Option<String>,
    pub format: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_repo_absent_ttl_is_none() {
        let input: UpdateRepo = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert_eq!(input.default_ttl_seconds, None);
    }

    #[test]
    fn update_repo_null_ttl_reads_as_absent() {
        let input: UpdateRepo = serde_json::from_str(r#"{"default_ttl_seconds":null}"#).unwrap();
        assert_eq!(input.default_ttl_seconds, None);
    }

    #[test]
    fn update_repo_numeric_ttl_sets() {
        let input: UpdateRepo = serde_json::from_str(r#"{"default_ttl_seconds":30}"#).unwrap();
        assert_eq!(input.default_ttl_seconds, Some(30));
    }

    #[test]
    fn create_repo_rejects_missing_name() {
        let result: Result<CreateRepo, _> = serde_json::from_str(r#"{"max_size_bytes":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn exec_request_args_default_empty() {
        let input: ExecRequest = serde_json::from_str(r#"{"command":"ls"}"#).unwrap();
        assert!(input.args.is_empty());
        assert!(input.timeout_seconds.is_none());
    }
}
