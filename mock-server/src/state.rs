//! In-memory store shared by all handlers.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{FileMeta, Repo};

pub const DEFAULT_MAX_REPO_SIZE: u64 = 1_073_741_824;
pub const MAX_UPLOAD_SIZE: u64 = 104_857_600;
pub const COMMAND_MAX_OUTPUT_BYTES: usize = 10_485_760;

pub struct StoredFile {
    pub meta: FileMeta,
    pub content: Bytes,
}

pub struct RepoEntry {
    pub meta: Repo,
    /// Keyed by normalized relative path, so iteration is path-sorted.
    pub files: BTreeMap<String, StoredFile>,
}

impl RepoEntry {
    pub fn new(meta: Repo) -> Self {
        Self {
            meta,
            files: BTreeMap::new(),
        }
    }

    /// Account for a file of `new_size` replacing `old_size` bytes, failing
    /// when the repository quota would be exceeded.
    pub fn reserve(&self, old_size: u64, new_size: u64) -> Result<(), AppError> {
        let new_total = self.meta.current_size_bytes - old_size + new_size;
        if new_total > self.meta.max_size_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "Repository size limit exceeded. Need {} more bytes",
                new_total - self.meta.max_size_bytes
            )));
        }
        Ok(())
    }

    pub fn insert_file(&mut self, file: StoredFile, now: DateTime<Utc>) {
        let size = file.meta.size_bytes;
        match self.files.insert(file.meta.path.clone(), file) {
            Some(old) => self.meta.current_size_bytes -= old.meta.size_bytes,
            None => self.meta.file_count += 1,
        }
        self.meta.current_size_bytes += size;
        self.meta.updated_at = now;
    }

    pub fn remove_file(&mut self, path: &str, now: DateTime<Utc>) -> Option<StoredFile> {
        let removed = self.files.remove(path)?;
        self.meta.current_size_bytes -= removed.meta.size_bytes;
        self.meta.file_count -= 1;
        self.meta.updated_at = now;
        Some(removed)
    }
}

#[derive(Default)]
pub struct Store {
    pub repos: HashMap<Uuid, RepoEntry>,
}

impl Store {
    pub fn repo(&self, id: Uuid) -> Result<&RepoEntry, AppError> {
        self.repos.get(&id).ok_or_else(|| AppError::repo_not_found(id))
    }

    pub fn repo_mut(&mut self, id: Uuid) -> Result<&mut RepoEntry, AppError> {
        self.repos
            .get_mut(&id)
            .ok_or_else(|| AppError::repo_not_found(id))
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub api_key: Arc<str>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(api_key: &str) -> Self {
        Self {
            db: Arc::new(RwLock::new(Store::default())),
            api_key: Arc::from(api_key),
            started_at: Utc::now(),
        }
    }
}
