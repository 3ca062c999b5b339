//! Client SDK for the file-repository service.
//!
//! # Overview
//! Exposes the service's REST API as typed calls. `RepoClient` builds
//! `HttpRequest` values and parses `HttpResponse` values without touching the
//! network (host-does-IO pattern); `Client` pairs it with a `Transport` so
//! each operation is one method call.
//!
//! # Design
//! - `RepoClient` is stateless. It holds only the base URL and API key.
//! - Each operation is split into `build_*` and `parse_*`, so the I/O
//!   boundary is explicit and both halves are testable in isolation.
//! - JSON responses are wrapped in a `{data, error}` envelope. Error
//!   responses map to `ApiError` by status: 404 is `NotFound`, 409 is
//!   `Conflict`, everything else is `Api`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.
//!
//! ```no_run
//! use filerepo_core::{Client, ClientConfig, CreateRepoRequest, UploadOptions};
//!
//! # fn main() -> Result<(), filerepo_core::ApiError> {
//! let client = Client::new(&ClientConfig::new("http://localhost:3000", "dev-key"));
//! let repo = client.create_repo(&CreateRepoRequest::new("scratch"))?;
//! client.upload_file(repo.id, "notes/today.txt", b"hello".to_vec(), &UploadOptions::default())?;
//! # Ok(())
//! # }
//! ```

pub mod blocking;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use blocking::Client;
pub use client::RepoClient;
pub use config::ClientConfig;
pub use envelope::{Envelope, ErrorBody};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::Transport;
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use types::{
    Archive, ArchiveRequest, CopyFileRequest, CreateRepoRequest, Download, ExecRequest,
    ExecResult, FileContent, FileHead, FileList, FileMeta, Health, ListFilesParams,
    ListReposParams, MoveFileRequest, Repo, RepoDetails, RepoList, RepoSort, ServerStatus,
    TransferFileRequest, UpdateRepoRequest, UploadOptions,
};
