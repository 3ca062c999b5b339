//! One-call-per-operation facade over `RepoClient` and a `Transport`.
//!
//! Each method builds the request, hands it to the transport and parses the
//! response. Nothing is retried; the first failure is returned as is.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::RepoClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{
    Archive, ArchiveRequest, CreateRepoRequest, Download, ExecRequest, ExecResult, FileHead,
    FileList, FileMeta, Health, ListFilesParams, ListReposParams, Repo, RepoDetails, RepoList,
    ServerStatus, TransferFileRequest, UpdateRepoRequest, UploadOptions,
};

#[cfg(feature = "ureq")]
use crate::transport::UreqTransport;

/// Blocking client for the file-repository service.
#[derive(Debug, Clone)]
pub struct Client<T> {
    core: RepoClient,
    transport: T,
}

#[cfg(feature = "ureq")]
impl Client<UreqTransport> {
    /// Client over a ureq agent honouring `config.timeout`.
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_transport(config, UreqTransport::new(config.timeout))
    }

    pub fn from_env() -> Result<Self, ApiError> {
        Ok(Self::new(&ClientConfig::from_env()?))
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(config: &ClientConfig, transport: T) -> Self {
        Self {
            core: RepoClient::new(&config.base_url, &config.api_key),
            transport,
        }
    }

    /// The underlying request builder, for callers that drive I/O themselves.
    pub fn requests(&self) -> &RepoClient {
        &self.core
    }

    pub fn health(&self) -> Result<Health, ApiError> {
        let response = self.send(self.core.build_health())?;
        observe(self.core.parse_health(response))
    }

    pub fn status(&self) -> Result<ServerStatus, ApiError> {
        let response = self.send(self.core.build_status())?;
        observe(self.core.parse_status(response))
    }

    pub fn create_repo(&self, input: &CreateRepoRequest) -> Result<Repo, ApiError> {
        let response = self.send(self.core.build_create_repo(input)?)?;
        observe(self.core.parse_create_repo(response))
    }

    pub fn list_repos(&self, params: &ListReposParams) -> Result<RepoList, ApiError> {
        let response = self.send(self.core.build_list_repos(params)?)?;
        observe(self.core.parse_list_repos(response))
    }

    pub fn get_repo(&self, id: Uuid) -> Result<RepoDetails, ApiError> {
        let response = self.send(self.core.build_get_repo(id))?;
        observe(self.core.parse_get_repo(response))
    }

    pub fn update_repo(&self, id: Uuid, input: &UpdateRepoRequest) -> Result<Repo, ApiError> {
        let response = self.send(self.core.build_update_repo(id, input)?)?;
        observe(self.core.parse_update_repo(response))
    }

    pub fn delete_repo(&self, id: Uuid) -> Result<(), ApiError> {
        let response = self.send(self.core.build_delete_repo(id))?;
        observe(self.core.parse_delete_repo(response))
    }

    pub fn list_files(&self, id: Uuid, params: &ListFilesParams) -> Result<FileList, ApiError> {
        let response = self.send(self.core.build_list_files(id, params)?)?;
        observe(self.core.parse_list_files(response))
    }

    pub fn upload_file(
        &self,
        id: Uuid,
        path: &str,
        content: impl Into<Vec<u8>>,
        options: &UploadOptions,
    ) -> Result<FileMeta, ApiError> {
        let request = self
            .core
            .build_upload_file(id, path, content.into(), options)?;
        let response = self.send(request)?;
        observe(self.core.parse_upload_file(response))
    }

    pub fn download_file(
        &self,
        id: Uuid,
        path: &str,
        if_none_match: Option<&str>,
    ) -> Result<Download, ApiError> {
        let response = self.send(self.core.build_download_file(id, path, if_none_match)?)?;
        observe(self.core.parse_download_file(response))
    }

    pub fn head_file(&self, id: Uuid, path: &str) -> Result<FileHead, ApiError> {
        let response = self.send(self.core.build_head_file(id, path)?)?;
        observe(self.core.parse_head_file(response))
    }

    pub fn delete_file(&self, id: Uuid, path: &str) -> Result<(), ApiError> {
        let response = self.send(self.core.build_delete_file(id, path)?)?;
        observe(self.core.parse_delete_file(response))
    }

    pub fn move_file(&self, id: Uuid, input: &TransferFileRequest) -> Result<FileMeta, ApiError> {
        let response = self.send(self.core.build_move_file(id, input)?)?;
        observe(self.core.parse_move_file(response))
    }

    pub fn copy_file(&self, id: Uuid, input: &TransferFileRequest) -> Result<FileMeta, ApiError> {
        let response = self.send(self.core.build_copy_file(id, input)?)?;
        observe(self.core.parse_copy_file(response))
    }

    pub fn exec(&self, id: Uuid, input: &ExecRequest) -> Result<ExecResult, ApiError> {
        let response = self.send(self.core.build_exec(id, input)?)?;
        observe(self.core.parse_exec(response))
    }

    pub fn create_archive(&self, id: Uuid, input: &ArchiveRequest) -> Result<Archive, ApiError> {
        let response = self.send(self.core.build_create_archive(id, input)?)?;
        observe(self.core.parse_create_archive(response))
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let method = request.method.as_str();
        debug!(method, url = %request.url, "sending request");
        let response = self.transport.execute(request).map_err(|e| {
            warn!(method, error = %e, "transport failed");
            e
        })?;
        debug!(method, status = response.status, bytes = response.body.len(), "received response");
        Ok(response)
    }
}

fn observe<R>(result: Result<R, ApiError>) -> Result<R, ApiError> {
    if let Err(e) = &result {
        warn!(status = ?e.status(), error = %e, "request failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::http::HttpMethod;

    /// Replays canned responses and records what was sent.
    struct Scripted {
        responses: Mutex<Vec<HttpResponse>>,
        sent: Mutex<Vec<HttpRequest>>,
    }

    impl Scripted {
        fn new(mut responses: Vec<HttpResponse>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    impl Transport for Scripted {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            self.sent.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ApiError::Transport("no scripted response".to_string()))
        }
    }

    fn config() -> ClientConfig {
        ClientConfig::new("http://repo.test", "k")
    }

    #[test]
    fn delete_repo_round_trip() {
        let transport = Scripted::new(vec![HttpResponse::new(204, Vec::new())]);
        let client = Client::with_transport(&config(), &transport);
        client.delete_repo(Uuid::nil()).unwrap();

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, HttpMethod::Delete);
        assert_eq!(
            sent[0].url,
            "http://repo.test/api/v1/repos/00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn conflict_surfaces_unchanged() {
        let transport = Scripted::new(vec![HttpResponse::new(
            409,
            r#"{"data":null,"error":{"code":409,"message":"Destination already exists: b"}}"#,
        )]);
        let client = Client::with_transport(&config(), &transport);
        let err = client
            .copy_file(Uuid::nil(), &TransferFileRequest::new("a", "b"))
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(transport.sent.lock().unwrap().len(), 1, "no retry");
    }

    #[test]
    fn transport_error_propagates() {
        let transport = Scripted::new(Vec::new());
        let client = Client::with_transport(&config(), &transport);
        let err = client.status().unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[test]
    fn invalid_path_never_reaches_transport() {
        let transport = Scripted::new(Vec::new());
        let client = Client::with_transport(&config(), &transport);
        let err = client.delete_file(Uuid::nil(), "/").unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
        assert!(transport.sent.lock().unwrap().is_empty());
    }
}
