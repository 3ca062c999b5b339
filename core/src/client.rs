//! Stateless HTTP request builder and response parser for the
//! file-repository API.
//!
//! # Design
//! `RepoClient` holds only the base URL and API key and carries no mutable
//! state between calls. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. The round trip itself belongs to a `Transport`, keeping
//! this half deterministic and free of I/O.

use serde::Serialize;
use uuid::Uuid;

use crate::envelope::{error_from_response, parse_data, parse_empty};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    Archive, ArchiveRequest, CreateRepoRequest, Download, ExecRequest, ExecResult, FileContent,
    FileHead, FileList, FileMeta, Health, ListFilesParams, ListReposParams, Repo, RepoDetails,
    RepoList, ServerStatus, TransferFileRequest, UpdateRepoRequest, UploadOptions,
};

pub const API_KEY_HEADER: &str = "x-api-key";
pub const FILE_TTL_HEADER: &str = "x-file-ttl";

const JSON: &str = "application/json";
const OCTET_STREAM: &str = "application/octet-stream";

/// Synchronous, stateless client for the file-repository API.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network. Every built request carries the `X-API-Key` header.
#[derive(Debug, Clone)]
pub struct RepoClient {
    base_url: String,
    api_key: String,
}

impl RepoClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_health(&self) -> HttpRequest {
        self.request(HttpMethod::Get, format!("{}/health", self.base_url))
    }

    /// `/health` answers with a bare object, not an envelope.
    pub fn parse_health(&self, response: HttpResponse) -> Result<Health, ApiError> {
        if !response.is_success() {
            return Err(error_from_response(&response));
        }
        serde_json::from_slice(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    pub fn build_status(&self) -> HttpRequest {
        self.request(HttpMethod::Get, self.api_url("/status"))
    }

    pub fn parse_status(&self, response: HttpResponse) -> Result<ServerStatus, ApiError> {
        parse_data(&response)
    }

    pub fn build_create_repo(&self, input: &CreateRepoRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, self.api_url("/repos"), input)
    }

    pub fn parse_create_repo(&self, response: HttpResponse) -> Result<Repo, ApiError> {
        parse_data(&response)
    }

    pub fn build_list_repos(&self, params: &ListReposParams) -> Result<HttpRequest, ApiError> {
        let url = with_query(self.api_url("/repos"), params)?;
        Ok(self.request(HttpMethod::Get, url))
    }

    pub fn parse_list_repos(&self, response: HttpResponse) -> Result<RepoList, ApiError> {
        parse_data(&response)
    }

    pub fn build_get_repo(&self, id: Uuid) -> HttpRequest {
        self.request(HttpMethod::Get, self.repo_url(id, ""))
    }

    pub fn parse_get_repo(&self, response: HttpResponse) -> Result<RepoDetails, ApiError> {
        parse_data(&response)
    }

    pub fn build_update_repo(
        &self,
        id: Uuid,
        input: &UpdateRepoRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Patch, self.repo_url(id, ""), input)
    }

    pub fn parse_update_repo(&self, response: HttpResponse) -> Result<Repo, ApiError> {
        parse_data(&response)
    }

    pub fn build_delete_repo(&self, id: Uuid) -> HttpRequest {
        self.request(HttpMethod::Delete, self.repo_url(id, ""))
    }

    pub fn parse_delete_repo(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty(&response)
    }

    pub fn build_list_files(
        &self,
        id: Uuid,
        params: &ListFilesParams,
    ) -> Result<HttpRequest, ApiError> {
        let url = with_query(self.repo_url(id, "/files"), params)?;
        Ok(self.request(HttpMethod::Get, url))
    }

    pub fn parse_list_files(&self, response: HttpResponse) -> Result<FileList, ApiError> {
        parse_data(&response)
    }

    pub fn build_upload_file(
        &self,
        id: Uuid,
        path: &str,
        content: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<HttpRequest, ApiError> {
        let mut req = self.request(HttpMethod::Post, self.file_url(id, path)?);
        let content_type = options.content_type.as_deref().unwrap_or(OCTET_STREAM);
        req.headers
            .push(("content-type".to_string(), content_type.to_string()));
        if let Some(ttl) = options.ttl_seconds {
            req.headers
                .push((FILE_TTL_HEADER.to_string(), ttl.to_string()));
        }
        req.body = Some(content);
        Ok(req)
    }

    pub fn parse_upload_file(&self, response: HttpResponse) -> Result<FileMeta, ApiError> {
        parse_data(&response)
    }

    /// `if_none_match` is sent as an `If-None-Match` header; quotes are added
    /// when missing.
    pub fn build_download_file(
        &self,
        id: Uuid,
        path: &str,
        if_none_match: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        let mut req = self.request(HttpMethod::Get, self.file_url(id, path)?);
        if let Some(etag) = if_none_match {
            req.headers
                .push(("if-none-match".to_string(), quote_etag(etag)));
        }
        Ok(req)
    }

    pub fn parse_download_file(&self, response: HttpResponse) -> Result<Download, ApiError> {
        if response.status == 304 {
            return Ok(Download::NotModified);
        }
        if !response.is_success() {
            return Err(error_from_response(&response));
        }
        Ok(Download::Content(FileContent {
            content_type: owned_header(&response, "content-type"),
            etag: response.header("etag").map(unquote_etag),
            last_modified: owned_header(&response, "last-modified"),
            content: response.body,
        }))
    }

    pub fn build_head_file(&self, id: Uuid, path: &str) -> Result<HttpRequest, ApiError> {
        Ok(self.request(HttpMethod::Head, self.file_url(id, path)?))
    }

    /// HEAD responses have no body; everything comes from headers.
    pub fn parse_head_file(&self, response: HttpResponse) -> Result<FileHead, ApiError> {
        if !response.is_success() {
            return Err(error_from_response(&response));
        }
        let content_length = match response.header("content-length") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|e| {
                ApiError::Deserialization(format!("invalid content-length {raw:?}: {e}"))
            })?),
            None => None,
        };
        Ok(FileHead {
            content_type: owned_header(&response, "content-type"),
            content_length,
            etag: response.header("etag").map(unquote_etag),
            last_modified: owned_header(&response, "last-modified"),
        })
    }

    pub fn build_delete_file(&self, id: Uuid, path: &str) -> Result<HttpRequest, ApiError> {
        Ok(self.request(HttpMethod::Delete, self.file_url(id, path)?))
    }

    pub fn parse_delete_file(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty(&response)
    }

    pub fn build_move_file(
        &self,
        id: Uuid,
        input: &TransferFileRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, self.repo_url(id, "/files-move"), input)
    }

    pub fn parse_move_file(&self, response: HttpResponse) -> Result<FileMeta, ApiError> {
        parse_data(&response)
    }

    pub fn build_copy_file(
        &self,
        id: Uuid,
        input: &TransferFileRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, self.repo_url(id, "/files-copy"), input)
    }

    pub fn parse_copy_file(&self, response: HttpResponse) -> Result<FileMeta, ApiError> {
        parse_data(&response)
    }

    pub fn build_exec(&self, id: Uuid, input: &ExecRequest) -> Result<HttpRequest, ApiError> {
        if input.command.is_empty() {
            return Err(ApiError::InvalidInput("command must not be empty".to_string()));
        }
        self.json_request(HttpMethod::Post, self.repo_url(id, "/exec"), input)
    }

    pub fn parse_exec(&self, response: HttpResponse) -> Result<ExecResult, ApiError> {
        parse_data(&response)
    }

    pub fn build_create_archive(
        &self,
        id: Uuid,
        input: &ArchiveRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, self.repo_url(id, "/archive"), input)
    }

    /// The archive is returned as raw bytes, not enveloped.
    pub fn parse_create_archive(&self, response: HttpResponse) -> Result<Archive, ApiError> {
        if !response.is_success() {
            return Err(error_from_response(&response));
        }
        Ok(Archive {
            content_type: owned_header(&response, "content-type"),
            file_name: response
                .header("content-disposition")
                .and_then(disposition_file_name),
            data: response.body,
        })
    }

    fn api_url(&self, suffix: &str) -> String {
        format!("{}/api/v1{suffix}", self.base_url)
    }

    fn repo_url(&self, id: Uuid, suffix: &str) -> String {
        format!("{}/api/v1/repos/{id}{suffix}", self.base_url)
    }

    fn file_url(&self, id: Uuid, path: &str) -> Result<String, ApiError> {
        Ok(self.repo_url(id, &format!("/files/{}", encode_file_path(path)?)))
    }

    fn request(&self, method: HttpMethod, url: String) -> HttpRequest {
        HttpRequest {
            method,
            url,
            headers: vec![(API_KEY_HEADER.to_string(), self.api_key.clone())],
            body: None,
        }
    }

    fn json_request<T: Serialize>(
        &self,
        method: HttpMethod,
        url: String,
        input: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body =
            serde_json::to_vec(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut req = self.request(method, url);
        req.headers
            .push(("content-type".to_string(), JSON.to_string()));
        req.body = Some(body);
        Ok(req)
    }
}

/// Percent-encode each segment of a repository-relative path, keeping `/`
/// separators. Leading, trailing and repeated slashes are dropped.
///
/// `.` and `..` segments are refused: URL normalization would resolve them
/// before the request reaches the server.
pub fn encode_file_path(path: &str) -> Result<String, ApiError> {
    let mut segments = Vec::new();
    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        if segment == "." || segment == ".." {
            return Err(ApiError::InvalidInput(format!(
                "file path {path:?} contains a {segment:?} segment"
            )));
        }
        segments.push(urlencoding::encode(segment).into_owned());
    }
    if segments.is_empty() {
        return Err(ApiError::InvalidInput(format!(
            "file path {path:?} is empty"
        )));
    }
    Ok(segments.join("/"))
}

fn with_query<Q: Serialize>(url: String, params: &Q) -> Result<String, ApiError> {
    let query =
        serde_urlencoded::to_string(params).map_err(|e| ApiError::Serialization(e.to_string()))?;
    if query.is_empty() {
        Ok(url)
    } else {
        Ok(format!("{url}?{query}"))
    }
}

fn owned_header(response: &HttpResponse, name: &str) -> Option<String> {
    response.header(name).map(str::to_string)
}

fn quote_etag(etag: &str) -> String {
    if etag.starts_with('"') || etag.starts_with("W/") {
        etag.to_string()
    } else {
        format!("\"{etag}\"")
    }
}

fn unquote_etag(raw: &str) -> String {
    raw.trim().trim_matches('"').to_string()
}

/// Extract `filename` from `attachment; filename="abc.tar.gz"`.
fn disposition_file_name(value: &str) -> Option<String> {
    value.split(';').find_map(|part| {
        let (key, val) = part.trim().split_once('=')?;
        if key.trim().eq_ignore_ascii_case("filename") {
            Some(val.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}
