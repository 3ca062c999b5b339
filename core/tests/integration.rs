//! Full lifecycle test against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then exercises every client
//! operation over real HTTP through the ureq transport. Validates that
//! request building, envelope unwrapping and error mapping work end-to-end
//! with the actual server.

use std::io::Read as _;

use filerepo_core::{
    ApiError, ArchiveRequest, Client, ClientConfig, CreateRepoRequest, Download, ExecRequest,
    ListFilesParams, ListReposParams, RepoSort, TransferFileRequest, UpdateRepoRequest,
    UploadOptions, UreqTransport,
};

const API_KEY: &str = "integration-key";

/// Start the mock server on a random port and return its base URL.
fn spawn_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, API_KEY).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn client(base_url: &str) -> Client<UreqTransport> {
    Client::new(&ClientConfig::new(base_url, API_KEY))
}

#[test]
fn repo_and_file_lifecycle() {
    let base_url = spawn_server();
    let client = client(&base_url);

    // Step 1: health and status.
    assert_eq!(client.health().unwrap().status, "ok");
    let status = client.status().unwrap();
    assert_eq!(status.repo_count, 0);

    // Step 2: create two repos, one with explicit quota and TTL.
    let assets = client
        .create_repo(&CreateRepoRequest {
            name: "assets".to_string(),
            max_size_bytes: Some(1024),
            default_ttl_seconds: Some(3600),
        })
        .unwrap();
    assert_eq!(assets.max_size_bytes, 1024);
    assert_eq!(assets.default_ttl_seconds, Some(3600));
    let scratch = client.create_repo(&CreateRepoRequest::new("scratch")).unwrap();
    assert_eq!(scratch.default_ttl_seconds, None);

    // Step 3: list sorted by name.
    let list = client
        .list_repos(&ListReposParams {
            sort: Some(RepoSort::Name),
            ..ListReposParams::default()
        })
        .unwrap();
    assert_eq!(list.total, 2);
    let names: Vec<&str> = list.repos.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["assets", "scratch"]);

    // Step 4: update, rename and shorten the TTL.
    let updated = client
        .update_repo(
            assets.id,
            &UpdateRepoRequest {
                name: Some("media".to_string()),
                default_ttl_seconds: Some(600),
                ..UpdateRepoRequest::default()
            },
        )
        .unwrap();
    assert_eq!(updated.name, "media");
    assert_eq!(updated.default_ttl_seconds, Some(600));
    assert_eq!(updated.max_size_bytes, 1024, "unset fields are untouched");

    // Step 5: upload a file whose path needs encoding.
    let meta = client
        .upload_file(
            assets.id,
            "docs/read me.txt",
            b"hello world".to_vec(),
            &UploadOptions {
                ttl_seconds: Some(60),
                content_type: None,
            },
        )
        .unwrap();
    assert_eq!(meta.path, "docs/read me.txt");
    assert_eq!(meta.size_bytes, 11);
    assert_eq!(meta.content_type, "text/plain");
    assert!(meta.expires_at.is_some());

    // Step 6: download, then conditional download with the etag.
    let Download::Content(file) = client
        .download_file(assets.id, "docs/read me.txt", None)
        .unwrap()
    else {
        panic!("expected file content");
    };
    assert_eq!(file.content, b"hello world");
    assert_eq!(file.etag.as_deref(), Some(meta.etag.as_str()));
    let again = client
        .download_file(assets.id, "docs/read me.txt", Some(&meta.etag))
        .unwrap();
    assert_eq!(again, Download::NotModified);

    // Step 7: head.
    let head = client.head_file(assets.id, "docs/read me.txt").unwrap();
    assert_eq!(head.etag.as_deref(), Some(meta.etag.as_str()));
    assert_eq!(head.content_type.as_deref(), Some("text/plain"));

    // Step 8: copy, then a move onto the copy conflicts.
    let copy = client
        .copy_file(
            assets.id,
            &TransferFileRequest::new("docs/read me.txt", "docs/copy.txt"),
        )
        .unwrap();
    assert_eq!(copy.path, "docs/copy.txt");
    let err = client
        .move_file(
            assets.id,
            &TransferFileRequest::new("docs/read me.txt", "docs/copy.txt"),
        )
        .unwrap_err();
    assert!(
        matches!(err, ApiError::Conflict { status: 409, code: 409, ref message } if message.contains("docs/copy.txt")),
        "{err:?}"
    );

    // Step 9: move to a fresh name.
    let moved = client
        .move_file(
            assets.id,
            &TransferFileRequest::new("docs/copy.txt", "archive/copy.txt"),
        )
        .unwrap();
    assert_eq!(moved.path, "archive/copy.txt");

    // Step 10: list files, recursive and direct children only.
    let all = client
        .list_files(assets.id, &ListFilesParams::default())
        .unwrap();
    let paths: Vec<&str> = all.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["archive/copy.txt", "docs/read me.txt"]);
    let shallow = client
        .list_files(
            assets.id,
            &ListFilesParams {
                prefix: Some("docs/".to_string()),
                recursive: Some(false),
                ..ListFilesParams::default()
            },
        )
        .unwrap();
    assert_eq!(shallow.files.len(), 1);

    // Step 11: repo details reflect the two files.
    let details = client.get_repo(assets.id).unwrap();
    assert_eq!(details.file_count, 2);
    assert_eq!(details.repo.current_size_bytes, 22);

    // Step 12: exec.
    let result = client
        .exec(assets.id, &ExecRequest::new("cat", ["archive/copy.txt"]))
        .unwrap();
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout, "hello world");
    let err = client
        .exec(assets.id, &ExecRequest::new("rm", ["-rf", "docs"]))
        .unwrap_err();
    assert!(matches!(err, ApiError::Api { status: 403, .. }), "{err:?}");

    // Step 13: archive.
    let archive = client
        .create_archive(assets.id, &ArchiveRequest::default())
        .unwrap();
    assert_eq!(archive.content_type.as_deref(), Some("application/gzip"));
    assert_eq!(
        archive.file_name,
        Some(format!("{}.tar.gz", assets.id))
    );
    let mut manifest = String::new();
    flate2::read::GzDecoder::new(archive.data.as_slice())
        .read_to_string(&mut manifest)
        .unwrap();
    assert!(manifest.contains("docs/read me.txt"));
    let err = client
        .create_archive(
            assets.id,
            &ArchiveRequest {
                format: Some("zip".to_string()),
                ..ArchiveRequest::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::Api { status: 400, .. }), "{err:?}");

    // Step 14: delete a file, then it is gone.
    client.delete_file(assets.id, "archive/copy.txt").unwrap();
    let err = client.head_file(assets.id, "archive/copy.txt").unwrap_err();
    assert!(err.is_not_found(), "{err:?}");

    // Step 15: delete the repo; a second delete is NotFound.
    client.delete_repo(assets.id).unwrap();
    let err = client.get_repo(assets.id).unwrap_err();
    assert!(
        matches!(err, ApiError::NotFound { status: 404, code: 404, .. }),
        "{err:?}"
    );
    let err = client.delete_repo(assets.id).unwrap_err();
    assert!(err.is_not_found());

    // Step 16: status reflects the remaining repo.
    assert_eq!(client.status().unwrap().repo_count, 1);
}

#[test]
fn quota_exceeded_is_generic_api_error() {
    let base_url = spawn_server();
    let client = client(&base_url);
    let repo = client
        .create_repo(&CreateRepoRequest {
            name: "tiny".to_string(),
            max_size_bytes: Some(4),
            default_ttl_seconds: None,
        })
        .unwrap();
    let err = client
        .upload_file(repo.id, "big.bin", vec![0u8; 8], &UploadOptions::default())
        .unwrap_err();
    assert!(
        matches!(err, ApiError::Api { status: 413, code: 413, .. }),
        "{err:?}"
    );
}

#[test]
fn wrong_api_key_is_rejected() {
    let base_url = spawn_server();
    let client = Client::new(&ClientConfig::new(&base_url, "not-the-key"));

    // /health is public.
    assert!(client.health().is_ok());

    let err = client.status().unwrap_err();
    assert!(
        matches!(err, ApiError::Api { status: 401, code: 401, ref message } if message == "Invalid or missing API key"),
        "{err:?}"
    );
}

#[test]
fn unreachable_server_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(&format!("http://{addr}"));
    let err = client.health().unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)), "{err:?}");
}
