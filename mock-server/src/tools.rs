//! Health, status, sandboxed exec and archive handlers.

use std::io::Write as _;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::envelope;
use crate::error::AppError;
use crate::files::validate_path;
use crate::models::{ArchiveRequest, ExecRequest, ExecResponse};
use crate::state::{AppState, RepoEntry, COMMAND_MAX_OUTPUT_BYTES};

const ALLOWED_COMMANDS: &[&str] = &[
    "rg", "grep", "head", "tail", "cat", "wc", "find", "ls", "sort", "uniq", "sed", "awk", "tr",
    "cut", "diff", "file", "stat", "du", "tree",
];

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let db = state.db.read().await;
    let total_size: u64 = db.repos.values().map(|r| r.meta.current_size_bytes).sum();
    let uptime = Utc::now()
        .signed_duration_since(state.started_at)
        .num_seconds();
    envelope(json!({
        "repo_count": db.repos.len(),
        "total_size_bytes": total_size,
        "uptime_seconds": uptime,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Reject arguments that could smuggle shell syntax or escape the repo.
fn validate_args(args: &[String]) -> Result<(), AppError> {
    for arg in args {
        if arg.contains("..") {
            return Err(AppError::Forbidden(
                "Path traversal in arguments not allowed".into(),
            ));
        }
        if let Some(ch) = arg
            .chars()
            .find(|c| matches!(c, '|' | ';' | '`' | '$' | '&' | '\n' | '\r'))
        {
            return Err(AppError::Forbidden(format!(
                "Shell metacharacter '{ch}' not allowed in arguments"
            )));
        }
    }
    Ok(())
}

/// Stand-in for the real sandbox: `cat` and `ls` are answered from the
/// store, every other allowed command succeeds with no output.
fn simulate(entry: &RepoEntry, command: &str, args: &[String]) -> (i32, String, String) {
    let operands: Vec<&str> = args
        .iter()
        .map(String::as_str)
        .filter(|a| !a.starts_with('-'))
        .collect();
    match command {
        "cat" => {
            let mut stdout = String::new();
            let mut stderr = String::new();
            for operand in &operands {
                match validate_path(operand)
                    .ok()
                    .and_then(|p| entry.files.get(&p))
                {
                    Some(file) => stdout.push_str(&String::from_utf8_lossy(&file.content)),
                    None => stderr.push_str(&format!("cat: {operand}: No such file or directory\n")),
                }
            }
            (i32::from(!stderr.is_empty()), stdout, stderr)
        }
        "ls" => {
            let dir = operands
                .first()
                .and_then(|d| validate_path(d).ok())
                .map(|d| format!("{d}/"))
                .unwrap_or_default();
            let mut names: Vec<&str> = entry
                .files
                .keys()
                .filter_map(|path| path.strip_prefix(dir.as_str()))
                .map(|rest| rest.split('/').next().unwrap_or(rest))
                .collect();
            names.dedup();
            let stdout: String = names.iter().map(|n| format!("{n}\n")).collect();
            (0, stdout, String::new())
        }
        _ => (0, String::new(), String::new()),
    }
}

fn truncate(mut output: String, max: usize, truncated: &mut bool) -> String {
    if output.len() > max {
        let mut cut = max;
        while !output.is_char_boundary(cut) {
            cut -= 1;
        }
        output.truncate(cut);
        *truncated = true;
    }
    output
}

pub async fn exec_command(
    State(state): State<AppState>,
    Path(repo_id): Path<Uuid>,
    Json(input): Json<ExecRequest>,
) -> Result<Json<Value>, AppError> {
    let db = state.db.read().await;
    let entry = db.repo(repo_id)?;
    if !ALLOWED_COMMANDS.contains(&input.command.as_str()) {
        return Err(AppError::Forbidden(format!(
            "Command '{}' is not allowed",
            input.command
        )));
    }
    validate_args(&input.args)?;
    tracing::info!(
        repo_id = %repo_id,
        command = %input.command,
        args = ?input.args,
        timeout_seconds = ?input.timeout_seconds,
        "executing command"
    );

    let max = input.max_output_bytes.unwrap_or(COMMAND_MAX_OUTPUT_BYTES);
    let (exit_code, stdout, stderr) = simulate(entry, &input.command, &input.args);
    let mut truncated = false;
    let stdout = truncate(stdout, max, &mut truncated);
    let stderr = truncate(stderr, max, &mut truncated);

    Ok(envelope(ExecResponse {
        exit_code,
        stdout,
        stderr,
        duration_ms: 0,
        truncated,
    }))
}

/// Returns a gzip stream of a `path\tsize\tetag` manifest rather than a real
/// tarball; clients only see opaque `application/gzip` bytes.
pub async fn create_archive(
    State(state): State<AppState>,
    Path(repo_id): Path<Uuid>,
    Json(input): Json<ArchiveRequest>,
) -> Result<Response, AppError> {
    let db = state.db.read().await;
    let entry = db.repo(repo_id)?;

    let format = input.format.unwrap_or_else(|| "tar.gz".into());
    if format != "tar.gz" {
        return Err(AppError::BadRequest(
            "Only tar.gz format is currently supported".into(),
        ));
    }

    let root = input.path.as_deref().map(validate_path).transpose()?;
    let selected: Vec<_> = entry
        .files
        .values()
        .filter(|file| match &root {
            Some(root) => {
                file.meta.path == *root || file.meta.path.starts_with(&format!("{root}/"))
            }
            None => true,
        })
        .collect();
    if root.is_some() && selected.is_empty() {
        return Err(AppError::NotFound("Archive path not found".into()));
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    for file in &selected {
        writeln!(
            encoder,
            "{}\t{}\t{}",
            file.meta.path, file.meta.size_bytes, file.meta.etag
        )?;
    }
    let data = encoder.finish()?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/gzip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{repo_id}.tar.gz\""),
            ),
        ],
        data,
    )
        .into_response())
}
