//! Uploader (C7) — replays a completed output tree to the Server.
//!
//! Order of calls per §4.7: create source, upload each batch file in
//! ascending numeric order, upload code-projects.json if present and
//! non-empty, mark the scan complete. Any non-2xx response aborts the
//! run with exit 1; the Ingest Service's idempotence is at source
//! granularity only, so a half-finished upload is not safely retriable
//! batch-by-batch.

use archivum_core::dto::{CodeProjectDto, CompleteScanRequest, FileBatchDto, SourceDto, SummaryDto};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

pub struct UploadOptions {
    pub server_url: String,
    pub timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("could not read output tree at {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("server responded {status} for {url}: {body}")]
    NonSuccess {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Upload the output tree rooted at `tree_dir` (as written by the
/// orchestrator: `source.json`, `files/batch-NNNN.json`, optional
/// `code-projects.json`, `summary.json`) to the Server.
pub fn upload_tree(tree_dir: &Path, opts: &UploadOptions) -> Result<(), UploadError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(opts.timeout)
        .build()
        .map_err(|e| UploadError::Request {
            url: opts.server_url.clone(),
            source: e,
        })?;

    let source_text = read_to_string(&tree_dir.join("source.json"))?;
    let mut source: SourceDto =
        serde_json::from_str(&source_text).map_err(|e| UploadError::Parse {
            path: tree_dir.join("source.json"),
            source: e,
        })?;

    let create_url = format!("{}/api/sources", opts.server_url);
    info!(url = %create_url, "creating source");
    let created: SourceDto = post_json(&client, &create_url, &source)?;
    let remapped_id = created.id;
    if remapped_id != source.id {
        info!(local_id = %source.id, server_id = %remapped_id, "source id remapped by server");
    }
    source = created;

    let files_dir = tree_dir.join("files");
    let mut batch_paths: Vec<std::path::PathBuf> = std::fs::read_dir(&files_dir)
        .map_err(|e| UploadError::Read {
            path: files_dir.clone(),
            source: e,
        })?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("batch-") && n.ends_with(".json"))
        })
        .collect();
    batch_paths.sort();

    for path in &batch_paths {
        let text = read_to_string(path)?;
        let mut batch: FileBatchDto =
            serde_json::from_str(&text).map_err(|e| UploadError::Parse {
                path: path.clone(),
                source: e,
            })?;
        batch.source_id = remapped_id;
        for file in &mut batch.files {
            file.source_id = remapped_id;
        }
        let url = format!("{}/api/files/batch", opts.server_url);
        info!(url = %url, batch = batch.batch_number, files = batch.files.len(), "uploading batch");
        post_json::<_, serde_json::Value>(&client, &url, &batch)?;
    }

    let projects_path = tree_dir.join("code-projects.json");
    if projects_path.is_file() {
        let text = read_to_string(&projects_path)?;
        let mut projects: Vec<CodeProjectDto> =
            serde_json::from_str(&text).map_err(|e| UploadError::Parse {
                path: projects_path.clone(),
                source: e,
            })?;
        for p in &mut projects {
            p.source_id = remapped_id;
        }
        if !projects.is_empty() {
            let url = format!("{}/api/code-projects/bulk", opts.server_url);
            info!(url = %url, projects = projects.len(), "uploading code projects");
            post_json::<_, serde_json::Value>(&client, &url, &projects)?;
        }
    }

    let summary_path = tree_dir.join("summary.json");
    let summary_text = read_to_string(&summary_path)?;
    let summary: SummaryDto =
        serde_json::from_str(&summary_text).map_err(|e| UploadError::Parse {
            path: summary_path,
            source: e,
        })?;

    let complete_url = format!("{}/api/sources/{}/complete", opts.server_url, remapped_id);
    let complete_body = CompleteScanRequest {
        total_files: summary.total_files,
        total_size: summary.total_size,
        success: true,
    };
    info!(url = %complete_url, "marking scan complete");
    let _: serde_json::Value = post_json(&client, &complete_url, &complete_body)?;

    info!(source_id = %remapped_id, "upload finished");
    Ok(())
}

fn read_to_string(path: &Path) -> Result<String, UploadError> {
    std::fs::read_to_string(path).map_err(|e| UploadError::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Transport-error retries only (bounded exponential backoff); a non-2xx
/// response is terminal per §4.7/§7 and is never retried.
const MAX_TRANSPORT_RETRIES: u32 = 3;

fn post_json<B: serde::Serialize, R: serde::de::DeserializeOwned>(
    client: &reqwest::blocking::Client,
    url: &str,
    body: &B,
) -> Result<R, UploadError> {
    let mut attempt = 0;
    loop {
        match client.post(url).json(body).send() {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    let body_text = response.text().unwrap_or_default();
                    warn!(url, %status, "upload request failed");
                    return Err(UploadError::NonSuccess {
                        url: url.to_string(),
                        status,
                        body: body_text,
                    });
                }
                return response.json::<R>().map_err(|e| UploadError::Request {
                    url: url.to_string(),
                    source: e,
                });
            }
            Err(e) if attempt < MAX_TRANSPORT_RETRIES => {
                let backoff = Duration::from_millis(200 * 2u64.pow(attempt));
                warn!(url, attempt, error = %e, "transport error, retrying after backoff");
                std::thread::sleep(backoff);
                attempt += 1;
            }
            Err(e) => {
                return Err(UploadError::Request {
                    url: url.to_string(),
                    source: e,
                })
            }
        }
    }
}
