//! Scanner Orchestrator (C6) — drives the Walker, Hash Engine, Metadata
//! Extractor, and Project Detector Chain; batches output; writes the
//! resumable on-disk output tree (§4.6, §6).

use archivum_core::dto::{CodeProjectDto, FileBatchDto, FileDto, ScanErrorEntry, SourceDto, SummaryDto};
use archivum_core::model::{PhysicalId, Source, SourceStatus, SourceType};
use archivum_core::{ArchivumError, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ScannerConfig;
use crate::hash::HashPool;
use crate::metadata::{self, ExifExtractor, NullExifExtractor};
use crate::physical_id;
use crate::project_scan::scan_projects;
use crate::walk::{self, WalkOptions};

pub const SCANNER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct ScanOutcome {
    pub output_dir: PathBuf,
    pub total_files: u64,
    pub total_size: u64,
    pub errors: Vec<ScanErrorEntry>,
}

/// Run a full scan of `root`, writing the output tree under
/// `output_dir/<sourceId>/` and returning a summary of what happened.
///
/// Step numbering mirrors §4.6: (1) config already loaded by the caller,
/// (2) validate root, (3) build Source + probe physical id, (4) walk,
/// (5-6) hash/extract/batch, (7) flush remainder + summary, (8) optional
/// project detection.
pub fn run_scan(
    root: &Path,
    source_name: &str,
    source_type: SourceType,
    output_dir: &Path,
    config: &ScannerConfig,
    exif_extractor: &dyn ExifExtractor,
) -> Result<ScanOutcome> {
    let start = Utc::now();

    if !root.is_dir() {
        return Err(ArchivumError::InvalidRoot(root.to_path_buf()));
    }

    let source_id = Uuid::new_v4();
    let physical_id: PhysicalId = physical_id::probe(root);
    let mut source = Source {
        id: source_id,
        name: source_name.to_string(),
        source_type,
        root_path: root.to_string_lossy().to_string(),
        parent_source_id: None,
        status: SourceStatus::Scanning,
        total_files: 0,
        total_size: 0,
        processed_files: 0,
        processed_size: 0,
        created_at: start,
        updated_at: start,
        physical_id,
    };

    info!(source_id = %source_id, root = %root.display(), "walking source");
    let walk_result = walk::walk(
        root,
        &WalkOptions {
            skip_system_dirs: config.skip_system_dirs,
            follow_symlinks: config.follow_symlinks,
            exclude_patterns: config.exclude_patterns.clone(),
        },
    );
    source.total_files = walk_result.files.len() as u64;
    source.total_size = walk_result.total_size;

    let source_dir = output_dir.join(source_id.to_string());
    let files_dir = source_dir.join("files");
    std::fs::create_dir_all(&files_dir).map_err(|e| ArchivumError::Io {
        path: files_dir.clone(),
        source: e,
    })?;

    let pool = HashPool::new(config.hash_threads)?;
    let hash_results = pool.hash_all(&walk_result.files);

    let mut seen_hashes: std::collections::HashSet<String> = std::collections::HashSet::new();
    let mut file_hash_map: HashMap<PathBuf, String> = HashMap::new();
    let mut errors: Vec<ScanErrorEntry> = Vec::new();
    let mut batch: Vec<FileDto> = Vec::new();
    let mut batch_number: u32 = 0;
    let mut total_written: u64 = 0;

    for (path, hash_result) in hash_results {
        let sha256 = match hash_result {
            Ok(h) => h,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "hash failed, skipping file");
                errors.push(ScanErrorEntry {
                    file: path.to_string_lossy().to_string(),
                    error: e.to_string(),
                });
                continue;
            }
        };
        file_hash_map.insert(path.clone(), sha256.clone());

        let mut record = match metadata::extract(
            &path,
            source_id,
            sha256.clone(),
            exif_extractor,
            config.extract_exif,
        ) {
            Ok(r) => r,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "metadata extraction failed, skipping file");
                errors.push(ScanErrorEntry {
                    file: path.to_string_lossy().to_string(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        // Intra-scan duplicate hint only; authoritative dedup happens server-side (§4.6 step 5).
        record.is_duplicate = !seen_hashes.insert(sha256);

        batch.push(FileDto::from(record));
        total_written += 1;

        if batch.len() >= config.batch_size {
            batch_number += 1;
            flush_batch(&files_dir, source_id, batch_number, &batch)?;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        batch_number += 1;
        flush_batch(&files_dir, source_id, batch_number, &batch)?;
    }

    info!(source_id = %source_id, files = total_written, batches = batch_number, "scan walk complete");

    let projects = scan_projects(root, source_id, &file_hash_map);
    if !projects.is_empty() {
        let dtos: Vec<CodeProjectDto> = projects.into_iter().map(CodeProjectDto::from).collect();
        let text = serde_json::to_string_pretty(&dtos)
            .map_err(|e| ArchivumError::Config(e.to_string()))?;
        std::fs::write(source_dir.join("code-projects.json"), text).map_err(|e| {
            ArchivumError::Io {
                path: source_dir.join("code-projects.json"),
                source: e,
            }
        })?;
    }

    source.processed_files = total_written;
    source.processed_size = walk_result.total_size;
    source.status = SourceStatus::Completed;
    source.updated_at = Utc::now();

    let source_dto = SourceDto::from(source);
    let source_text =
        serde_json::to_string_pretty(&source_dto).map_err(|e| ArchivumError::Config(e.to_string()))?;
    std::fs::write(source_dir.join("source.json"), source_text).map_err(|e| ArchivumError::Io {
        path: source_dir.join("source.json"),
        source: e,
    })?;

    let end = Utc::now();
    let summary = SummaryDto {
        source_id,
        total_files: source_dto.total_files,
        total_size: source_dto.total_size,
        total_batches: batch_number,
        skipped_files: errors.len() as u64,
        errors: errors.clone(),
        duration_ms: (end - start).num_milliseconds().max(0) as u64,
        start_time: start,
        end_time: end,
        scanner_version: SCANNER_VERSION.to_string(),
        scanner_host: hostname(),
        scanner_user: username(),
    };
    let summary_text =
        serde_json::to_string_pretty(&summary).map_err(|e| ArchivumError::Config(e.to_string()))?;
    std::fs::write(source_dir.join("summary.json"), summary_text).map_err(|e| ArchivumError::Io {
        path: source_dir.join("summary.json"),
        source: e,
    })?;

    Ok(ScanOutcome {
        output_dir: source_dir,
        total_files: source_dto.total_files,
        total_size: source_dto.total_size,
        errors,
    })
}

fn flush_batch(
    files_dir: &Path,
    source_id: Uuid,
    batch_number: u32,
    files: &[FileDto],
) -> Result<()> {
    let dto = FileBatchDto {
        source_id,
        batch_number,
        files: files.to_vec(),
    };
    let path = files_dir.join(format!("batch-{batch_number:04}.json"));
    let text = serde_json::to_string_pretty(&dto).map_err(|e| ArchivumError::Config(e.to_string()))?;
    std::fs::write(&path, text).map_err(|e| ArchivumError::Io {
        path: path.clone(),
        source: e,
    })
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "unknown-host".to_string())
}

fn username() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown-user".to_string())
}

/// Convenience used when the caller has no real EXIF decoder wired in yet.
pub fn default_exif_extractor() -> NullExifExtractor {
    NullExifExtractor
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn small_tree_produces_expected_batch_and_summary() {
        let src = tempfile::tempdir().unwrap();
        fs::write(src.path().join("a.txt"), vec![b'x'; 100]).unwrap();
        fs::create_dir(src.path().join("b")).unwrap();
        fs::write(src.path().join("b/c.txt"), vec![b'y'; 200]).unwrap();

        let out = tempfile::tempdir().unwrap();
        let cfg = ScannerConfig {
            batch_size: 10,
            ..ScannerConfig::default()
        };
        let outcome = run_scan(
            src.path(),
            "small-tree",
            SourceType::Disk,
            out.path(),
            &cfg,
            &NullExifExtractor,
        )
        .unwrap();

        assert_eq!(outcome.total_files, 2);
        assert_eq!(outcome.total_size, 300);
        assert!(outcome.errors.is_empty());

        let batch_path = outcome.output_dir.join("files/batch-0001.json");
        assert!(batch_path.is_file());
        let batch_text = fs::read_to_string(&batch_path).unwrap();
        let batch: archivum_core::dto::FileBatchDto = serde_json::from_str(&batch_text).unwrap();
        assert_eq!(batch.files.len(), 2);
    }

    #[test]
    fn batch_numbering_is_contiguous_for_multiple_batches() {
        let src = tempfile::tempdir().unwrap();
        for i in 0..25 {
            fs::write(src.path().join(format!("f{i}.txt")), format!("contents-{i}")).unwrap();
        }
        let out = tempfile::tempdir().unwrap();
        let cfg = ScannerConfig {
            batch_size: 10,
            ..ScannerConfig::default()
        };
        let outcome = run_scan(
            src.path(),
            "batched",
            SourceType::Disk,
            out.path(),
            &cfg,
            &NullExifExtractor,
        )
        .unwrap();

        assert_eq!(outcome.total_files, 25);
        for n in 1..=3 {
            let p = outcome.output_dir.join(format!("files/batch-{n:04}.json"));
            assert!(p.is_file(), "missing {p:?}");
        }
        assert!(!outcome.output_dir.join("files/batch-0004.json").exists());
    }

    #[test]
    fn invalid_root_is_fatal() {
        let out = tempfile::tempdir().unwrap();
        let cfg = ScannerConfig::default();
        let result = run_scan(
            Path::new("/definitely/not/a/real/path/archivum"),
            "bad",
            SourceType::Disk,
            out.path(),
            &cfg,
            &NullExifExtractor,
        );
        assert!(matches!(result, Err(ArchivumError::InvalidRoot(_))));
    }
}
