//! Ingest Service (C9) — turns batches uploaded by the Uploader into
//! catalog rows. Per-source locking (a `dashmap`-backed map of
//! `Uuid -> Arc<Mutex<()>>`) serializes `ingest_batch`/`complete_scan`
//! against each other and against dedup reconciliation for the same
//! source, so two concurrent uploads for one source can't interleave
//! their hash-count bookkeeping.

use std::sync::Arc;

use archivum_core::model::{CodeProject, ScannedFile, Source, SourceStatus};
use dashmap::DashMap;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::dedup;
use crate::error::{IngestError, Result};
use crate::store;

#[derive(Clone)]
pub struct SourceLocks {
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl SourceLocks {
    pub fn new() -> Self {
        SourceLocks {
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn get(&self, source_id: Uuid) -> Arc<Mutex<()>> {
        self.locks
            .entry(source_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

impl Default for SourceLocks {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn create_source(pool: &SqlitePool, mut source: Source) -> Result<Source> {
    source.status = SourceStatus::Scanning;
    store::create_source(pool, &source).await
}

/// Ingest one batch of scanned files. The source must currently be
/// SCANNING (§4.9); anything else is `InvalidState`. Each file's
/// `file_hashes` row is found-or-created before the file row itself is
/// upserted, so a half-written batch never leaves an orphaned reference.
pub async fn ingest_batch(
    pool: &SqlitePool,
    locks: &SourceLocks,
    source_id: Uuid,
    files: Vec<ScannedFile>,
) -> Result<()> {
    let lock = locks.get(source_id);
    let _guard = lock.lock().await;

    let source = store::find_source(pool, source_id)
        .await?
        .ok_or_else(|| IngestError::NotFound(format!("source {source_id}")))?;
    if !matches!(source.status, SourceStatus::Scanning) {
        return Err(IngestError::InvalidState(format!(
            "source {source_id} is not SCANNING"
        )));
    }

    for file in &files {
        store::touch_file_hash(pool, &file.sha256, file.size, 1).await?;
        store::upsert_scanned_file(pool, file).await?;
    }

    Ok(())
}

pub async fn ingest_code_projects(
    pool: &SqlitePool,
    locks: &SourceLocks,
    source_id: Uuid,
    projects: Vec<CodeProject>,
) -> Result<()> {
    if projects.is_empty() {
        return Ok(());
    }
    let lock = locks.get(source_id);
    let _guard = lock.lock().await;

    for project in &projects {
        store::upsert_code_project(pool, project).await?;
    }
    Ok(())
}

/// Transition SCANNING -> COMPLETED/FAILED and, on success, run the Dedup
/// Engine's file- and project-level reconciliation for this source
/// (§4.9 "completeScan ... triggers dedup reconciliation").
pub async fn complete_scan(
    pool: &SqlitePool,
    locks: &SourceLocks,
    source_id: Uuid,
    total_files: u64,
    total_size: u64,
    success: bool,
) -> Result<()> {
    let lock = locks.get(source_id);
    let _guard = lock.lock().await;

    store::complete_scan(pool, source_id, total_files, total_size, success).await?;

    if success {
        dedup::reconcile_source(pool, source_id).await?;
    }
    Ok(())
}
