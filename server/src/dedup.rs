//! Dedup Engine (C10). Runs synchronously at the end of `completeScan`,
//! under the same per-source lock `ingest::complete_scan` already holds.
//!
//! File-level reconciliation only considers hashes the new source just
//! introduced, but marks/unmarks duplicate status across every source
//! sharing that hash — duplication is a catalog-wide concept, not a
//! per-source one.

use std::collections::HashMap;
use std::path::Path;

use archivum_core::model::{
    CodeProject, CodeProjectDuplicateType, DiffComplexity, FileStatus, ScannedFile, Zone,
};
use archivum_core::zone;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;
use crate::store;

pub async fn reconcile_source(pool: &SqlitePool, source_id: Uuid) -> Result<()> {
    reconcile_files(pool, source_id).await?;
    reconcile_code_projects(pool, source_id).await?;
    Ok(())
}

async fn reconcile_files(pool: &SqlitePool, source_id: Uuid) -> Result<()> {
    let introduced = store::list_files_for_source(pool, source_id).await?;
    let mut hashes: Vec<&str> = introduced.iter().map(|f| f.sha256.as_str()).collect();
    hashes.sort_unstable();
    hashes.dedup();

    let mut zone_cache: HashMap<Uuid, HashMap<String, Zone>> = HashMap::new();

    for sha256 in hashes {
        let member_count = store::hash_member_count(pool, sha256).await?;
        if member_count <= 1 {
            continue;
        }

        let members = store::files_with_hash(pool, sha256).await?;

        let mut candidates: Vec<&ScannedFile> = Vec::new();
        for file in &members {
            let zone_map = load_zone_map(pool, &mut zone_cache, file.source_id).await?;
            let folder = parent_path(&file.path);
            let effective_zone = zone::resolve(zone_map, &folder);
            if effective_zone.is_dedup_gated() {
                continue;
            }
            candidates.push(file);
        }

        // Zone gate (§4.10): if fewer than two members are eligible, no
        // DuplicateGroup is created at all for this hash, not merely left
        // unpopulated — gated hashes never surface as file-level dupes.
        if candidates.len() < 2 {
            continue;
        }

        let wasted_size = candidates[0].size * (candidates.len() as u64 - 1);
        let group_id = store::upsert_duplicate_group(pool, sha256, wasted_size).await?;

        // members is already ordered scanned_at ASC, id ASC; candidates preserves that order.
        let kept_id = candidates[0].id;
        store::set_duplicate_group_kept_file(pool, sha256, kept_id).await?;

        let groups = store::list_duplicate_groups(pool).await?;
        let actual_kept = groups
            .iter()
            .find(|g| g.id == group_id)
            .and_then(|g| g.kept_file_id)
            .unwrap_or(kept_id);

        for file in &candidates {
            if file.id == actual_kept {
                store::set_file_duplicate_status(pool, file.id, false, FileStatus::Hashed).await?;
            } else {
                store::set_file_duplicate_status(pool, file.id, true, FileStatus::Duplicate).await?;
            }
        }
    }

    Ok(())
}

async fn load_zone_map<'a>(
    pool: &SqlitePool,
    cache: &'a mut HashMap<Uuid, HashMap<String, Zone>>,
    source_id: Uuid,
) -> Result<&'a HashMap<String, Zone>> {
    if !cache.contains_key(&source_id) {
        let map = store::load_folder_zones(pool, source_id).await?;
        cache.insert(source_id, map);
    }
    Ok(cache.get(&source_id).unwrap())
}

fn parent_path(path: &str) -> String {
    Path::new(path)
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default()
}

async fn reconcile_code_projects(pool: &SqlitePool, source_id: Uuid) -> Result<()> {
    let projects = store::list_code_projects(pool)
        .await?
        .into_iter()
        .filter(|p| p.source_id == source_id)
        .collect::<Vec<_>>();

    for project in &projects {
        classify_against_identifier(pool, project).await?;
        classify_against_name(pool, project).await?;
    }
    Ok(())
}

async fn classify_against_identifier(pool: &SqlitePool, project: &CodeProject) -> Result<()> {
    let others = store::projects_with_identifier(pool, &project.identifier, project.id).await?;
    for other in &others {
        if other.content_hash == project.content_hash {
            store::upsert_code_project_duplicate(
                pool,
                &project.identifier,
                project.id,
                other.id,
                CodeProjectDuplicateType::Exact,
                None,
                None,
            )
            .await?;
        } else {
            let (similarity, complexity) = classify_diff(project, other);
            store::upsert_code_project_duplicate(
                pool,
                &project.identifier,
                project.id,
                other.id,
                CodeProjectDuplicateType::SameProjectDiffContent,
                Some(similarity),
                Some(complexity),
            )
            .await?;
        }
    }
    Ok(())
}

async fn classify_against_name(pool: &SqlitePool, project: &CodeProject) -> Result<()> {
    let others = store::projects_with_name(pool, &project.name, project.id).await?;
    for other in &others {
        if other.version != project.version {
            store::upsert_code_project_duplicate(
                pool,
                &project.identifier,
                project.id,
                other.id,
                CodeProjectDuplicateType::DifferentVersion,
                None,
                None,
            )
            .await?;
        }
    }
    Ok(())
}

/// Jaccard similarity over the two projects' source-file hash sets, bucketed
/// into a coarse diff complexity by file-count delta ratio (§4.10).
fn classify_diff(a: &CodeProject, b: &CodeProject) -> (f64, DiffComplexity) {
    let set_a: std::collections::HashSet<&str> =
        a.source_hashes.iter().map(String::as_str).collect();
    let set_b: std::collections::HashSet<&str> =
        b.source_hashes.iter().map(String::as_str).collect();

    let similarity = if set_a.is_empty() && set_b.is_empty() {
        1.0
    } else {
        let intersection = set_a.intersection(&set_b).count();
        let union = set_a.union(&set_b).count().max(1);
        intersection as f64 / union as f64
    };

    let max_count = a.source_file_count.max(b.source_file_count).max(1);
    let min_count = a.source_file_count.min(b.source_file_count);
    let delta_ratio = 1.0 - (min_count as f64 / max_count as f64);

    (similarity * 100.0, DiffComplexity::from_delta_ratio(delta_ratio))
}
