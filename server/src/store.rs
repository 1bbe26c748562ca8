//! Catalog Store (C8) — repository functions over a SQLite pool.
//!
//! Every public function here is an explicit, named query — no ORM, no
//! lazy relationship loading. Aggregate reads (the folder tree) page
//! through `scanned_files` rather than materializing the whole table.

use archivum_core::model::{
    CodeProject, CodeProjectDuplicateGroup, CodeProjectDuplicateMember, CodeProjectDuplicateType,
    DiffComplexity, DuplicateGroup, DuplicateGroupStatus, ExifRecord, FileStatus, PhysicalId,
    ProjectType, ScannedFile, Source, SourceStatus, SourceType, Zone,
};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::{IngestError, Result};

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await.map_err(|e| {
        IngestError::Store(sqlx::Error::Migrate(Box::new(e)))
    })
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

pub async fn find_source(pool: &SqlitePool, id: Uuid) -> Result<Option<Source>> {
    let row = sqlx::query(
        "SELECT id, name, type, root_path, parent_source_id, status, total_files, total_size, \
         processed_files, processed_size, created_at, updated_at, mount_point, filesystem, \
         capacity_bytes, used_bytes, volume_label, disk_uuid, partition_uuid, serial_number, \
         physical_label, physical_notes FROM sources WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| row_to_source(&r)))
}

pub async fn list_sources(pool: &SqlitePool) -> Result<Vec<Source>> {
    let rows = sqlx::query(
        "SELECT id, name, type, root_path, parent_source_id, status, total_files, total_size, \
         processed_files, processed_size, created_at, updated_at, mount_point, filesystem, \
         capacity_bytes, used_bytes, volume_label, disk_uuid, partition_uuid, serial_number, \
         physical_label, physical_notes FROM sources ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(row_to_source).collect())
}

fn row_to_source(row: &sqlx::sqlite::SqliteRow) -> Source {
    Source {
        id: Uuid::parse_str(row.get::<String, _>("id").as_str()).unwrap_or_default(),
        name: row.get("name"),
        source_type: parse_source_type(&row.get::<String, _>("type")),
        root_path: row.get("root_path"),
        parent_source_id: row
            .get::<Option<String>, _>("parent_source_id")
            .and_then(|s| Uuid::parse_str(&s).ok()),
        status: parse_source_status(&row.get::<String, _>("status")),
        total_files: row.get::<i64, _>("total_files") as u64,
        total_size: row.get::<i64, _>("total_size") as u64,
        processed_files: row.get::<i64, _>("processed_files") as u64,
        processed_size: row.get::<i64, _>("processed_size") as u64,
        created_at: parse_ts(&row.get::<String, _>("created_at")),
        updated_at: parse_ts(&row.get::<String, _>("updated_at")),
        physical_id: PhysicalId {
            mount_point: row.get("mount_point"),
            filesystem: row.get("filesystem"),
            capacity_bytes: row.get::<Option<i64>, _>("capacity_bytes").map(|v| v as u64),
            used_bytes: row.get::<Option<i64>, _>("used_bytes").map(|v| v as u64),
            volume_label: row.get("volume_label"),
            disk_uuid: row.get("disk_uuid"),
            partition_uuid: row.get("partition_uuid"),
            serial_number: row.get("serial_number"),
            physical_label: row.get("physical_label"),
            notes: row.get("physical_notes"),
        },
    }
}

/// Insert a new source, or return the existing row unchanged if one with
/// the same id and matching attributes already exists (§4.9 createSource
/// idempotence). Differing attributes on an existing id is a `Conflict`.
pub async fn create_source(pool: &SqlitePool, source: &Source) -> Result<Source> {
    if let Some(existing) = find_source(pool, source.id).await? {
        return if sources_match(&existing, source) {
            Ok(existing)
        } else {
            Err(IngestError::Conflict(format!(
                "source {} already exists with different attributes",
                source.id
            )))
        };
    }

    sqlx::query(
        "INSERT INTO sources (id, name, type, root_path, parent_source_id, status, total_files, \
         total_size, processed_files, processed_size, created_at, updated_at, mount_point, \
         filesystem, capacity_bytes, used_bytes, volume_label, disk_uuid, partition_uuid, \
         serial_number, physical_label, physical_notes) \
         VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)",
    )
    .bind(source.id.to_string())
    .bind(&source.name)
    .bind(source.source_type.as_wire())
    .bind(&source.root_path)
    .bind(source.parent_source_id.map(|id| id.to_string()))
    .bind(source.status.as_wire())
    .bind(source.total_files as i64)
    .bind(source.total_size as i64)
    .bind(source.processed_files as i64)
    .bind(source.processed_size as i64)
    .bind(source.created_at.to_rfc3339())
    .bind(source.updated_at.to_rfc3339())
    .bind(&source.physical_id.mount_point)
    .bind(&source.physical_id.filesystem)
    .bind(source.physical_id.capacity_bytes.map(|v| v as i64))
    .bind(source.physical_id.used_bytes.map(|v| v as i64))
    .bind(&source.physical_id.volume_label)
    .bind(&source.physical_id.disk_uuid)
    .bind(&source.physical_id.partition_uuid)
    .bind(&source.physical_id.serial_number)
    .bind(&source.physical_id.physical_label)
    .bind(&source.physical_id.notes)
    .execute(pool)
    .await?;

    Ok(source.clone())
}

fn sources_match(a: &Source, b: &Source) -> bool {
    a.name == b.name
        && a.source_type as u8 as usize == b.source_type as u8 as usize
        && a.root_path == b.root_path
}

pub async fn complete_scan(
    pool: &SqlitePool,
    source_id: Uuid,
    total_files: u64,
    total_size: u64,
    success: bool,
) -> Result<()> {
    let status = if success {
        SourceStatus::Completed
    } else {
        SourceStatus::Failed
    };
    let result = sqlx::query(
        "UPDATE sources SET status = ?, total_files = ?, total_size = ?, updated_at = ? \
         WHERE id = ? AND status = 'SCANNING'",
    )
    .bind(status.as_wire())
    .bind(total_files as i64)
    .bind(total_size as i64)
    .bind(Utc::now().to_rfc3339())
    .bind(source_id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(IngestError::InvalidState(format!(
            "source {source_id} is not in SCANNING status"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Files / hashes
// ---------------------------------------------------------------------------

/// Find-or-create the `file_hashes` row for `sha256`, bumping its member
/// count. Callers serialize this per-hash at the ingest layer.
pub async fn touch_file_hash(
    pool: &SqlitePool,
    sha256: &str,
    size: u64,
    delta_members: i64,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO file_hashes (sha256, size, first_seen_at, member_count) VALUES (?,?,?,?) \
         ON CONFLICT(sha256) DO UPDATE SET member_count = member_count + excluded.member_count",
    )
    .bind(sha256)
    .bind(size as i64)
    .bind(Utc::now().to_rfc3339())
    .bind(delta_members)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn hash_member_count(pool: &SqlitePool, sha256: &str) -> Result<i64> {
    let row = sqlx::query("SELECT member_count FROM file_hashes WHERE sha256 = ?")
        .bind(sha256)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.get::<i64, _>("member_count")).unwrap_or(0))
}

/// Upsert one `ScannedFile` by `(source_id, path)`. Does not itself touch
/// `file_hashes` or duplicate bookkeeping — the ingest layer drives that
/// explicitly so it can batch it under one transaction per call.
pub async fn upsert_scanned_file(pool: &SqlitePool, file: &ScannedFile) -> Result<()> {
    let exif_json = file
        .exif
        .as_ref()
        .map(|e| serde_json::to_string(e).unwrap_or_default());

    sqlx::query(
        "INSERT INTO scanned_files (id, source_id, path, name, extension, size, sha256, \
         mime_type, created_at, modified_at, accessed_at, scanned_at, exif_json, status, is_duplicate) \
         VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?) \
         ON CONFLICT(source_id, path) DO UPDATE SET \
            name=excluded.name, extension=excluded.extension, size=excluded.size, \
            sha256=excluded.sha256, mime_type=excluded.mime_type, created_at=excluded.created_at, \
            modified_at=excluded.modified_at, accessed_at=excluded.accessed_at, \
            scanned_at=excluded.scanned_at, exif_json=excluded.exif_json, status=excluded.status, \
            is_duplicate=excluded.is_duplicate",
    )
    .bind(file.id.to_string())
    .bind(file.source_id.to_string())
    .bind(&file.path)
    .bind(&file.name)
    .bind(&file.extension)
    .bind(file.size as i64)
    .bind(&file.sha256)
    .bind(&file.mime_type)
    .bind(file.created_at.to_rfc3339())
    .bind(file.modified_at.to_rfc3339())
    .bind(file.accessed_at.to_rfc3339())
    .bind(file.scanned_at.to_rfc3339())
    .bind(exif_json)
    .bind(file.status.as_wire())
    .bind(file.is_duplicate as i64)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_files_for_source(pool: &SqlitePool, source_id: Uuid) -> Result<Vec<ScannedFile>> {
    let rows = sqlx::query(
        "SELECT id, source_id, path, name, extension, size, sha256, mime_type, created_at, \
         modified_at, accessed_at, scanned_at, exif_json, status, is_duplicate \
         FROM scanned_files WHERE source_id = ? ORDER BY path",
    )
    .bind(source_id.to_string())
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(row_to_scanned_file).collect())
}

/// Page through every file for a source, `page_size` rows at a time,
/// ordered by path so the Folder Tree Service can fold them in one pass.
pub async fn page_files_for_source(
    pool: &SqlitePool,
    source_id: Uuid,
    page: u32,
    page_size: u32,
) -> Result<Vec<ScannedFile>> {
    let rows = sqlx::query(
        "SELECT id, source_id, path, name, extension, size, sha256, mime_type, created_at, \
         modified_at, accessed_at, scanned_at, exif_json, status, is_duplicate \
         FROM scanned_files WHERE source_id = ? ORDER BY path LIMIT ? OFFSET ?",
    )
    .bind(source_id.to_string())
    .bind(page_size as i64)
    .bind((page * page_size) as i64)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(row_to_scanned_file).collect())
}

pub async fn files_with_hash(pool: &SqlitePool, sha256: &str) -> Result<Vec<ScannedFile>> {
    let rows = sqlx::query(
        "SELECT id, source_id, path, name, extension, size, sha256, mime_type, created_at, \
         modified_at, accessed_at, scanned_at, exif_json, status, is_duplicate \
         FROM scanned_files WHERE sha256 = ? ORDER BY scanned_at, id",
    )
    .bind(sha256)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(row_to_scanned_file).collect())
}

pub async fn set_file_duplicate_status(
    pool: &SqlitePool,
    file_id: Uuid,
    is_duplicate: bool,
    status: FileStatus,
) -> Result<()> {
    sqlx::query("UPDATE scanned_files SET is_duplicate = ?, status = ? WHERE id = ?")
        .bind(is_duplicate as i64)
        .bind(status.as_wire())
        .bind(file_id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn patch_file_status(
    pool: &SqlitePool,
    file_id: Uuid,
    status: Option<FileStatus>,
) -> Result<()> {
    if let Some(status) = status {
        let result = sqlx::query("UPDATE scanned_files SET status = ? WHERE id = ?")
            .bind(status.as_wire())
            .bind(file_id.to_string())
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(IngestError::NotFound(format!("file {file_id}")));
        }
    }
    Ok(())
}

fn row_to_scanned_file(row: &sqlx::sqlite::SqliteRow) -> ScannedFile {
    let exif: Option<ExifRecord> = row
        .get::<Option<String>, _>("exif_json")
        .and_then(|s| serde_json::from_str(&s).ok());
    ScannedFile {
        id: Uuid::parse_str(&row.get::<String, _>("id")).unwrap_or_default(),
        source_id: Uuid::parse_str(&row.get::<String, _>("source_id")).unwrap_or_default(),
        path: row.get("path"),
        name: row.get("name"),
        extension: row.get("extension"),
        size: row.get::<i64, _>("size") as u64,
        sha256: row.get("sha256"),
        mime_type: row.get("mime_type"),
        created_at: parse_ts(&row.get::<String, _>("created_at")),
        modified_at: parse_ts(&row.get::<String, _>("modified_at")),
        accessed_at: parse_ts(&row.get::<String, _>("accessed_at")),
        scanned_at: parse_ts(&row.get::<String, _>("scanned_at")),
        exif,
        status: parse_file_status(&row.get::<String, _>("status")),
        is_duplicate: row.get::<i64, _>("is_duplicate") != 0,
    }
}

// ---------------------------------------------------------------------------
// Duplicate groups (file-level)
// ---------------------------------------------------------------------------

pub async fn upsert_duplicate_group(
    pool: &SqlitePool,
    sha256: &str,
    wasted_size: u64,
) -> Result<Uuid> {
    if let Some(row) = sqlx::query("SELECT id FROM duplicate_groups WHERE sha256 = ?")
        .bind(sha256)
        .fetch_optional(pool)
        .await?
    {
        let id = Uuid::parse_str(&row.get::<String, _>("id")).unwrap_or_default();
        sqlx::query("UPDATE duplicate_groups SET wasted_size = ? WHERE id = ?")
            .bind(wasted_size as i64)
            .bind(id.to_string())
            .execute(pool)
            .await?;
        return Ok(id);
    }
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO duplicate_groups (id, sha256, status, kept_file_id, wasted_size) \
         VALUES (?,?,?,?,?)",
    )
    .bind(id.to_string())
    .bind(sha256)
    .bind(DuplicateGroupStatus::Pending.as_wire())
    .bind(Option::<String>::None)
    .bind(wasted_size as i64)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn set_duplicate_group_kept_file(
    pool: &SqlitePool,
    sha256: &str,
    kept_file_id: Uuid,
) -> Result<()> {
    sqlx::query(
        "UPDATE duplicate_groups SET kept_file_id = COALESCE(kept_file_id, ?) WHERE sha256 = ?",
    )
    .bind(kept_file_id.to_string())
    .bind(sha256)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_duplicate_groups(pool: &SqlitePool) -> Result<Vec<DuplicateGroup>> {
    let rows = sqlx::query("SELECT id, sha256, status, kept_file_id, wasted_size FROM duplicate_groups")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .iter()
        .map(|row| DuplicateGroup {
            id: Uuid::parse_str(&row.get::<String, _>("id")).unwrap_or_default(),
            sha256: row.get("sha256"),
            status: parse_dup_status(&row.get::<String, _>("status")),
            kept_file_id: row
                .get::<Option<String>, _>("kept_file_id")
                .and_then(|s| Uuid::parse_str(&s).ok()),
            wasted_size: row.get::<i64, _>("wasted_size") as u64,
        })
        .collect())
}

pub async fn resolve_duplicate_group(
    pool: &SqlitePool,
    group_id: Uuid,
    kept_file_id: Uuid,
    status: DuplicateGroupStatus,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE duplicate_groups SET kept_file_id = ?, status = ? WHERE id = ?",
    )
    .bind(kept_file_id.to_string())
    .bind(status.as_wire())
    .bind(group_id.to_string())
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(IngestError::NotFound(format!("duplicate group {group_id}")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Folder zones
// ---------------------------------------------------------------------------

pub async fn load_folder_zones(
    pool: &SqlitePool,
    source_id: Uuid,
) -> Result<std::collections::HashMap<String, Zone>> {
    let rows = sqlx::query("SELECT folder_path, zone FROM folder_zones WHERE source_id = ?")
        .bind(source_id.to_string())
        .fetch_all(pool)
        .await?;
    Ok(rows
        .iter()
        .filter_map(|r| {
            let zone = Zone::parse(&r.get::<String, _>("zone"))?;
            Some((r.get::<String, _>("folder_path"), zone))
        })
        .collect())
}

pub async fn set_folder_zone(
    pool: &SqlitePool,
    source_id: Uuid,
    folder_path: &str,
    zone: Zone,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO folder_zones (source_id, folder_path, zone) VALUES (?,?,?) \
         ON CONFLICT(source_id, folder_path) DO UPDATE SET zone = excluded.zone",
    )
    .bind(source_id.to_string())
    .bind(folder_path)
    .bind(zone.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Code projects
// ---------------------------------------------------------------------------

pub async fn upsert_code_project(pool: &SqlitePool, project: &CodeProject) -> Result<()> {
    let source_hashes_json =
        serde_json::to_string(&project.source_hashes).unwrap_or_else(|_| "[]".to_string());

    sqlx::query(
        "INSERT INTO code_projects (id, source_id, root_path, project_type, name, version, \
         group_id, git_remote, git_branch, git_commit, identifier, content_hash, \
         source_file_count, total_file_count, total_size_bytes, scanned_at, source_hashes_json) \
         VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?) \
         ON CONFLICT(source_id, root_path) DO UPDATE SET \
            project_type=excluded.project_type, name=excluded.name, version=excluded.version, \
            group_id=excluded.group_id, git_remote=excluded.git_remote, \
            git_branch=excluded.git_branch, git_commit=excluded.git_commit, \
            identifier=excluded.identifier, content_hash=excluded.content_hash, \
            source_file_count=excluded.source_file_count, \
            total_file_count=excluded.total_file_count, \
            total_size_bytes=excluded.total_size_bytes, scanned_at=excluded.scanned_at, \
            source_hashes_json=excluded.source_hashes_json",
    )
    .bind(project.id.to_string())
    .bind(project.source_id.to_string())
    .bind(&project.root_path)
    .bind(project.project_type.as_wire())
    .bind(&project.name)
    .bind(&project.version)
    .bind(&project.group_id)
    .bind(&project.git_remote)
    .bind(&project.git_branch)
    .bind(&project.git_commit)
    .bind(&project.identifier)
    .bind(&project.content_hash)
    .bind(project.source_file_count as i64)
    .bind(project.total_file_count as i64)
    .bind(project.total_size_bytes as i64)
    .bind(project.scanned_at.to_rfc3339())
    .bind(source_hashes_json)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_code_projects(pool: &SqlitePool) -> Result<Vec<CodeProject>> {
    let rows = sqlx::query(
        "SELECT id, source_id, root_path, project_type, name, version, group_id, git_remote, \
         git_branch, git_commit, identifier, content_hash, source_file_count, total_file_count, \
         total_size_bytes, scanned_at, source_hashes_json FROM code_projects",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(row_to_code_project).collect())
}

pub async fn projects_with_identifier(
    pool: &SqlitePool,
    identifier: &str,
    exclude_id: Uuid,
) -> Result<Vec<CodeProject>> {
    let rows = sqlx::query(
        "SELECT id, source_id, root_path, project_type, name, version, group_id, git_remote, \
         git_branch, git_commit, identifier, content_hash, source_file_count, total_file_count, \
         total_size_bytes, scanned_at, source_hashes_json FROM code_projects \
         WHERE identifier = ? AND id != ?",
    )
    .bind(identifier)
    .bind(exclude_id.to_string())
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(row_to_code_project).collect())
}

pub async fn projects_with_name(
    pool: &SqlitePool,
    name: &str,
    exclude_id: Uuid,
) -> Result<Vec<CodeProject>> {
    let rows = sqlx::query(
        "SELECT id, source_id, root_path, project_type, name, version, group_id, git_remote, \
         git_branch, git_commit, identifier, content_hash, source_file_count, total_file_count, \
         total_size_bytes, scanned_at, source_hashes_json FROM code_projects \
         WHERE name = ? AND id != ?",
    )
    .bind(name)
    .bind(exclude_id.to_string())
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(row_to_code_project).collect())
}

fn row_to_code_project(row: &sqlx::sqlite::SqliteRow) -> CodeProject {
    let source_hashes: Vec<String> = row
        .get::<Option<String>, _>("source_hashes_json")
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default();

    CodeProject {
        id: Uuid::parse_str(&row.get::<String, _>("id")).unwrap_or_default(),
        source_id: Uuid::parse_str(&row.get::<String, _>("source_id")).unwrap_or_default(),
        root_path: row.get("root_path"),
        project_type: parse_project_type(&row.get::<String, _>("project_type")),
        name: row.get("name"),
        version: row.get("version"),
        group_id: row.get("group_id"),
        git_remote: row.get("git_remote"),
        git_branch: row.get("git_branch"),
        git_commit: row.get("git_commit"),
        identifier: row.get("identifier"),
        content_hash: row.get("content_hash"),
        source_file_count: row.get::<i64, _>("source_file_count") as u64,
        total_file_count: row.get::<i64, _>("total_file_count") as u64,
        total_size_bytes: row.get::<i64, _>("total_size_bytes") as u64,
        scanned_at: parse_ts(&row.get::<String, _>("scanned_at")),
        source_hashes,
    }
}

pub async fn upsert_code_project_duplicate(
    pool: &SqlitePool,
    identifier: &str,
    project_a: Uuid,
    project_b: Uuid,
    duplicate_type: CodeProjectDuplicateType,
    similarity_percent: Option<f64>,
    diff_complexity: Option<DiffComplexity>,
) -> Result<()> {
    let group_id = if let Some(row) = sqlx::query(
        "SELECT cpdg.id AS id FROM code_project_duplicate_groups cpdg \
         JOIN code_project_duplicate_members m ON m.group_id = cpdg.id \
         WHERE cpdg.identifier = ? AND m.project_id IN (?, ?) LIMIT 1",
    )
    .bind(identifier)
    .bind(project_a.to_string())
    .bind(project_b.to_string())
    .fetch_optional(pool)
    .await?
    {
        Uuid::parse_str(&row.get::<String, _>("id")).unwrap_or_default()
    } else {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO code_project_duplicate_groups (id, identifier, status) VALUES (?,?,?)",
        )
        .bind(id.to_string())
        .bind(identifier)
        .bind(DuplicateGroupStatus::Pending.as_wire())
        .execute(pool)
        .await?;
        id
    };

    // Primacy is fixed at the moment a project first joins a group: whichever
    // project is inserted while the group has no primary member yet becomes
    // it, and every later arrival — regardless of which side of the pair it
    // arrives as — is non-primary. `ON CONFLICT` never touches `is_primary`,
    // so this only matters for the branch below that actually inserts a row.
    let has_primary: bool = sqlx::query(
        "SELECT 1 AS one FROM code_project_duplicate_members WHERE group_id = ? AND is_primary = 1 LIMIT 1",
    )
    .bind(group_id.to_string())
    .fetch_optional(pool)
    .await?
    .is_some();

    let mut assigned_primary = has_primary;
    for member in [project_a, project_b] {
        let is_primary = !assigned_primary;
        assigned_primary = assigned_primary || is_primary;

        sqlx::query(
            "INSERT INTO code_project_duplicate_members \
             (group_id, project_id, duplicate_type, similarity_percent, diff_complexity, is_primary) \
             VALUES (?,?,?,?,?,?) \
             ON CONFLICT(group_id, project_id) DO UPDATE SET \
                duplicate_type=excluded.duplicate_type, \
                similarity_percent=excluded.similarity_percent, \
                diff_complexity=excluded.diff_complexity",
        )
        .bind(group_id.to_string())
        .bind(member.to_string())
        .bind(duplicate_type.as_wire())
        .bind(similarity_percent)
        .bind(diff_complexity.map(|d| d.as_wire()))
        .bind(is_primary as i64)
        .execute(pool)
        .await?;
    }
    Ok(())
}

pub async fn list_code_project_duplicate_groups(
    pool: &SqlitePool,
) -> Result<Vec<(CodeProjectDuplicateGroup, Vec<CodeProjectDuplicateMember>)>> {
    let groups = sqlx::query("SELECT id, identifier, status FROM code_project_duplicate_groups")
        .fetch_all(pool)
        .await?;
    let mut out = Vec::new();
    for g in groups {
        let id = Uuid::parse_str(&g.get::<String, _>("id")).unwrap_or_default();
        let members_rows = sqlx::query(
            "SELECT group_id, project_id, duplicate_type, similarity_percent, diff_complexity, is_primary \
             FROM code_project_duplicate_members WHERE group_id = ?",
        )
        .bind(id.to_string())
        .fetch_all(pool)
        .await?;
        let members = members_rows
            .iter()
            .map(|m| CodeProjectDuplicateMember {
                group_id: id,
                project_id: Uuid::parse_str(&m.get::<String, _>("project_id")).unwrap_or_default(),
                duplicate_type: parse_cp_dup_type(&m.get::<String, _>("duplicate_type")),
                similarity_percent: m.get("similarity_percent"),
                diff_complexity: m
                    .get::<Option<String>, _>("diff_complexity")
                    .as_deref()
                    .map(parse_diff_complexity),
                is_primary: m.get::<i64, _>("is_primary") != 0,
            })
            .collect();
        out.push((
            CodeProjectDuplicateGroup {
                id,
                identifier: g.get("identifier"),
                status: parse_dup_status(&g.get::<String, _>("status")),
            },
            members,
        ));
    }
    Ok(out)
}

pub async fn resolve_code_project_duplicate_group(
    pool: &SqlitePool,
    group_id: Uuid,
    status: DuplicateGroupStatus,
) -> Result<()> {
    let result = sqlx::query("UPDATE code_project_duplicate_groups SET status = ? WHERE id = ?")
        .bind(status.as_wire())
        .bind(group_id.to_string())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(IngestError::NotFound(format!(
            "code project duplicate group {group_id}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Wire-string <-> enum helpers
// ---------------------------------------------------------------------------

trait AsWire {
    fn as_wire(&self) -> &'static str;
}

impl AsWire for SourceType {
    fn as_wire(&self) -> &'static str {
        match self {
            SourceType::Disk => "DISK",
            SourceType::Partition => "PARTITION",
            SourceType::Cloud => "CLOUD",
            SourceType::Network => "NETWORK",
            SourceType::Archive => "ARCHIVE",
        }
    }
}

impl AsWire for SourceStatus {
    fn as_wire(&self) -> &'static str {
        match self {
            SourceStatus::Pending => "PENDING",
            SourceStatus::Scanning => "SCANNING",
            SourceStatus::Completed => "COMPLETED",
            SourceStatus::Failed => "FAILED",
            SourceStatus::Postponed => "POSTPONED",
        }
    }
}

impl AsWire for FileStatus {
    fn as_wire(&self) -> &'static str {
        match self {
            FileStatus::Discovered => "DISCOVERED",
            FileStatus::Hashed => "HASHED",
            FileStatus::Analyzed => "ANALYZED",
            FileStatus::Classified => "CLASSIFIED",
            FileStatus::Staged => "STAGED",
            FileStatus::Migrated => "MIGRATED",
            FileStatus::Duplicate => "DUPLICATE",
            FileStatus::Skipped => "SKIPPED",
            FileStatus::Failed => "FAILED",
        }
    }
}

impl AsWire for DuplicateGroupStatus {
    fn as_wire(&self) -> &'static str {
        match self {
            DuplicateGroupStatus::Pending => "PENDING",
            DuplicateGroupStatus::Reviewed => "REVIEWED",
            DuplicateGroupStatus::Resolved => "RESOLVED",
            DuplicateGroupStatus::Ignored => "IGNORED",
        }
    }
}

impl AsWire for ProjectType {
    fn as_wire(&self) -> &'static str {
        match self {
            ProjectType::Maven => "MAVEN",
            ProjectType::Gradle => "GRADLE",
            ProjectType::Npm => "NPM",
            ProjectType::Go => "GO",
            ProjectType::Python => "PYTHON",
            ProjectType::Rust => "RUST",
            ProjectType::Generic => "GENERIC",
        }
    }
}

impl AsWire for CodeProjectDuplicateType {
    fn as_wire(&self) -> &'static str {
        match self {
            CodeProjectDuplicateType::Exact => "EXACT",
            CodeProjectDuplicateType::SameProjectDiffContent => "SAME_PROJECT_DIFF_CONTENT",
            CodeProjectDuplicateType::DifferentVersion => "DIFFERENT_VERSION",
        }
    }
}

impl AsWire for DiffComplexity {
    fn as_wire(&self) -> &'static str {
        match self {
            DiffComplexity::Trivial => "TRIVIAL",
            DiffComplexity::Simple => "SIMPLE",
            DiffComplexity::Medium => "MEDIUM",
            DiffComplexity::Complex => "COMPLEX",
        }
    }
}

fn parse_source_type(s: &str) -> SourceType {
    match s {
        "PARTITION" => SourceType::Partition,
        "CLOUD" => SourceType::Cloud,
        "NETWORK" => SourceType::Network,
        "ARCHIVE" => SourceType::Archive,
        _ => SourceType::Disk,
    }
}

fn parse_source_status(s: &str) -> SourceStatus {
    match s {
        "SCANNING" => SourceStatus::Scanning,
        "COMPLETED" => SourceStatus::Completed,
        "FAILED" => SourceStatus::Failed,
        "POSTPONED" => SourceStatus::Postponed,
        _ => SourceStatus::Pending,
    }
}

fn parse_file_status(s: &str) -> FileStatus {
    match s {
        "ANALYZED" => FileStatus::Analyzed,
        "CLASSIFIED" => FileStatus::Classified,
        "STAGED" => FileStatus::Staged,
        "MIGRATED" => FileStatus::Migrated,
        "DUPLICATE" => FileStatus::Duplicate,
        "SKIPPED" => FileStatus::Skipped,
        "FAILED" => FileStatus::Failed,
        "DISCOVERED" => FileStatus::Discovered,
        _ => FileStatus::Hashed,
    }
}

fn parse_dup_status(s: &str) -> DuplicateGroupStatus {
    match s {
        "REVIEWED" => DuplicateGroupStatus::Reviewed,
        "RESOLVED" => DuplicateGroupStatus::Resolved,
        "IGNORED" => DuplicateGroupStatus::Ignored,
        _ => DuplicateGroupStatus::Pending,
    }
}

fn parse_project_type(s: &str) -> ProjectType {
    match s {
        "MAVEN" => ProjectType::Maven,
        "GRADLE" => ProjectType::Gradle,
        "NPM" => ProjectType::Npm,
        "GO" => ProjectType::Go,
        "PYTHON" => ProjectType::Python,
        "RUST" => ProjectType::Rust,
        _ => ProjectType::Generic,
    }
}

fn parse_cp_dup_type(s: &str) -> CodeProjectDuplicateType {
    match s {
        "EXACT" => CodeProjectDuplicateType::Exact,
        "DIFFERENT_VERSION" => CodeProjectDuplicateType::DifferentVersion,
        _ => CodeProjectDuplicateType::SameProjectDiffContent,
    }
}

fn parse_diff_complexity(s: &str) -> DiffComplexity {
    match s {
        "TRIVIAL" => DiffComplexity::Trivial,
        "SIMPLE" => DiffComplexity::Simple,
        "COMPLEX" => DiffComplexity::Complex,
        _ => DiffComplexity::Medium,
    }
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
