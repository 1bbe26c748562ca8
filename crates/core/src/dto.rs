//! Wire format — the on-disk output tree (§6) and the HTTP payloads
//! exchanged between the Scanner, the Uploader, and the Server.
//!
//! Kept deliberately separate from `model` rather than deriving the two
//! from one annotated struct: the wire format is camelCase and stable
//! across versions, while the internal model is free to grow store-only
//! fields. Conversions are explicit `From` impls, not a binding framework.

use crate::model::{
    CodeProject, DiffComplexity, DuplicateGroupStatus, ExifRecord, FileStatus, PhysicalId,
    ProjectType, ScannedFile, Source, SourceStatus, SourceType, Zone,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// SourceDto
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDto {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub root_path: String,
    pub parent_source_id: Option<Uuid>,
    pub status: SourceStatus,
    pub total_files: u64,
    pub total_size: u64,
    pub processed_files: u64,
    pub processed_size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub physical_id: PhysicalId,
}

impl From<Source> for SourceDto {
    fn from(s: Source) -> Self {
        SourceDto {
            id: s.id,
            name: s.name,
            source_type: s.source_type,
            root_path: s.root_path,
            parent_source_id: s.parent_source_id,
            status: s.status,
            total_files: s.total_files,
            total_size: s.total_size,
            processed_files: s.processed_files,
            processed_size: s.processed_size,
            created_at: s.created_at,
            updated_at: s.updated_at,
            physical_id: s.physical_id,
        }
    }
}

impl From<SourceDto> for Source {
    fn from(d: SourceDto) -> Self {
        Source {
            id: d.id,
            name: d.name,
            source_type: d.source_type,
            root_path: d.root_path,
            parent_source_id: d.parent_source_id,
            status: d.status,
            total_files: d.total_files,
            total_size: d.total_size,
            processed_files: d.processed_files,
            processed_size: d.processed_size,
            created_at: d.created_at,
            updated_at: d.updated_at,
            physical_id: d.physical_id,
        }
    }
}

// ---------------------------------------------------------------------------
// FileDto
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDto {
    pub id: Uuid,
    pub source_id: Uuid,
    pub path: String,
    pub name: String,
    pub extension: String,
    pub size: u64,
    pub sha256: String,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub accessed_at: DateTime<Utc>,
    pub scanned_at: DateTime<Utc>,
    pub exif: Option<ExifRecord>,
    pub status: FileStatus,
    pub is_duplicate: bool,
}

impl From<ScannedFile> for FileDto {
    fn from(f: ScannedFile) -> Self {
        FileDto {
            id: f.id,
            source_id: f.source_id,
            path: f.path,
            name: f.name,
            extension: f.extension,
            size: f.size,
            sha256: f.sha256,
            mime_type: f.mime_type,
            created_at: f.created_at,
            modified_at: f.modified_at,
            accessed_at: f.accessed_at,
            scanned_at: f.scanned_at,
            exif: f.exif,
            status: f.status,
            is_duplicate: f.is_duplicate,
        }
    }
}

impl From<FileDto> for ScannedFile {
    fn from(d: FileDto) -> Self {
        ScannedFile {
            id: d.id,
            source_id: d.source_id,
            path: d.path,
            name: d.name,
            extension: d.extension,
            size: d.size,
            sha256: d.sha256,
            mime_type: d.mime_type,
            created_at: d.created_at,
            modified_at: d.modified_at,
            accessed_at: d.accessed_at,
            scanned_at: d.scanned_at,
            exif: d.exif,
            status: d.status,
            is_duplicate: d.is_duplicate,
        }
    }
}

// ---------------------------------------------------------------------------
// CodeProjectDto
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeProjectDto {
    pub id: Uuid,
    pub source_id: Uuid,
    pub root_path: String,
    pub project_type: ProjectType,
    pub name: String,
    pub version: Option<String>,
    pub group_id: Option<String>,
    pub git_remote: Option<String>,
    pub git_branch: Option<String>,
    pub git_commit: Option<String>,
    pub identifier: String,
    pub content_hash: String,
    pub source_file_count: u64,
    pub total_file_count: u64,
    pub total_size_bytes: u64,
    pub scanned_at: DateTime<Utc>,
    #[serde(default)]
    pub source_hashes: Vec<String>,
}

impl From<CodeProject> for CodeProjectDto {
    fn from(p: CodeProject) -> Self {
        CodeProjectDto {
            id: p.id,
            source_id: p.source_id,
            root_path: p.root_path,
            project_type: p.project_type,
            name: p.name,
            version: p.version,
            group_id: p.group_id,
            git_remote: p.git_remote,
            git_branch: p.git_branch,
            git_commit: p.git_commit,
            identifier: p.identifier,
            content_hash: p.content_hash,
            source_file_count: p.source_file_count,
            total_file_count: p.total_file_count,
            total_size_bytes: p.total_size_bytes,
            scanned_at: p.scanned_at,
            source_hashes: p.source_hashes,
        }
    }
}

impl From<CodeProjectDto> for CodeProject {
    fn from(d: CodeProjectDto) -> Self {
        CodeProject {
            id: d.id,
            source_id: d.source_id,
            root_path: d.root_path,
            project_type: d.project_type,
            name: d.name,
            version: d.version,
            group_id: d.group_id,
            git_remote: d.git_remote,
            git_branch: d.git_branch,
            git_commit: d.git_commit,
            identifier: d.identifier,
            content_hash: d.content_hash,
            source_file_count: d.source_file_count,
            total_file_count: d.total_file_count,
            total_size_bytes: d.total_size_bytes,
            scanned_at: d.scanned_at,
            source_hashes: d.source_hashes,
        }
    }
}

// ---------------------------------------------------------------------------
// Batch / summary on-disk formats (§6)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileBatchDto {
    pub source_id: Uuid,
    pub batch_number: u32,
    pub files: Vec<FileDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanErrorEntry {
    pub file: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDto {
    pub source_id: Uuid,
    pub total_files: u64,
    pub total_size: u64,
    pub total_batches: u32,
    pub skipped_files: u64,
    pub errors: Vec<ScanErrorEntry>,
    pub duration_ms: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub scanner_version: String,
    pub scanner_host: String,
    pub scanner_user: String,
}

// ---------------------------------------------------------------------------
// HTTP request/response bodies not already covered by the DTOs above
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetFolderZoneRequest {
    pub zone: Zone,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteScanRequest {
    pub total_files: u64,
    pub total_size: u64,
    pub success: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveDuplicateGroupRequest {
    pub kept_file_id: Uuid,
    pub status: Option<DuplicateGroupStatus>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderNodeDto {
    pub name: String,
    pub path: String,
    pub is_folder: bool,
    pub file_count: u64,
    pub total_size: u64,
    pub zone: Option<Zone>,
    pub is_zone_inherited: bool,
    pub file_id: Option<Uuid>,
    pub extension: Option<String>,
    pub is_duplicate: Option<bool>,
    pub children: Vec<FolderNodeDto>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeProjectDuplicateMemberDto {
    pub project_id: Uuid,
    pub duplicate_type: crate::model::CodeProjectDuplicateType,
    pub similarity_percent: Option<f64>,
    pub diff_complexity: Option<DiffComplexity>,
    pub is_primary: bool,
}

impl From<crate::model::CodeProjectDuplicateMember> for CodeProjectDuplicateMemberDto {
    fn from(m: crate::model::CodeProjectDuplicateMember) -> Self {
        CodeProjectDuplicateMemberDto {
            project_id: m.project_id,
            duplicate_type: m.duplicate_type,
            similarity_percent: m.similarity_percent,
            diff_complexity: m.diff_complexity,
            is_primary: m.is_primary,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeProjectDuplicateGroupDto {
    pub id: Uuid,
    pub identifier: String,
    pub status: DuplicateGroupStatus,
    pub members: Vec<CodeProjectDuplicateMemberDto>,
}

// ---------------------------------------------------------------------------
// DuplicateGroupDto (file-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroupDto {
    pub id: Uuid,
    pub sha256: String,
    pub status: DuplicateGroupStatus,
    pub kept_file_id: Option<Uuid>,
    pub wasted_size: u64,
}

impl From<crate::model::DuplicateGroup> for DuplicateGroupDto {
    fn from(g: crate::model::DuplicateGroup) -> Self {
        DuplicateGroupDto {
            id: g.id,
            sha256: g.sha256,
            status: g.status,
            kept_file_id: g.kept_file_id,
            wasted_size: g.wasted_size,
        }
    }
}
