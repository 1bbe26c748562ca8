//! Domain types for the Archivum catalog — §3 of the specification.
//!
//! These are the "owned-entity" records the store persists and the ingest
//! service operates on. They carry no ORM behavior; repository functions in
//! `archivum-server::store` do the loading and saving explicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    Disk,
    Partition,
    Cloud,
    Network,
    Archive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceStatus {
    Pending,
    Scanning,
    Completed,
    Failed,
    Postponed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileStatus {
    Discovered,
    Hashed,
    Analyzed,
    Classified,
    Staged,
    Migrated,
    Duplicate,
    Skipped,
    Failed,
}

/// Coarse classification determining dedup policy (§4.10, §4.11, glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Zone {
    Media,
    Documents,
    Books,
    Software,
    Backup,
    Code,
    Unknown,
}

impl Zone {
    /// Zones that dedup only at folder/project granularity, never file-level (§4.10).
    pub fn is_dedup_gated(self) -> bool {
        matches!(self, Zone::Software | Zone::Backup | Zone::Code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Zone::Media => "MEDIA",
            Zone::Documents => "DOCUMENTS",
            Zone::Books => "BOOKS",
            Zone::Software => "SOFTWARE",
            Zone::Backup => "BACKUP",
            Zone::Code => "CODE",
            Zone::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(s: &str) -> Option<Zone> {
        match s {
            "MEDIA" => Some(Zone::Media),
            "DOCUMENTS" => Some(Zone::Documents),
            "BOOKS" => Some(Zone::Books),
            "SOFTWARE" => Some(Zone::Software),
            "BACKUP" => Some(Zone::Backup),
            "CODE" => Some(Zone::Code),
            "UNKNOWN" => Some(Zone::Unknown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectType {
    Maven,
    Gradle,
    Npm,
    Go,
    Python,
    Rust,
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DuplicateGroupStatus {
    Pending,
    Reviewed,
    Resolved,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CodeProjectDuplicateType {
    Exact,
    SameProjectDiffContent,
    DifferentVersion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiffComplexity {
    Trivial,
    Simple,
    Medium,
    Complex,
}

impl DiffComplexity {
    /// Bucket a file-count delta ratio per §4.10: TRIVIAL <5%, SIMPLE <15%, MEDIUM <30%, COMPLEX >=30%.
    pub fn from_delta_ratio(ratio: f64) -> DiffComplexity {
        if ratio < 0.05 {
            DiffComplexity::Trivial
        } else if ratio < 0.15 {
            DiffComplexity::Simple
        } else if ratio < 0.30 {
            DiffComplexity::Medium
        } else {
            DiffComplexity::Complex
        }
    }
}

// ---------------------------------------------------------------------------
// Physical-ID bundle (C5)
// ---------------------------------------------------------------------------

/// Volume/partition/disk identifier bundle captured by the Physical-ID Probe.
/// Every field is independently optional — a shell-out timeout or an
/// unsupported platform leaves the corresponding field `None`, never fails
/// the scan (§4.5, §7 "Shell-out timeout").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhysicalId {
    pub mount_point: Option<String>,
    pub filesystem: Option<String>,
    pub capacity_bytes: Option<u64>,
    pub used_bytes: Option<u64>,
    pub volume_label: Option<String>,
    pub disk_uuid: Option<String>,
    pub partition_uuid: Option<String>,
    pub serial_number: Option<String>,
    pub physical_label: Option<String>,
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
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

// ---------------------------------------------------------------------------
// EXIF side record (C3)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExifRecord {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub taken_at: Option<DateTime<Utc>>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub gps_lat: Option<f64>,
    pub gps_lon: Option<f64>,
    pub orientation: Option<u16>,
}

// ---------------------------------------------------------------------------
// ScannedFile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannedFile {
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

// ---------------------------------------------------------------------------
// FileHash
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileHash {
    pub sha256: String,
    pub size: u64,
    pub first_seen_at: DateTime<Utc>,
    pub member_count: u64,
}

// ---------------------------------------------------------------------------
// DuplicateGroup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub id: Uuid,
    pub sha256: String,
    pub status: DuplicateGroupStatus,
    pub kept_file_id: Option<Uuid>,
    pub wasted_size: u64,
}

// ---------------------------------------------------------------------------
// FolderZone
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderZone {
    pub source_id: Uuid,
    pub folder_path: String,
    pub zone: Zone,
}

// ---------------------------------------------------------------------------
// CodeProject
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeProject {
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
    /// The sha256 set of the project's source files, used by the Dedup
    /// Engine to compute Jaccard similarity between same-identifier
    /// projects with diverging content (§4.4 content hash, §4.10).
    pub source_hashes: Vec<String>,
}

// ---------------------------------------------------------------------------
// CodeProjectDuplicateGroup / Member
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeProjectDuplicateGroup {
    pub id: Uuid,
    pub identifier: String,
    pub status: DuplicateGroupStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeProjectDuplicateMember {
    pub group_id: Uuid,
    pub project_id: Uuid,
    pub duplicate_type: CodeProjectDuplicateType,
    pub similarity_percent: Option<f64>,
    pub diff_complexity: Option<DiffComplexity>,
    pub is_primary: bool,
}
