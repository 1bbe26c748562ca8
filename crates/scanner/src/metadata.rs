//! Metadata Extractor (C3) — per-file attribute capture plus a pluggable
//! EXIF side-record.

use archivum_core::model::{ExifRecord, FileStatus, ScannedFile};
use archivum_core::{ArchivumError, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use uuid::Uuid;

/// Tails that, combined with a recognized stem segment, form a compound
/// extension (`tar.gz`, `backup.zst`, …) instead of being treated alone.
const COMPOUND_TAILS: &[&str] = &["gz", "bz2", "xz", "zst", "z", "lz", "lzma"];
const COMPOUND_STEMS: &[&str] = &["tar", "backup", "sql"];

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tiff", "tif", "heif", "heic", "webp"];

/// Pluggable EXIF sub-extractor. Production code can supply a real decoder;
/// tests and the default build use `NullExifExtractor`. Failure or absence
/// is never an error — it yields `None` silently (§4.3, §7).
pub trait ExifExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Option<ExifRecord>;
}

pub struct NullExifExtractor;

impl ExifExtractor for NullExifExtractor {
    fn extract(&self, _path: &Path) -> Option<ExifRecord> {
        None
    }
}

/// Lowercase the extension, recognizing compound tails like `tar.gz`.
pub fn derive_extension(file_name: &str) -> String {
    let lower = file_name.to_ascii_lowercase();
    let segments: Vec<&str> = lower.split('.').collect();
    if segments.len() >= 3 {
        let tail = segments[segments.len() - 1];
        let stem = segments[segments.len() - 2];
        if COMPOUND_TAILS.contains(&tail) && COMPOUND_STEMS.contains(&stem) {
            return format!("{stem}.{tail}");
        }
    }
    if segments.len() >= 2 {
        segments[segments.len() - 1].to_string()
    } else {
        String::new()
    }
}

/// Infer a MIME type from extension, falling back to a magic-byte sniff of
/// the file's first bytes, and finally `application/octet-stream`.
pub fn infer_mime(extension: &str, path: &Path) -> String {
    if let Some(mime) = mime_from_extension(extension) {
        return mime.to_string();
    }
    if let Some(mime) = mime_from_magic_bytes(path) {
        return mime.to_string();
    }
    "application/octet-stream".to_string()
}

fn mime_from_extension(extension: &str) -> Option<&'static str> {
    Some(match extension {
        "txt" | "md" | "rst" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "tar.gz" | "tgz" => "application/gzip",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" | "heif" => "image/heic",
        "tif" | "tiff" => "image/tiff",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "rs" => "text/x-rust",
        "py" => "text/x-python",
        "go" => "text/x-go",
        _ => return None,
    })
}

fn mime_from_magic_bytes(path: &Path) -> Option<&'static str> {
    let bytes = std::fs::read(path).ok()?;
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Some("image/png");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.starts_with(b"%PDF") {
        return Some("application/pdf");
    }
    if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
        return Some("application/zip");
    }
    None
}

pub struct ExtractedMetadata {
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub accessed_at: DateTime<Utc>,
    pub size: u64,
}

fn system_time_to_utc(t: std::io::Result<std::time::SystemTime>) -> DateTime<Utc> {
    t.ok()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(Utc::now)
}

/// Read filesystem attributes atomically via a single `metadata()` call.
pub fn read_attributes(path: &Path) -> Result<ExtractedMetadata> {
    let meta = std::fs::metadata(path).map_err(|e| ArchivumError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(ExtractedMetadata {
        created_at: system_time_to_utc(meta.created()),
        modified_at: system_time_to_utc(meta.modified()),
        accessed_at: system_time_to_utc(meta.accessed()),
        size: meta.len(),
    })
}

/// Extract a full `ScannedFile` record. `sha256` is supplied by the caller
/// (already computed by the Hash Engine); this stage never hashes.
pub fn extract(
    path: &Path,
    source_id: Uuid,
    sha256: String,
    exif_extractor: &dyn ExifExtractor,
    want_exif: bool,
) -> Result<ScannedFile> {
    let attrs = read_attributes(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = derive_extension(&file_name);
    let mime_type = infer_mime(&extension, path);

    let exif = if want_exif && IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        exif_extractor.extract(path)
    } else {
        None
    };

    Ok(ScannedFile {
        id: Uuid::new_v4(),
        source_id,
        path: path.to_string_lossy().to_string(),
        name: file_name,
        extension,
        size: attrs.size,
        sha256,
        mime_type,
        created_at: attrs.created_at,
        modified_at: attrs.modified_at,
        accessed_at: attrs.accessed_at,
        scanned_at: Utc::now(),
        exif,
        status: FileStatus::Hashed,
        is_duplicate: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_extension_is_recognized() {
        assert_eq!(derive_extension("db.sql.gz"), "sql.gz");
        assert_eq!(derive_extension("archive.tar.gz"), "tar.gz");
        assert_eq!(derive_extension("backup.bz2"), "bz2");
    }

    #[test]
    fn non_compound_tail_falls_back_to_simple_extension() {
        assert_eq!(derive_extension("readme.TXT"), "txt");
        assert_eq!(derive_extension("archive.photo.gz"), "gz");
    }

    #[test]
    fn no_extension_yields_empty_string() {
        assert_eq!(derive_extension("Makefile"), "");
    }

    #[test]
    fn mime_falls_back_to_octet_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mystery.xyz");
        std::fs::write(&path, b"not a known format").unwrap();
        assert_eq!(infer_mime("xyz", &path), "application/octet-stream");
    }

    #[test]
    fn extract_skips_exif_for_non_image_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();
        let record = extract(
            &path,
            Uuid::new_v4(),
            "deadbeef".to_string(),
            &NullExifExtractor,
            true,
        )
        .unwrap();
        assert!(record.exif.is_none());
        assert_eq!(record.status, FileStatus::Hashed);
        assert!(!record.is_duplicate);
    }
}
