//! Physical-ID Probe (C5) — OS-dependent capture of volume/partition/disk
//! identifiers. Every field is independently optional; a probe timeout or
//! an unsupported platform just leaves the field `None` (§4.5, §7).

use archivum_core::model::PhysicalId;
use std::path::Path;
use std::time::Duration;

use crate::shellout::run_with_timeout;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Capture filesystem-API attributes (mount point, capacity, used bytes)
/// plus platform-specific shell probes for disk/partition UUIDs.
pub fn probe(root: &Path) -> PhysicalId {
    let mut id = PhysicalId::default();
    id.mount_point = Some(root.to_string_lossy().to_string());

    #[cfg(target_os = "linux")]
    probe_linux(root, &mut id);
    #[cfg(target_os = "macos")]
    probe_macos(root, &mut id);
    #[cfg(target_os = "windows")]
    probe_windows(root, &mut id);

    id
}

#[cfg(target_os = "linux")]
fn probe_linux(root: &Path, id: &mut PhysicalId) {
    let root_str = root.to_string_lossy().to_string();

    if let Some(out) = run_with_timeout("df", &["-P", "-B1", &root_str], PROBE_TIMEOUT) {
        if let Some(line) = out.lines().nth(1) {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() >= 4 {
                id.filesystem = Some(cols[0].to_string());
                id.capacity_bytes = cols[1].parse().ok();
                id.used_bytes = cols[2].parse().ok();
            }
        }
    }

    if let Some(device) = id.filesystem.clone() {
        if let Some(out) = run_with_timeout(
            "blkid",
            &["-o", "export", &device],
            PROBE_TIMEOUT,
        ) {
            for line in out.lines() {
                if let Some(value) = line.strip_prefix("UUID=") {
                    id.partition_uuid = Some(value.to_string());
                }
                if let Some(value) = line.strip_prefix("LABEL=") {
                    id.volume_label = Some(value.to_string());
                }
            }
        }
        if let Some(out) = run_with_timeout(
            "udevadm",
            &["info", "--query=property", "--name", &device],
            PROBE_TIMEOUT,
        ) {
            for line in out.lines() {
                if let Some(value) = line.strip_prefix("ID_SERIAL=") {
                    id.serial_number = Some(value.to_string());
                }
            }
        }
    }
}

#[cfg(target_os = "macos")]
fn probe_macos(root: &Path, id: &mut PhysicalId) {
    let root_str = root.to_string_lossy().to_string();

    if let Some(out) = run_with_timeout("diskutil", &["info", &root_str], PROBE_TIMEOUT) {
        for line in out.lines() {
            let (key, value) = match line.split_once(':') {
                Some(kv) => kv,
                None => continue,
            };
            let key = key.trim();
            let value = value.trim().to_string();
            match key {
                "Volume Name" => id.volume_label = Some(value),
                "File System Personality" => id.filesystem = Some(value),
                "Volume UUID" => id.partition_uuid = Some(value),
                "Disk / Partition UUID" => id.disk_uuid = Some(value),
                "Total Size" => {
                    id.capacity_bytes = value
                        .split_whitespace()
                        .find_map(|tok| tok.parse::<u64>().ok());
                }
                _ => {}
            }
        }
    }

    if let Some(out) = run_with_timeout(
        "system_profiler",
        &["SPStorageDataType"],
        PROBE_TIMEOUT,
    ) {
        if id.serial_number.is_none() {
            for line in out.lines() {
                if let Some(value) = line.trim().strip_prefix("Serial Number:") {
                    id.serial_number = Some(value.trim().to_string());
                    break;
                }
            }
        }
    }
}

#[cfg(target_os = "windows")]
fn probe_windows(root: &Path, id: &mut PhysicalId) {
    let drive = root
        .components()
        .next()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .unwrap_or_default();

    if let Some(out) = run_with_timeout(
        "wmic",
        &[
            "logicaldisk",
            "where",
            &format!("DeviceID='{drive}'"),
            "get",
            "FileSystem,FreeSpace,Size,VolumeName,VolumeSerialNumber",
            "/format:list",
        ],
        PROBE_TIMEOUT,
    ) {
        for line in out.lines() {
            let (key, value) = match line.split_once('=') {
                Some(kv) => kv,
                None => continue,
            };
            let value = value.trim().to_string();
            match key.trim() {
                "FileSystem" => id.filesystem = Some(value),
                "Size" => id.capacity_bytes = value.parse().ok(),
                "VolumeName" => id.volume_label = Some(value),
                "VolumeSerialNumber" => id.serial_number = Some(value),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_never_panics_on_a_real_directory() {
        let dir = tempfile::tempdir().unwrap();
        let id = probe(dir.path());
        assert!(id.mount_point.is_some());
    }
}
