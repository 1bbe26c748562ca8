//! Scanner configuration — YAML file, overridden by environment, overridden
//! by CLI flags (§6 "Config").

use archivum_core::{ArchivumError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerConfig {
    pub hash_threads: usize,
    pub batch_size: usize,
    pub follow_symlinks: bool,
    pub skip_system_dirs: bool,
    pub exclude_patterns: Vec<String>,
    pub extract_exif: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        ScannerConfig {
            hash_threads: num_cpus(),
            batch_size: 500,
            follow_symlinks: false,
            skip_system_dirs: true,
            exclude_patterns: Vec::new(),
            extract_exif: true,
        }
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl ScannerConfig {
    /// Load from an optional YAML file, then apply `ARCHIVUM_`-prefixed
    /// environment overrides. CLI flags are applied by the caller afterward
    /// since clap already parsed them by the time a config is built here.
    pub fn load(file: Option<&Path>) -> Result<ScannerConfig> {
        let mut cfg = match file {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| ArchivumError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })?;
                serde_yaml::from_str(&text)
                    .map_err(|e| ArchivumError::Config(format!("invalid config at {path:?}: {e}")))?
            }
            None => ScannerConfig::default(),
        };
        cfg.apply_env();
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("ARCHIVUM_HASH_THREADS") {
            if let Ok(n) = v.parse() {
                self.hash_threads = n;
            }
        }
        if let Ok(v) = std::env::var("ARCHIVUM_BATCH_SIZE") {
            if let Ok(n) = v.parse() {
                self.batch_size = n;
            }
        }
        if let Ok(v) = std::env::var("ARCHIVUM_FOLLOW_SYMLINKS") {
            self.follow_symlinks = parse_bool(&v, self.follow_symlinks);
        }
        if let Ok(v) = std::env::var("ARCHIVUM_SKIP_SYSTEM_DIRS") {
            self.skip_system_dirs = parse_bool(&v, self.skip_system_dirs);
        }
        if let Ok(v) = std::env::var("ARCHIVUM_EXTRACT_EXIF") {
            self.extract_exif = parse_bool(&v, self.extract_exif);
        }
        if let Ok(v) = std::env::var("ARCHIVUM_EXCLUDE_PATTERNS") {
            self.exclude_patterns = v.split(',').map(|s| s.trim().to_string()).collect();
        }
    }
}

fn parse_bool(v: &str, default: bool) -> bool {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => true,
        "0" | "false" | "no" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = ScannerConfig::default();
        assert!(cfg.batch_size > 0);
        assert!(cfg.skip_system_dirs);
        assert!(!cfg.follow_symlinks);
    }

    #[test]
    fn loads_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archivum.yaml");
        std::fs::write(&path, "hashThreads: 2\nbatchSize: 50\nfollowSymlinks: true\nskipSystemDirs: false\nexcludePatterns: [\"*.tmp\"]\nextractExif: false\n").unwrap();
        let cfg = ScannerConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.hash_threads, 2);
        assert_eq!(cfg.batch_size, 50);
        assert!(cfg.follow_symlinks);
        assert!(!cfg.skip_system_dirs);
        assert_eq!(cfg.exclude_patterns, vec!["*.tmp".to_string()]);
        assert!(!cfg.extract_exif);
    }
}
