//! Hash Engine (C1) — streaming SHA-256 over a bounded worker pool.

use archivum_core::{ArchivumError, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const CHUNK_SIZE: usize = 8 * 1024;
const PROGRESS_GRANULARITY: u64 = 100 * 1024 * 1024;

/// Digest `path` in fixed 8 KiB reads without ever holding the whole file
/// in memory. `progress` is invoked at ≥100 MiB granularity and only when
/// the file is larger than that threshold.
pub fn hash_file(path: &Path, mut progress: impl FnMut(u64, u64)) -> Result<String> {
    let mut file = File::open(path).map_err(|e| ArchivumError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let total = file
        .metadata()
        .map_err(|e| ArchivumError::Io {
            path: path.to_path_buf(),
            source: e,
        })?
        .len();

    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];
    let mut done: u64 = 0;
    let mut last_reported: u64 = 0;
    loop {
        let n = file.read(&mut buf).map_err(|e| ArchivumError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        done += n as u64;
        if total > PROGRESS_GRANULARITY && done - last_reported >= PROGRESS_GRANULARITY {
            progress(done, total);
            last_reported = done;
        }
    }
    if total > PROGRESS_GRANULARITY {
        progress(done, total);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Recompute the digest and compare, case-insensitively, against `expected`.
pub fn verify_hash(path: &Path, expected: &str) -> Result<bool> {
    let actual = hash_file(path, |_, _| {})?;
    Ok(actual.eq_ignore_ascii_case(expected))
}

/// A bounded worker pool dedicated to hashing. Wraps a `rayon::ThreadPool`
/// so its lifetime and degree of parallelism are explicit and separate
/// from the global rayon pool the walker uses.
pub struct HashPool {
    pool: rayon::ThreadPool,
}

impl HashPool {
    pub fn new(threads: usize) -> Result<HashPool> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("archivum-hash-{i}"))
            .build()
            .map_err(|e| ArchivumError::Hash(e.to_string()))?;
        Ok(HashPool { pool })
    }

    /// Hash every path in `paths`, preserving input order in the output.
    /// Tasks in flight complete before this call returns — there is no
    /// detached submission API, so pool shutdown is always clean.
    pub fn hash_all(&self, paths: &[std::path::PathBuf]) -> Vec<(std::path::PathBuf, Result<String>)> {
        use rayon::prelude::*;
        self.pool.install(|| {
            paths
                .par_iter()
                .map(|p| (p.clone(), hash_file(p, |_, _| {})))
                .collect()
        })
    }
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        let bytes = bytes.as_ref();
        let mut s = String::with_capacity(bytes.len() * 2);
        for b in bytes {
            s.push_str(&format!("{b:02x}"));
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_matches_known_vector() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        File::create(&path).unwrap();
        let digest = hash_file(&path, |_, _| {}).unwrap();
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn hello_world_matches_known_vector() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        let mut f = File::create(&path).unwrap();
        f.write_all(b"Hello, World!").unwrap();
        drop(f);
        let digest = hash_file(&path, |_, _| {}).unwrap();
        assert_eq!(
            digest,
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
    }

    #[test]
    fn verify_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"Hello, World!").unwrap();
        let upper = hash_file(&path, |_, _| {}).unwrap().to_uppercase();
        assert!(verify_hash(&path, &upper).unwrap());
    }

    #[test]
    fn pool_preserves_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for i in 0..8 {
            let p = dir.path().join(format!("f{i}.txt"));
            std::fs::write(&p, format!("contents-{i}")).unwrap();
            paths.push(p);
        }
        let pool = HashPool::new(4).unwrap();
        let results = pool.hash_all(&paths);
        for (expected, (got_path, _)) in paths.iter().zip(results.iter()) {
            assert_eq!(expected, got_path);
        }
    }
}
