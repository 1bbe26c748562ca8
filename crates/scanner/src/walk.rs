//! Walker (C2) — depth-first traversal with exclusion predicates and safe
//! error continuation.

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Directories skipped outright when `skip_system_dirs` is set (§4.2).
const SYSTEM_DIRS: &[&str] = &[
    ".Trash",
    ".Trashes",
    "$RECYCLE.BIN",
    "System Volume Information",
    ".TemporaryItems",
    ".Spotlight-V100",
    ".fseventsd",
];

pub struct WalkOptions {
    pub skip_system_dirs: bool,
    pub follow_symlinks: bool,
    pub exclude_patterns: Vec<String>,
}

pub struct WalkResult {
    pub files: Vec<PathBuf>,
    pub total_size: u64,
}

fn build_globset(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        } else {
            warn!(pattern, "ignoring invalid exclude glob");
        }
    }
    builder.build().unwrap_or_else(|_| GlobSetBuilder::new().build().unwrap())
}

/// Walk `root`, returning every regular file found and the sum of their
/// sizes (accumulated during the walk so no second pass is needed).
///
/// A permission or I/O error on an individual entry is logged and the
/// walk continues — only construction failures on `root` itself abort it.
pub fn walk(root: &Path, opts: &WalkOptions) -> WalkResult {
    let skip_dirs: HashSet<&'static str> = if opts.skip_system_dirs {
        SYSTEM_DIRS.iter().copied().collect()
    } else {
        HashSet::new()
    };
    let excludes = build_globset(&opts.exclude_patterns);

    let files: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());
    let total_size = std::sync::atomic::AtomicU64::new(0);

    WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .follow_links(opts.follow_symlinks)
        .filter_entry(move |entry| {
            if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                let name = entry.file_name().to_string_lossy();
                return !skip_dirs.contains(name.as_ref());
            }
            true
        })
        .build_parallel()
        .run(|| {
            let files = &files;
            let total_size = &total_size;
            let excludes = excludes.clone();
            Box::new(move |entry| {
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => {
                        warn!(error = %e, "walk entry error, skipping");
                        return ignore::WalkState::Continue;
                    }
                };
                if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                    return ignore::WalkState::Continue;
                }
                let path = entry.path();
                let basename = entry.file_name().to_string_lossy();
                if excludes.is_match(basename.as_ref()) {
                    return ignore::WalkState::Continue;
                }
                match entry.metadata() {
                    Ok(meta) => {
                        total_size.fetch_add(meta.len(), std::sync::atomic::Ordering::Relaxed);
                        files.lock().unwrap().push(path.to_path_buf());
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "stat failed, skipping");
                    }
                }
                ignore::WalkState::Continue
            })
        });

    let mut files = files.into_inner().unwrap();
    files.sort();
    WalkResult {
        files,
        total_size: total_size.load(std::sync::atomic::Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn skips_system_dirs_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join(".Trash/x.txt"), "x");
        write(&root.join("$RECYCLE.BIN/y.txt"), "y");
        write(&root.join("normal.txt"), "z");

        let opts = WalkOptions {
            skip_system_dirs: true,
            follow_symlinks: false,
            exclude_patterns: vec![],
        };
        let result = walk(root, &opts);
        let names: Vec<String> = result
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["normal.txt".to_string()]);
    }

    #[test]
    fn includes_everything_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join(".Trash/x.txt"), "x");
        write(&root.join("$RECYCLE.BIN/y.txt"), "y");
        write(&root.join("normal.txt"), "z");

        let opts = WalkOptions {
            skip_system_dirs: false,
            follow_symlinks: false,
            exclude_patterns: vec![],
        };
        let result = walk(root, &opts);
        assert_eq!(result.files.len(), 3);
    }

    #[test]
    fn accumulates_total_size_during_walk() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("a.txt"), "100 bytes worth of wording");
        write(&root.join("b/c.txt"), "more");

        let opts = WalkOptions {
            skip_system_dirs: true,
            follow_symlinks: false,
            exclude_patterns: vec![],
        };
        let result = walk(root, &opts);
        let expected: u64 = result
            .files
            .iter()
            .map(|p| fs::metadata(p).unwrap().len())
            .sum();
        assert_eq!(result.total_size, expected);
    }
}
