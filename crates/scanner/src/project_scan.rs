//! Project scan (§4.4 continued) — walks the tree looking for project
//! roots, prunes discovered subtrees from further search, and computes
//! each project's content hash and file counts.

use crate::detect::{default_chain, detect_project, ProjectIdentity};
use archivum_core::model::CodeProject;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Directories never descended into while searching for project roots.
const PROJECT_SCAN_EXCLUDES: &[&str] = &[
    "target",
    "build",
    "out",
    "dist",
    ".gradle",
    "node_modules",
    "vendor",
    ".venv",
    "venv",
    "__pycache__",
    ".idea",
    ".vscode",
    ".eclipse",
    ".DS_Store",
    "Thumbs.db",
    ".git",
    ".svn",
    ".hg",
];

const SOURCE_CODE_EXTENSIONS: &[&str] = &[
    "rs", "go", "py", "js", "ts", "jsx", "tsx", "java", "kt", "c", "cpp", "cc", "h", "hpp", "cs",
    "rb", "php", "swift", "scala",
];

/// Scan `root` for project markers, registering the outermost root of each
/// detected project and never re-entering its subtree afterward (§4.4
/// "never discover nested projects").
///
/// `file_hashes` is the orchestrator's in-memory path→sha256 map built
/// during the file scan; it feeds the content-hash computation below.
pub fn scan_projects(
    root: &Path,
    source_id: Uuid,
    file_hashes: &HashMap<PathBuf, String>,
) -> Vec<CodeProject> {
    let chain = default_chain();
    let mut projects = Vec::new();
    walk_for_projects(root, &chain, file_hashes, source_id, &mut projects);
    projects
}

fn walk_for_projects(
    dir: &Path,
    chain: &[Box<dyn crate::detect::ProjectDetector>],
    file_hashes: &HashMap<PathBuf, String>,
    source_id: Uuid,
    out: &mut Vec<CodeProject>,
) {
    if let Some(identity) = detect_project(chain, dir) {
        out.push(materialize(dir, source_id, identity, file_hashes));
        return; // pruned: do not search inside a detected project root
    }

    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = path.file_name().unwrap_or_default().to_string_lossy().to_string();
        if PROJECT_SCAN_EXCLUDES.contains(&name.as_str()) {
            continue;
        }
        walk_for_projects(&path, chain, file_hashes, source_id, out);
    }
}

fn materialize(
    root: &Path,
    source_id: Uuid,
    identity: ProjectIdentity,
    file_hashes: &HashMap<PathBuf, String>,
) -> CodeProject {
    let (total_file_count, total_size_bytes, source_file_count, source_hashes) =
        collect_project_files(root, file_hashes);
    let content_hash = compute_content_hash(&source_hashes);

    CodeProject {
        id: Uuid::new_v4(),
        source_id,
        root_path: root.to_string_lossy().to_string(),
        project_type: identity.project_type,
        name: identity.name,
        version: identity.version,
        group_id: identity.group_id,
        git_remote: identity.git_remote,
        git_branch: identity.git_branch,
        git_commit: identity.git_commit,
        identifier: identity.identifier,
        content_hash,
        source_file_count: source_file_count as u64,
        total_file_count: total_file_count as u64,
        total_size_bytes,
        scanned_at: Utc::now(),
        source_hashes,
    }
}

/// Re-walk the project root (with the same exclusion set) to count total
/// files, source files, total size, and gather the sha256 set used for
/// the content hash.
fn collect_project_files(
    root: &Path,
    file_hashes: &HashMap<PathBuf, String>,
) -> (usize, u64, usize, Vec<String>) {
    let mut total_files = 0usize;
    let mut total_size = 0u64;
    let mut source_files = 0usize;
    let mut hashes = Vec::new();
    let excludes: HashSet<&str> = PROJECT_SCAN_EXCLUDES.iter().copied().collect();

    fn walk(
        dir: &Path,
        excludes: &HashSet<&str>,
        file_hashes: &HashMap<PathBuf, String>,
        total_files: &mut usize,
        total_size: &mut u64,
        source_files: &mut usize,
        hashes: &mut Vec<String>,
    ) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                let name = path.file_name().unwrap_or_default().to_string_lossy().to_string();
                if excludes.contains(name.as_str()) {
                    continue;
                }
                walk(&path, excludes, file_hashes, total_files, total_size, source_files, hashes);
            } else {
                *total_files += 1;
                if let Ok(meta) = std::fs::metadata(&path) {
                    *total_size += meta.len();
                }
                let is_source = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| SOURCE_CODE_EXTENSIONS.contains(&e))
                    .unwrap_or(false);
                if is_source {
                    *source_files += 1;
                    if let Some(hash) = file_hashes.get(&path) {
                        hashes.push(hash.clone());
                    }
                }
            }
        }
    }

    walk(
        root,
        &excludes,
        file_hashes,
        &mut total_files,
        &mut total_size,
        &mut source_files,
        &mut hashes,
    );
    (total_files, total_size, source_files, hashes)
}

/// SHA-256 over the sorted, concatenated source-file hashes. Empty set
/// yields the literal `empty` (§4.4 "Content hash").
fn compute_content_hash(source_hashes: &[String]) -> String {
    if source_hashes.is_empty() {
        return "empty".to_string();
    }
    let mut sorted = source_hashes.to_vec();
    sorted.sort();
    let joined = sorted.concat();
    let digest = Sha256::digest(joined.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn nested_projects_are_suppressed() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("a");
        fs::create_dir_all(&root).unwrap();
        fs::write(
            root.join("pom.xml"),
            r#"<project><groupId>g</groupId><artifactId>a</artifactId><version>1</version></project>"#,
        )
        .unwrap();
        let sub = root.join("sub");
        fs::create_dir_all(&sub).unwrap();
        fs::write(
            sub.join("pom.xml"),
            r#"<project><groupId>g</groupId><artifactId>b</artifactId><version>1</version></project>"#,
        )
        .unwrap();

        let projects = scan_projects(dir.path(), Uuid::new_v4(), &HashMap::new());
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].root_path, root.to_string_lossy());
    }

    #[test]
    fn content_hash_is_deterministic_and_order_independent() {
        let mut a = HashMap::new();
        a.insert(PathBuf::from("/x/A.rs"), "aaa".to_string());
        a.insert(PathBuf::from("/x/B.rs"), "bbb".to_string());
        let mut b = HashMap::new();
        b.insert(PathBuf::from("/y/B.rs"), "bbb".to_string());
        b.insert(PathBuf::from("/y/A.rs"), "aaa".to_string());

        let hash_a = compute_content_hash(&["aaa".to_string(), "bbb".to_string()]);
        let hash_b = compute_content_hash(&["bbb".to_string(), "aaa".to_string()]);
        assert_eq!(hash_a, hash_b);

        let hash_changed = compute_content_hash(&["aaa".to_string(), "ccc".to_string()]);
        assert_ne!(hash_a, hash_changed);
        let _ = (a, b);
    }

    #[test]
    fn empty_source_set_hashes_to_literal_empty() {
        assert_eq!(compute_content_hash(&[]), "empty");
    }
}
