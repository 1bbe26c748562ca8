//! Project Detector Chain (C4) — priority-ordered identification of code
//! project roots from marker files.

use archivum_core::model::ProjectType;
use regex::Regex;
use std::path::Path;
use std::time::Duration;

use crate::shellout::run_with_timeout;

/// What a successful detection yields. Detectors return `None` rather than
/// raising — a malformed manifest just means "try the next detector"
/// (§4.4, §9 "exception-driven control flow").
#[derive(Debug, Clone)]
pub struct ProjectIdentity {
    pub project_type: ProjectType,
    pub name: String,
    pub version: Option<String>,
    pub group_id: Option<String>,
    pub git_remote: Option<String>,
    pub git_branch: Option<String>,
    pub git_commit: Option<String>,
    pub identifier: String,
}

/// The capability set every detector implements: can it claim this folder,
/// and if so what identity does it derive. `priority` breaks ties when
/// more than one detector's `can_detect` succeeds in the same folder.
pub trait ProjectDetector: Send + Sync {
    fn priority(&self) -> i32;
    fn can_detect(&self, folder: &Path) -> bool;
    fn detect(&self, folder: &Path) -> Option<ProjectIdentity>;
    fn name(&self) -> &'static str;
}

/// The fixed chain, sorted by descending priority, MAVEN/GRADLE/NPM/GO/
/// PYTHON/RUST tied at 10 — the caller iterates in registration order
/// within a tie, and the spec's "directory containing both pom.xml and
/// package.json yields MAVEN" is encoded by registering MAVEN first.
pub fn default_chain() -> Vec<Box<dyn ProjectDetector>> {
    let mut chain: Vec<Box<dyn ProjectDetector>> = vec![
        Box::new(MavenDetector),
        Box::new(GradleDetector),
        Box::new(NpmDetector),
        Box::new(GoDetector),
        Box::new(PythonDetector),
        Box::new(RustDetector),
        Box::new(GitDetector),
        Box::new(GenericDetector),
    ];
    chain.sort_by(|a, b| b.priority().cmp(&a.priority()));
    chain
}

/// Run the chain against `folder`, returning the first detector whose
/// `can_detect` succeeds AND whose `detect` returns an identity.
pub fn detect_project(
    chain: &[Box<dyn ProjectDetector>],
    folder: &Path,
) -> Option<ProjectIdentity> {
    for detector in chain {
        if detector.can_detect(folder) {
            if let Some(identity) = detector.detect(folder) {
                return Some(identity);
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// MAVEN
// ---------------------------------------------------------------------------

struct MavenDetector;

impl ProjectDetector for MavenDetector {
    fn priority(&self) -> i32 {
        10
    }
    fn name(&self) -> &'static str {
        "maven"
    }
    fn can_detect(&self, folder: &Path) -> bool {
        folder.join("pom.xml").is_file()
    }
    fn detect(&self, folder: &Path) -> Option<ProjectIdentity> {
        let text = std::fs::read_to_string(folder.join("pom.xml")).ok()?;
        let artifact_id = xml_tag(&text, "artifactId")?;
        let mut group_id = xml_tag(&text, "groupId");
        let mut version = xml_tag(&text, "version");
        if group_id.is_none() || version.is_none() {
            if let Some(parent) = xml_block(&text, "parent") {
                group_id = group_id.or_else(|| xml_tag(&parent, "groupId"));
                version = version.or_else(|| xml_tag(&parent, "version"));
            }
        }
        let group_id = group_id.unwrap_or_else(|| "unknown".to_string());
        let version = version.unwrap_or_else(|| "unknown".to_string());
        let identifier = format!("{group_id}:{artifact_id}:{version}");
        Some(ProjectIdentity {
            project_type: ProjectType::Maven,
            name: artifact_id,
            version: Some(version),
            group_id: Some(group_id),
            git_remote: None,
            git_branch: None,
            git_commit: None,
            identifier,
        })
    }
}

/// Extract the first top-level occurrence of `<tag>value</tag>`, ignoring
/// any occurrence nested inside a `<parent>` block (callers read the
/// parent block separately via [`xml_block`]).
fn xml_tag(text: &str, tag: &str) -> Option<String> {
    let parent_span = xml_span(text, "parent");
    let pattern = Regex::new(&format!(r"<{tag}>\s*([^<]+?)\s*</{tag}>")).ok()?;
    for m in pattern.find_iter(text) {
        if let Some((start, end)) = parent_span {
            if m.start() >= start && m.end() <= end {
                continue;
            }
        }
        let caps = pattern.captures(&text[m.start()..m.end()])?;
        return Some(caps.get(1)?.as_str().trim().to_string());
    }
    None
}

fn xml_span(text: &str, tag: &str) -> Option<(usize, usize)> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = text.find(&open)?;
    let end = text[start..].find(&close)? + start + close.len();
    Some((start, end))
}

fn xml_block(text: &str, tag: &str) -> Option<String> {
    let (start, end) = xml_span(text, tag)?;
    Some(text[start..end].to_string())
}

// ---------------------------------------------------------------------------
// GRADLE
// ---------------------------------------------------------------------------

struct GradleDetector;

impl ProjectDetector for GradleDetector {
    fn priority(&self) -> i32 {
        10
    }
    fn name(&self) -> &'static str {
        "gradle"
    }
    fn can_detect(&self, folder: &Path) -> bool {
        folder.join("build.gradle").is_file() || folder.join("build.gradle.kts").is_file()
    }
    fn detect(&self, folder: &Path) -> Option<ProjectIdentity> {
        let build_text = std::fs::read_to_string(folder.join("build.gradle"))
            .or_else(|_| std::fs::read_to_string(folder.join("build.gradle.kts")))
            .ok()?;

        let group_re = Regex::new(r#"group\s*=\s*["']([^"']+)["']"#).unwrap();
        let version_re = Regex::new(r#"version\s*=\s*["']([^"']+)["']"#).unwrap();
        let group_id = group_re
            .captures(&build_text)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let version = version_re
            .captures(&build_text)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let settings_text = std::fs::read_to_string(folder.join("settings.gradle"))
            .or_else(|_| std::fs::read_to_string(folder.join("settings.gradle.kts")))
            .ok();
        let name_re = Regex::new(r#"rootProject\.name\s*=\s*["']([^"']+)["']"#).unwrap();
        let name = settings_text
            .as_deref()
            .and_then(|t| name_re.captures(t).map(|c| c[1].to_string()))
            .unwrap_or_else(|| folder_name(folder));

        let identifier = format!("{group_id}:{name}:{version}");
        Some(ProjectIdentity {
            project_type: ProjectType::Gradle,
            name,
            version: Some(version),
            group_id: Some(group_id),
            git_remote: None,
            git_branch: None,
            git_commit: None,
            identifier,
        })
    }
}

fn folder_name(folder: &Path) -> String {
    folder
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

// ---------------------------------------------------------------------------
// NPM
// ---------------------------------------------------------------------------

struct NpmDetector;

impl ProjectDetector for NpmDetector {
    fn priority(&self) -> i32 {
        10
    }
    fn name(&self) -> &'static str {
        "npm"
    }
    fn can_detect(&self, folder: &Path) -> bool {
        folder.join("package.json").is_file()
    }
    fn detect(&self, folder: &Path) -> Option<ProjectIdentity> {
        let text = std::fs::read_to_string(folder.join("package.json")).ok()?;
        let value: serde_json::Value = serde_json::from_str(&text).ok()?;
        let name = value.get("name")?.as_str()?.to_string();
        let version = value
            .get("version")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();
        let identifier = format!("{name}:{version}");
        Some(ProjectIdentity {
            project_type: ProjectType::Npm,
            name,
            version: Some(version),
            group_id: None,
            git_remote: None,
            git_branch: None,
            git_commit: None,
            identifier,
        })
    }
}

// ---------------------------------------------------------------------------
// GO
// ---------------------------------------------------------------------------

struct GoDetector;

impl ProjectDetector for GoDetector {
    fn priority(&self) -> i32 {
        10
    }
    fn name(&self) -> &'static str {
        "go"
    }
    fn can_detect(&self, folder: &Path) -> bool {
        folder.join("go.mod").is_file()
    }
    fn detect(&self, folder: &Path) -> Option<ProjectIdentity> {
        let text = std::fs::read_to_string(folder.join("go.mod")).ok()?;
        let module_re = Regex::new(r"(?m)^module\s+(\S+)").unwrap();
        let module = module_re.captures(&text)?[1].to_string();
        Some(ProjectIdentity {
            project_type: ProjectType::Go,
            name: module.clone(),
            version: None,
            group_id: None,
            git_remote: None,
            git_branch: None,
            git_commit: None,
            identifier: module,
        })
    }
}

// ---------------------------------------------------------------------------
// PYTHON
// ---------------------------------------------------------------------------

struct PythonDetector;

impl ProjectDetector for PythonDetector {
    fn priority(&self) -> i32 {
        10
    }
    fn name(&self) -> &'static str {
        "python"
    }
    fn can_detect(&self, folder: &Path) -> bool {
        folder.join("pyproject.toml").is_file()
            || folder.join("setup.py").is_file()
            || folder.join("requirements.txt").is_file()
    }
    fn detect(&self, folder: &Path) -> Option<ProjectIdentity> {
        if let Ok(text) = std::fs::read_to_string(folder.join("pyproject.toml")) {
            let name_re = Regex::new(r#"(?m)^name\s*=\s*["']([^"']+)["']"#).unwrap();
            let version_re = Regex::new(r#"(?m)^version\s*=\s*["']([^"']+)["']"#).unwrap();
            if let Some(name) = name_re.captures(&text).map(|c| c[1].to_string()) {
                let version = version_re
                    .captures(&text)
                    .map(|c| c[1].to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                let identifier = format!("{name}:{version}");
                return Some(ProjectIdentity {
                    project_type: ProjectType::Python,
                    name,
                    version: Some(version),
                    group_id: None,
                    git_remote: None,
                    git_branch: None,
                    git_commit: None,
                    identifier,
                });
            }
        }
        if let Ok(text) = std::fs::read_to_string(folder.join("setup.py")) {
            let name_re = Regex::new(r#"name\s*=\s*["']([^"']+)["']"#).unwrap();
            let version_re = Regex::new(r#"version\s*=\s*["']([^"']+)["']"#).unwrap();
            if let Some(name) = name_re.captures(&text).map(|c| c[1].to_string()) {
                let version = version_re
                    .captures(&text)
                    .map(|c| c[1].to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                let identifier = format!("{name}:{version}");
                return Some(ProjectIdentity {
                    project_type: ProjectType::Python,
                    name,
                    version: Some(version),
                    group_id: None,
                    git_remote: None,
                    git_branch: None,
                    git_commit: None,
                    identifier,
                });
            }
        }
        if folder.join("requirements.txt").is_file() {
            let name = folder_name(folder);
            let identifier = format!("{name}:unknown");
            return Some(ProjectIdentity {
                project_type: ProjectType::Python,
                name,
                version: Some("unknown".to_string()),
                group_id: None,
                git_remote: None,
                git_branch: None,
                git_commit: None,
                identifier,
            });
        }
        None
    }
}

// ---------------------------------------------------------------------------
// RUST
// ---------------------------------------------------------------------------

struct RustDetector;

impl ProjectDetector for RustDetector {
    fn priority(&self) -> i32 {
        10
    }
    fn name(&self) -> &'static str {
        "rust"
    }
    fn can_detect(&self, folder: &Path) -> bool {
        folder.join("Cargo.toml").is_file()
    }
    fn detect(&self, folder: &Path) -> Option<ProjectIdentity> {
        let text = std::fs::read_to_string(folder.join("Cargo.toml")).ok()?;
        let table: toml::Table = text.parse().ok()?;
        let package = table.get("package")?.as_table()?;
        let name = package.get("name")?.as_str()?.to_string();
        let version = package
            .get("version")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();
        let identifier = format!("{name}:{version}");
        Some(ProjectIdentity {
            project_type: ProjectType::Rust,
            name,
            version: Some(version),
            group_id: None,
            git_remote: None,
            git_branch: None,
            git_commit: None,
            identifier,
        })
    }
}

// ---------------------------------------------------------------------------
// GIT
// ---------------------------------------------------------------------------

struct GitDetector;

const GIT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

impl ProjectDetector for GitDetector {
    fn priority(&self) -> i32 {
        5
    }
    fn name(&self) -> &'static str {
        "git"
    }
    fn can_detect(&self, folder: &Path) -> bool {
        folder.join(".git").is_dir()
    }
    fn detect(&self, folder: &Path) -> Option<ProjectIdentity> {
        let remote = run_with_timeout(
            "git",
            &["-C", &folder.to_string_lossy(), "config", "--get", "remote.origin.url"],
            GIT_PROBE_TIMEOUT,
        );
        let branch = run_with_timeout(
            "git",
            &["-C", &folder.to_string_lossy(), "rev-parse", "--abbrev-ref", "HEAD"],
            GIT_PROBE_TIMEOUT,
        )
        .unwrap_or_else(|| "main".to_string());
        let commit = run_with_timeout(
            "git",
            &["-C", &folder.to_string_lossy(), "rev-parse", "--short", "HEAD"],
            GIT_PROBE_TIMEOUT,
        );

        let remote_name = remote
            .as_deref()
            .unwrap_or("unknown")
            .trim_end_matches(".git")
            .rsplit(['/', ':'])
            .next()
            .unwrap_or("unknown")
            .to_string();
        let identifier = format!("{remote_name}@{branch}");

        Some(ProjectIdentity {
            project_type: ProjectType::Generic,
            name: remote_name,
            version: None,
            group_id: None,
            git_remote: remote,
            git_branch: Some(branch),
            git_commit: commit,
            identifier,
        })
    }
}

// ---------------------------------------------------------------------------
// GENERIC
// ---------------------------------------------------------------------------

struct GenericDetector;

/// Source-code extensions counted when deciding whether a folder qualifies
/// as a GENERIC project by file census alone.
const SOURCE_CODE_EXTENSIONS: &[&str] = &[
    "rs", "go", "py", "js", "ts", "jsx", "tsx", "java", "kt", "c", "cpp", "cc", "h", "hpp", "cs",
    "rb", "php", "swift", "scala",
];

impl ProjectDetector for GenericDetector {
    fn priority(&self) -> i32 {
        0
    }
    fn name(&self) -> &'static str {
        "generic"
    }
    fn can_detect(&self, folder: &Path) -> bool {
        folder.join("src").is_dir()
            || folder.join(".gitignore").is_file()
            || count_source_files(folder, 2) >= 3
    }
    fn detect(&self, folder: &Path) -> Option<ProjectIdentity> {
        let name = folder_name(folder);
        Some(ProjectIdentity {
            project_type: ProjectType::Generic,
            name: name.clone(),
            version: None,
            group_id: None,
            git_remote: None,
            git_branch: None,
            git_commit: None,
            identifier: format!("unknown:{name}"),
        })
    }
}

/// Count source-code files directly in `folder` or under `folder/src`
/// (recursing within `src` up to `max_depth`). A file elsewhere in the tree
/// — `docs/`, `examples/`, `tests/` — never counts, matching "directly in
/// the folder or under `src/`".
fn count_source_files(folder: &Path, max_depth: u32) -> usize {
    fn count_files_in(dir: &Path, count: &mut usize) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                if SOURCE_CODE_EXTENSIONS.contains(&ext) {
                    *count += 1;
                }
            }
        }
    }
    fn walk_src(dir: &Path, depth: u32, max_depth: u32, count: &mut usize) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                if depth < max_depth {
                    walk_src(&path, depth + 1, max_depth, count);
                }
            } else if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                if SOURCE_CODE_EXTENSIONS.contains(&ext) {
                    *count += 1;
                }
            }
        }
    }

    let mut count = 0;
    count_files_in(folder, &mut count);
    let src = folder.join("src");
    if src.is_dir() {
        walk_src(&src, 1, max_depth, &mut count);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn maven_identifier_from_pom() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("pom.xml"),
            r#"<project><groupId>com.x</groupId><artifactId>p</artifactId><version>1.0</version></project>"#,
        )
        .unwrap();
        let chain = default_chain();
        let identity = detect_project(&chain, dir.path()).unwrap();
        assert_eq!(identity.identifier, "com.x:p:1.0");
        assert!(matches!(identity.project_type, ProjectType::Maven));
    }

    #[test]
    fn npm_identifier_from_package_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"name":"@o/pkg","version":"2.0.0"}"#,
        )
        .unwrap();
        let chain = default_chain();
        let identity = detect_project(&chain, dir.path()).unwrap();
        assert_eq!(identity.identifier, "@o/pkg:2.0.0");
        assert!(matches!(identity.project_type, ProjectType::Npm));
    }

    #[test]
    fn go_identifier_from_module_directive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("go.mod"), "module github.com/u/m\n\ngo 1.21\n").unwrap();
        let chain = default_chain();
        let identity = detect_project(&chain, dir.path()).unwrap();
        assert_eq!(identity.identifier, "github.com/u/m");
        assert!(matches!(identity.project_type, ProjectType::Go));
    }

    #[test]
    fn generic_ignores_source_files_outside_src() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::create_dir(dir.path().join("examples")).unwrap();
        fs::create_dir(dir.path().join("tests")).unwrap();
        fs::write(dir.path().join("docs/a.py"), "").unwrap();
        fs::write(dir.path().join("examples/b.py"), "").unwrap();
        fs::write(dir.path().join("tests/c.py"), "").unwrap();
        let chain = default_chain();
        assert!(detect_project(&chain, dir.path()).is_none());
    }

    #[test]
    fn generic_identifier_from_src_and_typescript_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/a.ts"), "").unwrap();
        fs::write(dir.path().join("src/b.ts"), "").unwrap();
        fs::write(dir.path().join("src/c.ts"), "").unwrap();
        let chain = default_chain();
        let identity = detect_project(&chain, dir.path()).unwrap();
        assert!(identity.identifier.starts_with("unknown:"));
        assert!(matches!(identity.project_type, ProjectType::Generic));
    }

    #[test]
    fn maven_wins_over_npm_when_both_present() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("pom.xml"),
            r#"<project><groupId>com.x</groupId><artifactId>p</artifactId><version>1.0</version></project>"#,
        )
        .unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name":"x","version":"1.0.0"}"#).unwrap();
        let chain = default_chain();
        let identity = detect_project(&chain, dir.path()).unwrap();
        assert!(matches!(identity.project_type, ProjectType::Maven));
    }

    #[test]
    fn rust_identifier_from_cargo_toml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Cargo.toml"),
            "[package]\nname = \"demo\"\nversion = \"0.3.1\"\n",
        )
        .unwrap();
        let chain = default_chain();
        let identity = detect_project(&chain, dir.path()).unwrap();
        assert_eq!(identity.identifier, "demo:0.3.1");
    }
}
