use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::LimitsConfig;
use crate::snapshot::RepositorySnapshot;

/// Fixed, ordered canonical-name table for documentation candidates.
/// Filenames match case-insensitively; table order is the candidate ranking.
const CANONICAL_DOCS: &[(&str, &str)] = &[
    ("readme.md", "README.md"),
    ("readme.rst", "README.md"),
    ("readme.txt", "README.md"),
    ("readme", "README.md"),
    ("api.md", "API.md"),
    ("api.rst", "API.md"),
    ("index.md", "API.md"),
    ("contributing.md", "CONTRIBUTING.md"),
    ("contributing.rst", "CONTRIBUTING.md"),
    ("architecture.md", "ARCHITECTURE.md"),
    ("design.md", "ARCHITECTURE.md"),
    ("changelog.md", "CHANGELOG.md"),
    ("changelog.rst", "CHANGELOG.md"),
    ("changelog", "CHANGELOG.md"),
    ("changes.md", "CHANGELOG.md"),
    ("history.md", "CHANGELOG.md"),
];

/// Directories that never appear in the rendered tree.
const TREE_NOISE_DIRS: &[&str] = &[
    ".git",
    ".venv",
    "venv",
    "node_modules",
    "__pycache__",
    ".pytest_cache",
    "target",
    "dist",
    "build",
    ".next",
    ".cache",
    "coverage",
];

/// A documentation candidate with its canonical destination name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocCandidate {
    pub path: PathBuf,
    pub canonical: &'static str,
}

/// Name, description and version pulled from whichever manifest is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectMetadata {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

/// Filesystem facts derived from one snapshot. Pure function of the
/// snapshot: collecting twice yields identical evidence.
#[derive(Debug, Clone)]
pub struct Evidence {
    /// Regular file names at the repository root.
    pub root_files: BTreeSet<String>,
    /// Regular file names directly under `src/`.
    pub src_files: BTreeSet<String>,
    /// Documentation candidates in ranked order.
    pub doc_candidates: Vec<DocCandidate>,
    pub metadata: ProjectMetadata,
    /// Bounded directory tree listing for the instructions body.
    pub tree_listing: String,
    /// Makefile targets, common ones first, file order otherwise.
    pub makefile_targets: Vec<String>,
    /// package.json script names, sorted.
    pub package_scripts: Vec<String>,
}

impl Evidence {
    /// Collect evidence from a snapshot. Read-only; individual unreadable
    /// files degrade to absent evidence rather than failing the run.
    pub fn collect(snapshot: &RepositorySnapshot, limits: &LimitsConfig) -> Self {
        let root_files: BTreeSet<String> = snapshot.root_file_names().into_iter().collect();

        let src_files: BTreeSet<String> = snapshot
            .entries()
            .filter(|(path, meta)| !meta.is_dir && meta.depth == 2 && path.starts_with("src"))
            .filter_map(|(path, _)| path.file_name().and_then(|n| n.to_str()))
            .map(str::to_string)
            .collect();

        let doc_candidates = rank_doc_candidates(snapshot, limits.doc_depth);
        let metadata = collect_metadata(snapshot);
        let tree_listing = render_tree(snapshot, limits.tree_max_entries);
        let makefile_targets = collect_makefile_targets(snapshot);
        let package_scripts = collect_package_scripts(snapshot);

        info!(
            "Collected evidence: {} root files, {} doc candidate(s)",
            root_files.len(),
            doc_candidates.len()
        );

        Self {
            root_files,
            src_files,
            doc_candidates,
            metadata,
            tree_listing,
            makefile_targets,
            package_scripts,
        }
    }
}

/// Scan the snapshot against the canonical table, in table order.
fn rank_doc_candidates(snapshot: &RepositorySnapshot, doc_depth: usize) -> Vec<DocCandidate> {
    let mut candidates = Vec::new();
    for (pattern, canonical) in CANONICAL_DOCS.iter().copied() {
        for (path, meta) in snapshot.entries() {
            if meta.is_dir || meta.depth > doc_depth {
                continue;
            }
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            if name.to_lowercase() == pattern {
                candidates.push(DocCandidate {
                    path: path.clone(),
                    canonical,
                });
            }
        }
    }
    candidates
}

/// Manifest metadata with a deterministic fallback chain:
/// package.json → pyproject.toml → Cargo.toml → directory name.
fn collect_metadata(snapshot: &RepositorySnapshot) -> ProjectMetadata {
    if snapshot.has_root_file("package.json") {
        if let Ok(content) = snapshot.read_to_string(Path::new("package.json")) {
            if let Some(metadata) = parse_package_json(&content) {
                return metadata;
            }
        }
    }

    for manifest in ["pyproject.toml", "Cargo.toml"] {
        if snapshot.has_root_file(manifest) {
            if let Ok(content) = snapshot.read_to_string(Path::new(manifest)) {
                if let Some(metadata) = parse_toml_manifest(&content) {
                    return metadata;
                }
            }
        }
    }

    ProjectMetadata {
        name: directory_name(snapshot.root()),
        description: None,
        version: None,
    }
}

fn parse_package_json(content: &str) -> Option<ProjectMetadata> {
    let value: Value = serde_json::from_str(content).ok()?;
    let name = value.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    Some(ProjectMetadata {
        name: name.to_string(),
        description: value
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|s| !s.is_empty()),
        version: value
            .get("version")
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|s| !s.is_empty()),
    })
}

/// Line-scan a TOML manifest for name/description/version. Good enough for
/// both pyproject.toml and Cargo.toml without caring which tables the keys
/// live in; the first occurrence of each key wins.
fn parse_toml_manifest(content: &str) -> Option<ProjectMetadata> {
    let mut name = None;
    let mut description = None;
    let mut version = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if name.is_none() {
            if let Some(value) = toml_string_value(trimmed, "name") {
                // Reject values that look like section headers or tables
                if !value.contains('[') {
                    name = Some(value);
                }
            }
        }
        if description.is_none() {
            if let Some(value) = toml_string_value(trimmed, "description") {
                description = Some(value);
            }
        }
        if version.is_none() {
            if let Some(value) = toml_string_value(trimmed, "version") {
                version = Some(value);
            }
        }
    }

    let name = name.filter(|n| !n.is_empty())?;
    Some(ProjectMetadata {
        name,
        description: description.filter(|d| !d.is_empty()),
        version: version.filter(|v| !v.is_empty()),
    })
}

fn toml_string_value(line: &str, key: &str) -> Option<String> {
    let rest = line.strip_prefix(key)?.trim_start();
    let rest = rest.strip_prefix('=')?.trim();
    let quote = rest.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let inner = &rest[1..];
    let end = inner.find(quote)?;
    Some(inner[..end].to_string())
}

fn directory_name(root: &Path) -> String {
    if let Ok(canonical) = root.canonicalize() {
        if let Some(name) = canonical.file_name().and_then(|n| n.to_str()) {
            if !name.is_empty() && name != "." && name != ".." {
                return name.to_string();
            }
        }
    }
    if let Some(name) = root.file_name().and_then(|n| n.to_str()) {
        if !name.is_empty() && name != "." && name != ".." {
            return name.to_string();
        }
    }
    "unknown".to_string()
}

/// Render a bounded directory tree: directories before files, names sorted
/// case-insensitively, noise directories and dotfiles skipped.
fn render_tree(snapshot: &RepositorySnapshot, max_entries: usize) -> String {
    use std::collections::BTreeMap;

    let mut children: BTreeMap<PathBuf, Vec<(String, bool)>> = BTreeMap::new();
    for (path, meta) in snapshot.entries() {
        let noisy = path.components().any(|c| {
            let s = c.as_os_str().to_str().unwrap_or("");
            s.starts_with('.') || TREE_NOISE_DIRS.contains(&s)
        });
        if noisy {
            continue;
        }
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        let parent = path.parent().unwrap_or(Path::new("")).to_path_buf();
        children.entry(parent).or_default().push((name, meta.is_dir));
    }

    for entries in children.values_mut() {
        entries.sort_by_key(|(name, is_dir)| (!is_dir, name.to_lowercase()));
    }

    let mut lines = Vec::new();
    let mut count = 0usize;
    walk_tree(
        &children,
        Path::new(""),
        "",
        max_entries,
        &mut count,
        &mut lines,
    );
    lines.join("\n")
}

fn walk_tree(
    children: &std::collections::BTreeMap<PathBuf, Vec<(String, bool)>>,
    dir: &Path,
    prefix: &str,
    max_entries: usize,
    count: &mut usize,
    lines: &mut Vec<String>,
) {
    let entries = match children.get(dir) {
        Some(entries) => entries,
        None => return,
    };
    for (i, (name, is_dir)) in entries.iter().enumerate() {
        if *count >= max_entries {
            lines.push(format!("{}...", prefix));
            return;
        }
        *count += 1;
        let is_last = i == entries.len() - 1;
        let connector = if is_last { "└── " } else { "├── " };
        lines.push(format!("{}{}{}", prefix, connector, name));
        if *is_dir {
            let extension = if is_last { "    " } else { "│   " };
            walk_tree(
                children,
                &dir.join(name),
                &format!("{}{}", prefix, extension),
                max_entries,
                count,
                lines,
            );
        }
    }
}

/// Makefile targets, common targets first, then file order. Bounded to ten.
fn collect_makefile_targets(snapshot: &RepositorySnapshot) -> Vec<String> {
    if !snapshot.has_root_file("Makefile") {
        return Vec::new();
    }
    let content = match snapshot.read_to_string(Path::new("Makefile")) {
        Ok(content) => content,
        Err(err) => {
            debug!("Makefile unreadable: {}", err);
            return Vec::new();
        }
    };

    let Ok(target_re) = Regex::new(r"(?m)^([A-Za-z_][A-Za-z0-9_-]*):") else {
        return Vec::new();
    };
    let mut common = Vec::new();
    let mut rest = Vec::new();
    for cap in target_re.captures_iter(&content) {
        let target = cap[1].to_string();
        if common.contains(&target) || rest.contains(&target) {
            continue;
        }
        if matches!(
            target.as_str(),
            "all" | "build" | "test" | "install" | "clean"
        ) {
            common.push(target);
        } else {
            rest.push(target);
        }
    }
    common.extend(rest);
    common.truncate(10);
    common
}

/// package.json script names. serde_json maps iterate sorted, so the order
/// is stable regardless of file layout.
fn collect_package_scripts(snapshot: &RepositorySnapshot) -> Vec<String> {
    if !snapshot.has_root_file("package.json") {
        return Vec::new();
    }
    let content = match snapshot.read_to_string(Path::new("package.json")) {
        Ok(content) => content,
        Err(err) => {
            debug!("package.json unreadable: {}", err);
            return Vec::new();
        }
    };
    let value: Value = match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(err) => {
            debug!("package.json malformed: {}", err);
            return Vec::new();
        }
    };
    value
        .get("scripts")
        .and_then(Value::as_object)
        .map(|scripts| scripts.keys().cloned().collect())
        .unwrap_or_default()
}
