//! Project classification from collected evidence.
//!
//! The detection table is an explicit ordered sequence evaluated top to
//! bottom; the first matching rule wins. That total order is the whole
//! tie-break policy: language manifests come before the container
//! descriptor, which is a secondary, non-exclusive attribute (a repo can be
//! both "python" and containerized).

use std::str::FromStr;

use anyhow::{bail, Result};

use crate::pipeline::collector::Evidence;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectType {
    Python,
    Node,
    Rust,
    Go,
    Ruby,
    Java,
    Container,
    Unknown,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Python => "python",
            ProjectType::Node => "node",
            ProjectType::Rust => "rust",
            ProjectType::Go => "go",
            ProjectType::Ruby => "ruby",
            ProjectType::Java => "java",
            ProjectType::Container => "container",
            ProjectType::Unknown => "unknown",
        }
    }

    /// Language name for language-backed types; None for container/unknown.
    pub fn language(&self) -> Option<&'static str> {
        match self {
            ProjectType::Python => Some("python"),
            ProjectType::Node => Some("javascript"),
            ProjectType::Rust => Some("rust"),
            ProjectType::Go => Some("go"),
            ProjectType::Ruby => Some("ruby"),
            ProjectType::Java => Some("java"),
            ProjectType::Container | ProjectType::Unknown => None,
        }
    }
}

impl FromStr for ProjectType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "python" | "py" => Ok(ProjectType::Python),
            "node" | "javascript" | "js" | "npm" => Ok(ProjectType::Node),
            "rust" | "rs" => Ok(ProjectType::Rust),
            "go" | "golang" => Ok(ProjectType::Go),
            "ruby" | "rb" => Ok(ProjectType::Ruby),
            "java" => Ok(ProjectType::Java),
            "container" | "docker" => Ok(ProjectType::Container),
            "unknown" | "generic" => Ok(ProjectType::Unknown),
            _ => bail!("Unknown project type: {}", s),
        }
    }
}

/// Ordered detection rules. A marker ending in a leading `*` matches by
/// suffix (e.g. `*.gemspec`); everything else matches the exact file name.
const DETECTION_RULES: &[(ProjectType, &[&str])] = &[
    (
        ProjectType::Python,
        &["pyproject.toml", "setup.py", "requirements.txt", "Pipfile"],
    ),
    (
        ProjectType::Node,
        &[
            "package.json",
            "package-lock.json",
            "yarn.lock",
            "pnpm-lock.yaml",
        ],
    ),
    (ProjectType::Rust, &["Cargo.toml", "Cargo.lock"]),
    (ProjectType::Go, &["go.mod", "go.sum"]),
    (ProjectType::Ruby, &["Gemfile", "Gemfile.lock", "*.gemspec"]),
    (
        ProjectType::Java,
        &["pom.xml", "build.gradle", "build.gradle.kts"],
    ),
];

/// Cap on suggested entry points across all sources.
const MAX_ENTRY_POINTS: usize = 15;

const CONTAINER_MARKERS: &[&str] = &[
    "Dockerfile",
    "Containerfile",
    "docker-compose.yml",
    "docker-compose.yaml",
];

/// Conventional entry-point file names per type, in priority order. Checked
/// at the repository root, then under `src/`.
const ENTRY_POINTS: &[(ProjectType, &[&str])] = &[
    (
        ProjectType::Python,
        &["main.py", "app.py", "cli.py", "__main__.py"],
    ),
    (ProjectType::Node, &["index.js", "server.js", "index.ts"]),
    (ProjectType::Rust, &["main.rs"]),
    (ProjectType::Go, &["main.go"]),
    (ProjectType::Ruby, &["main.rb", "app.rb"]),
];

/// The classifier's structured conclusion about a repository.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectProfile {
    pub primary_type: ProjectType,
    pub containerized: bool,
    /// Suggested invocations: conventional files first, then command-shaped
    /// entries (`make <target>`, `npm run <script>`). May be empty.
    pub entry_points: Vec<String>,
    pub package_manager: Option<String>,
    pub language: Option<String>,
}

/// Classify evidence into a profile. Deterministic, never fails; the worst
/// case is the unknown profile.
pub fn classify(evidence: &Evidence) -> ProjectProfile {
    classify_with_type(evidence, None)
}

/// Classify with an explicit type override (e.g. from `--type`). The rule
/// table is skipped, but containerization and the secondary attributes are
/// still inferred from evidence.
pub fn classify_with_type(
    evidence: &Evidence,
    override_type: Option<ProjectType>,
) -> ProjectProfile {
    let containerized = CONTAINER_MARKERS
        .iter()
        .any(|marker| evidence.root_files.contains(*marker));

    let matched = override_type.or_else(|| {
        DETECTION_RULES
            .iter()
            .find(|(_, markers)| markers.iter().any(|m| marker_present(evidence, m)))
            .map(|(project_type, _)| *project_type)
    });

    let primary_type = match matched {
        Some(project_type) => project_type,
        None if containerized => ProjectType::Container,
        None => ProjectType::Unknown,
    };

    ProjectProfile {
        primary_type,
        containerized,
        entry_points: infer_entry_points(evidence, primary_type),
        package_manager: infer_package_manager(evidence, primary_type),
        language: primary_type.language().map(str::to_string),
    }
}

fn marker_present(evidence: &Evidence, marker: &str) -> bool {
    if let Some(suffix) = marker.strip_prefix('*') {
        evidence.root_files.iter().any(|f| f.ends_with(suffix))
    } else {
        evidence.root_files.contains(marker)
    }
}

fn infer_entry_points(evidence: &Evidence, primary_type: ProjectType) -> Vec<String> {
    let mut entry_points = Vec::new();

    if let Some((_, names)) = ENTRY_POINTS.iter().find(|(t, _)| *t == primary_type) {
        for name in *names {
            if evidence.root_files.contains(*name) {
                entry_points.push((*name).to_string());
            } else if evidence.src_files.contains(*name) {
                entry_points.push(format!("src/{}", name));
            }
        }
    }

    for target in &evidence.makefile_targets {
        entry_points.push(format!("make {}", target));
    }
    if primary_type == ProjectType::Node {
        for script in &evidence.package_scripts {
            entry_points.push(format!("npm run {}", script));
        }
    }

    entry_points.truncate(MAX_ENTRY_POINTS);
    entry_points
}

fn infer_package_manager(evidence: &Evidence, primary_type: ProjectType) -> Option<String> {
    let has = |name: &str| evidence.root_files.contains(name);
    let manager = match primary_type {
        ProjectType::Python => {
            if has("Pipfile") {
                "pipenv"
            } else if has("poetry.lock") {
                "poetry"
            } else if has("uv.lock") {
                "uv"
            } else {
                "pip"
            }
        }
        ProjectType::Node => {
            if has("yarn.lock") {
                "yarn"
            } else if has("pnpm-lock.yaml") {
                "pnpm"
            } else {
                "npm"
            }
        }
        ProjectType::Rust => "cargo",
        ProjectType::Go => "go",
        ProjectType::Ruby => "bundler",
        ProjectType::Java => {
            if has("pom.xml") {
                "maven"
            } else {
                "gradle"
            }
        }
        ProjectType::Container | ProjectType::Unknown => return None,
    };
    Some(manager.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use crate::snapshot::RepositorySnapshot;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn evidence_for(dir: &Path) -> Evidence {
        let snapshot = RepositorySnapshot::capture(dir, 3).unwrap();
        Evidence::collect(&snapshot, &LimitsConfig::default())
    }

    #[test]
    fn test_from_str_aliases() {
        assert_eq!(ProjectType::from_str("python").unwrap(), ProjectType::Python);
        assert_eq!(ProjectType::from_str("py").unwrap(), ProjectType::Python);
        assert_eq!(ProjectType::from_str("JS").unwrap(), ProjectType::Node);
        assert_eq!(ProjectType::from_str("golang").unwrap(), ProjectType::Go);
        assert_eq!(ProjectType::from_str("docker").unwrap(), ProjectType::Container);
        assert!(ProjectType::from_str("cobol").is_err());
    }

    #[test]
    fn test_detect_python() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("pyproject.toml"), "[project]\nname = \"t\"").unwrap();

        let profile = classify(&evidence_for(dir.path()));
        assert_eq!(profile.primary_type, ProjectType::Python);
        assert_eq!(profile.language.as_deref(), Some("python"));
        assert_eq!(profile.package_manager.as_deref(), Some("pip"));
        assert!(!profile.containerized);
    }

    #[test]
    fn test_detect_rust() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"t\"").unwrap();

        let profile = classify(&evidence_for(dir.path()));
        assert_eq!(profile.primary_type, ProjectType::Rust);
        assert_eq!(profile.package_manager.as_deref(), Some("cargo"));
    }

    #[test]
    fn test_detect_ruby_gemspec_suffix() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("mygem.gemspec"), "Gem::Specification").unwrap();

        let profile = classify(&evidence_for(dir.path()));
        assert_eq!(profile.primary_type, ProjectType::Ruby);
        assert_eq!(profile.package_manager.as_deref(), Some("bundler"));
    }

    #[test]
    fn test_python_beats_container() {
        // First-match precedence: language manifests before the container
        // descriptor, which stays visible as a secondary attribute.
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("requirements.txt"), "flask\n").unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM python:3.11\n").unwrap();

        let profile = classify(&evidence_for(dir.path()));
        assert_eq!(profile.primary_type, ProjectType::Python);
        assert!(profile.containerized);
    }

    #[test]
    fn test_python_beats_node() {
        // Both manifests present: the earlier rule wins.
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("setup.py"), "setup()").unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();

        let profile = classify(&evidence_for(dir.path()));
        assert_eq!(profile.primary_type, ProjectType::Python);
    }

    #[test]
    fn test_container_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM alpine\n").unwrap();

        let profile = classify(&evidence_for(dir.path()));
        assert_eq!(profile.primary_type, ProjectType::Container);
        assert!(profile.containerized);
        assert!(profile.language.is_none());
        assert!(profile.package_manager.is_none());
    }

    #[test]
    fn test_unknown_when_nothing_matches() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("random.dat"), "bytes").unwrap();

        let profile = classify(&evidence_for(dir.path()));
        assert_eq!(profile.primary_type, ProjectType::Unknown);
        assert!(profile.entry_points.is_empty());
        assert!(profile.package_manager.is_none());
    }

    #[test]
    fn test_entry_point_priority_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("requirements.txt"), "").unwrap();
        fs::write(dir.path().join("app.py"), "").unwrap();
        fs::write(dir.path().join("main.py"), "").unwrap();

        let profile = classify(&evidence_for(dir.path()));
        // main.py outranks app.py regardless of filesystem order
        assert_eq!(profile.entry_points[0], "main.py");
        assert_eq!(profile.entry_points[1], "app.py");
    }

    #[test]
    fn test_entry_point_under_src() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"t\"").unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src").join("main.rs"), "fn main() {}").unwrap();

        let profile = classify(&evidence_for(dir.path()));
        assert_eq!(profile.entry_points[0], "src/main.rs");
    }

    #[test]
    fn test_entry_points_include_make_targets() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("go.mod"), "module demo").unwrap();
        fs::write(dir.path().join("Makefile"), "build:\n\tgo build\n").unwrap();

        let profile = classify(&evidence_for(dir.path()));
        assert!(profile.entry_points.contains(&"make build".to_string()));
    }

    #[test]
    fn test_node_entry_points_include_scripts() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"name": "x", "scripts": {"start": "node index.js"}}"#,
        )
        .unwrap();
        fs::write(dir.path().join("index.js"), "").unwrap();

        let profile = classify(&evidence_for(dir.path()));
        assert_eq!(profile.entry_points[0], "index.js");
        assert!(profile.entry_points.contains(&"npm run start".to_string()));
    }

    #[test]
    fn test_package_manager_lockfile_refinement() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        fs::write(dir.path().join("yarn.lock"), "").unwrap();

        let profile = classify(&evidence_for(dir.path()));
        assert_eq!(profile.package_manager.as_deref(), Some("yarn"));

        let dir2 = TempDir::new().unwrap();
        fs::write(dir2.path().join("requirements.txt"), "").unwrap();
        fs::write(dir2.path().join("Pipfile"), "").unwrap();
        let profile2 = classify(&evidence_for(dir2.path()));
        assert_eq!(profile2.package_manager.as_deref(), Some("pipenv"));
    }

    #[test]
    fn test_java_gradle_vs_maven() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("build.gradle"), "").unwrap();
        let profile = classify(&evidence_for(dir.path()));
        assert_eq!(profile.primary_type, ProjectType::Java);
        assert_eq!(profile.package_manager.as_deref(), Some("gradle"));
    }

    #[test]
    fn test_type_override_skips_rule_table() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name": "x"}"#).unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM node\n").unwrap();

        let evidence = evidence_for(dir.path());
        let profile = classify_with_type(&evidence, Some(ProjectType::Python));
        assert_eq!(profile.primary_type, ProjectType::Python);
        assert_eq!(profile.package_manager.as_deref(), Some("pip"));
        // Secondary attributes still come from evidence
        assert!(profile.containerized);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("pyproject.toml"), "name = \"t\"").unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM python").unwrap();
        fs::write(dir.path().join("main.py"), "").unwrap();

        let evidence = evidence_for(dir.path());
        assert_eq!(classify(&evidence), classify(&evidence));
    }
}
