// End-to-end integration tests
// Coverage: full pipeline from snapshot capture → evidence collection →
// classification → documentation extraction → bundle composition and publish.
// Tests multiple project types, precedence, idempotence, and failure modes.

use anyhow::Result;
use skillpack::config::{Config, LimitsConfig};
use skillpack::detector::{self, ProjectType};
use skillpack::pipeline::collector::Evidence;
use skillpack::pipeline::composer::{self, ComposeOptions};
use skillpack::pipeline::extractor;
use skillpack::snapshot::RepositorySnapshot;
use skillpack::writer::DiskWriter;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// Create a Python project with a README and a container descriptor
fn create_python_container_project(base: &Path) -> Result<PathBuf> {
    let project_dir = base.join("webapi");
    fs::create_dir_all(&project_dir)?;

    fs::write(
        project_dir.join("pyproject.toml"),
        r#"[project]
name = "webapi"
version = "2.0.0"
description = "A small web API"
"#,
    )?;
    fs::write(
        project_dir.join("README.md"),
        "# webapi\n\nA compact HTTP API service used as a fixture for full pipeline tests.\n\n## Usage\n\n```bash\npython main.py\n```\n",
    )?;
    fs::write(project_dir.join("Dockerfile"), "FROM python:3.11-slim\n")?;
    fs::write(project_dir.join("main.py"), "print('serving')\n")?;
    fs::write(project_dir.join("requirements.txt"), "flask\n")?;
    Ok(project_dir)
}

fn generate_bundle(repo: &Path, output: &Path, with_wrapper: bool, vendor: bool) -> Result<()> {
    let limits = LimitsConfig::default();
    let snapshot = RepositorySnapshot::capture(repo, limits.walk_depth)?;
    let evidence = Evidence::collect(&snapshot, &limits);
    let profile = detector::classify(&evidence);
    let docs = extractor::extract(&snapshot, &evidence, &limits);
    let options = ComposeOptions {
        output_dir: output.to_path_buf(),
        with_wrapper,
        vendor,
    };
    let bundle = composer::compose(&profile, &evidence, docs, &options);
    composer::publish(&bundle, &options, repo, &DiskWriter)
}

// ============================================================================
// Classification through the full pipeline
// ============================================================================

#[test]
fn test_python_with_container_classifies_python() {
    let base = TempDir::new().unwrap();
    let repo = create_python_container_project(base.path()).unwrap();

    let limits = LimitsConfig::default();
    let snapshot = RepositorySnapshot::capture(&repo, limits.walk_depth).unwrap();
    let evidence = Evidence::collect(&snapshot, &limits);
    let profile = detector::classify(&evidence);

    assert_eq!(profile.primary_type, ProjectType::Python);
    assert!(profile.containerized);
    assert_eq!(profile.entry_points[0], "main.py");
}

#[test]
fn test_classification_deterministic_across_runs() {
    let base = TempDir::new().unwrap();
    let repo = create_python_container_project(base.path()).unwrap();

    let limits = LimitsConfig::default();
    let snapshot = RepositorySnapshot::capture(&repo, limits.walk_depth).unwrap();
    let first = detector::classify(&Evidence::collect(&snapshot, &limits));
    let second = detector::classify(&Evidence::collect(&snapshot, &limits));
    assert_eq!(first, second);
}

// ============================================================================
// Bundle layout
// ============================================================================

#[test]
fn test_bundle_layout_with_wrapper() {
    let base = TempDir::new().unwrap();
    let repo = create_python_container_project(base.path()).unwrap();
    let out = TempDir::new().unwrap();
    let output = out.path().join("webapi-skill");

    generate_bundle(&repo, &output, true, false).unwrap();

    assert!(output.join("SKILL.md").is_file());
    assert!(output.join("references").join("README.md").is_file());
    assert!(output.join("scripts").join("entrypoint.py").is_file());
    assert!(output.join("scripts").join("init.sh").is_file());
    assert!(!output.join("vendor").exists());

    let skill = fs::read_to_string(output.join("SKILL.md")).unwrap();
    assert!(skill.contains("name: webapi"));
    assert!(skill.contains("project_type: python"));
    assert!(skill.contains("python, containerized"));
    assert!(skill.contains("entry_point: main.py"));
}

#[test]
fn test_bundle_vendor_copy() {
    let base = TempDir::new().unwrap();
    let repo = create_python_container_project(base.path()).unwrap();
    let out = TempDir::new().unwrap();
    let output = out.path().join("bundle");

    generate_bundle(&repo, &output, false, true).unwrap();

    assert!(output.join("vendor").join("pyproject.toml").is_file());
    assert!(output.join("vendor").join("main.py").is_file());
    assert_eq!(
        fs::read_to_string(output.join("vendor").join("main.py")).unwrap(),
        "print('serving')\n"
    );
}

#[test]
fn test_empty_evidence_produces_generic_bundle() {
    let repo = TempDir::new().unwrap();
    fs::write(repo.path().join("unrelated.bin"), "opaque").unwrap();
    let out = TempDir::new().unwrap();
    let output = out.path().join("bundle");

    generate_bundle(repo.path(), &output, false, false).unwrap();

    let skill = fs::read_to_string(output.join("SKILL.md")).unwrap();
    assert!(skill.contains("project_type: unknown"));
    assert!(skill.contains("Inspect the repository layout"));
    assert!(output.join("references").is_dir());
    assert_eq!(fs::read_dir(output.join("references")).unwrap().count(), 0);
}

// ============================================================================
// Documentation extraction through the pipeline
// ============================================================================

#[test]
fn test_two_readme_variants_get_distinct_names() {
    let repo = TempDir::new().unwrap();
    fs::write(repo.path().join("README.md"), "# primary readme file\n").unwrap();
    fs::write(repo.path().join("readme.txt"), "secondary readme file\n").unwrap();
    let out = TempDir::new().unwrap();
    let output = out.path().join("bundle");

    generate_bundle(repo.path(), &output, false, false).unwrap();

    assert!(output.join("references").join("README.md").is_file());
    assert!(output.join("references").join("README-1.md").is_file());
}

#[test]
fn test_truncation_marker_survives_to_disk() {
    let repo = TempDir::new().unwrap();
    fs::write(repo.path().join("README.md"), "z".repeat(200_000)).unwrap();
    let out = TempDir::new().unwrap();
    let output = out.path().join("bundle");

    generate_bundle(repo.path(), &output, false, false).unwrap();

    let readme = fs::read_to_string(output.join("references").join("README.md")).unwrap();
    assert!(readme.contains("[content truncated]"));
}

// ============================================================================
// Idempotence and failure modes
// ============================================================================

#[test]
fn test_regeneration_is_byte_identical() {
    let base = TempDir::new().unwrap();
    let repo = create_python_container_project(base.path()).unwrap();
    let out = TempDir::new().unwrap();
    let first = out.path().join("first");
    let second = out.path().join("second");

    generate_bundle(&repo, &first, true, false).unwrap();
    generate_bundle(&repo, &second, true, false).unwrap();

    for rel in [
        "SKILL.md",
        "references/README.md",
        "scripts/entrypoint.py",
        "scripts/init.sh",
    ] {
        assert_eq!(
            fs::read(first.join(rel)).unwrap(),
            fs::read(second.join(rel)).unwrap(),
            "{} should be byte-identical",
            rel
        );
    }
}

#[test]
fn test_missing_repository_is_input_error() {
    let out = TempDir::new().unwrap();
    let output = out.path().join("bundle");

    let result = generate_bundle(Path::new("/no/such/repo-xyz"), &output, false, false);
    assert!(result.is_err());
    assert!(!output.exists(), "no output on input error");
}

#[test]
fn test_existing_output_refused_without_partial_writes() {
    let base = TempDir::new().unwrap();
    let repo = create_python_container_project(base.path()).unwrap();
    let out = TempDir::new().unwrap();
    let output = out.path().join("bundle");
    fs::create_dir(&output).unwrap();
    fs::write(output.join("keep.txt"), "preexisting").unwrap();

    let err = generate_bundle(&repo, &output, false, false).unwrap_err();
    assert!(err.to_string().contains("already exists"));
    // Target untouched
    assert_eq!(
        fs::read_to_string(output.join("keep.txt")).unwrap(),
        "preexisting"
    );
    assert!(!output.join("SKILL.md").exists());
}

// ============================================================================
// Config interaction
// ============================================================================

#[test]
fn test_config_limits_flow_through_pipeline() {
    let repo = TempDir::new().unwrap();
    fs::write(repo.path().join("README.md"), "a".repeat(500)).unwrap();
    let config_file = repo.path().join("limits.toml");
    fs::write(&config_file, "[limits]\nmax_doc_bytes = 100\n").unwrap();

    let config =
        Config::load_with_path(Some(config_file.to_str().unwrap().to_string())).unwrap();
    let snapshot =
        RepositorySnapshot::capture(repo.path(), config.limits.walk_depth).unwrap();
    let evidence = Evidence::collect(&snapshot, &config.limits);
    let docs = extractor::extract(&snapshot, &evidence, &config.limits);

    assert_eq!(docs.len(), 1);
    assert!(docs[0].content.starts_with(&"a".repeat(100)));
    assert!(docs[0].content.contains("[content truncated]"));
}
