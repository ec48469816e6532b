use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::detector::{self, ProjectType};
use crate::pipeline::collector::Evidence;
use crate::pipeline::composer::{self, ComposeOptions};
use crate::pipeline::extractor;
use crate::provider::{self, RepoSource};
use crate::snapshot::RepositorySnapshot;
use crate::writer::DiskWriter;

pub fn run(
    source: String,
    output: Option<String>,
    project_type: Option<String>,
    with_wrapper: bool,
    vendor: bool,
    keep_clone: bool,
    config_path: Option<String>,
) -> Result<()> {
    let config = Config::load_with_path(config_path)?;

    // Validate the override before any fetch happens
    let type_override = match project_type {
        Some(ref name) => {
            let project_type: ProjectType = name.parse()?;
            info!("Using specified type: {}", project_type.as_str());
            Some(project_type)
        }
        None => None,
    };

    let repo_source = RepoSource::parse(&source);
    let repo = provider::fetch(&repo_source, keep_clone)?;
    info!("Analyzing {}", repo.path().display());

    let snapshot = RepositorySnapshot::capture(repo.path(), config.limits.walk_depth)?;
    let evidence = Evidence::collect(&snapshot, &config.limits);

    let profile = detector::classify_with_type(&evidence, type_override);
    info!("Detected type: {}", profile.primary_type.as_str());
    if let Some(entry) = profile.entry_points.first() {
        info!("Suggested entry point: {}", entry);
    }

    let docs = extractor::extract(&snapshot, &evidence, &config.limits);

    let output_dir = match output {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from("skills").join(composer::slug(&evidence.metadata.name)),
    };
    let options = ComposeOptions {
        output_dir,
        with_wrapper,
        vendor,
    };

    let bundle = composer::compose(&profile, &evidence, docs, &options);
    composer::publish(&bundle, &options, snapshot.root(), &DiskWriter)?;

    println!("✓ Skill bundle generated at {}", options.output_dir.display());
    println!("  - SKILL.md");
    println!("  - references/ ({} files)", bundle.references.len());
    if with_wrapper {
        println!("  - scripts/");
    }
    if vendor {
        println!("  - vendor/");
    }

    Ok(())
}
