//! Repository provider: turns a source argument into a local directory path.
//!
//! The analysis core only ever sees the returned path. Remote URLs are
//! shallow-cloned into a temp directory that lives for the run (or survives
//! it with `--keep-clone`).

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoSource {
    Local(PathBuf),
    Remote(String),
}

impl RepoSource {
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://")
            || source.starts_with("https://")
            || source.starts_with("git@")
        {
            RepoSource::Remote(source.to_string())
        } else {
            RepoSource::Local(PathBuf::from(source))
        }
    }
}

/// A local checkout ready for analysis. Holds the temp clone alive until the
/// run finishes.
#[derive(Debug)]
pub struct FetchedRepo {
    path: PathBuf,
    _clone_dir: Option<TempDir>,
}

impl FetchedRepo {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn fetch(source: &RepoSource, keep_clone: bool) -> Result<FetchedRepo> {
    match source {
        RepoSource::Local(path) => {
            if !path.exists() {
                bail!("Repository not found: {}", path.display());
            }
            Ok(FetchedRepo {
                path: path.clone(),
                _clone_dir: None,
            })
        }
        RepoSource::Remote(url) => {
            let clone_dir = tempfile::Builder::new()
                .prefix("skillpack-clone-")
                .tempdir()
                .context("Failed to create clone directory")?;
            let target = clone_dir.path().join("repo");
            info!("Cloning {}...", url);
            clone_repo(url, &target)?;

            if keep_clone {
                let kept = clone_dir.keep();
                info!("Keeping clone at {}", kept.display());
                Ok(FetchedRepo {
                    path: kept.join("repo"),
                    _clone_dir: None,
                })
            } else {
                Ok(FetchedRepo {
                    path: target,
                    _clone_dir: Some(clone_dir),
                })
            }
        }
    }
}

/// Depth-1 clone with the user's git credential configuration.
fn clone_repo(url: &str, target: &Path) -> Result<()> {
    let auth = auth_git2::GitAuthenticator::default();
    let git_config = git2::Config::open_default().or_else(|_| git2::Config::new())?;

    let mut callbacks = git2::RemoteCallbacks::new();
    callbacks.credentials(auth.credentials(&git_config));

    let mut fetch_options = git2::FetchOptions::new();
    fetch_options.remote_callbacks(callbacks);
    fetch_options.depth(1);

    git2::build::RepoBuilder::new()
        .fetch_options(fetch_options)
        .clone(url, target)
        .with_context(|| format!("Failed to clone {}", url))?;
    Ok(())
}
