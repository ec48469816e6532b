//! Immutable view of a repository tree at analysis time.

use anyhow::{bail, Context, Result};
use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Metadata recorded per tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    pub is_dir: bool,
    pub size: u64,
    /// Path components below the repository root (root-level entries are 1).
    pub depth: usize,
}

/// A bounded-depth capture of a repository's directory tree.
///
/// Captured once per run and never mutated afterwards; everything downstream
/// (evidence, classification, extraction) is a function of this value plus
/// file contents read through [`RepositorySnapshot::read`].
#[derive(Debug, Clone)]
pub struct RepositorySnapshot {
    root: PathBuf,
    entries: BTreeMap<PathBuf, EntryMeta>,
}

impl RepositorySnapshot {
    /// Walk `root` down to `max_depth` components and record what exists.
    ///
    /// Unreadable entries are skipped, not fatal; partial evidence is valid
    /// evidence. A missing or non-directory root is an input error.
    pub fn capture(root: &Path, max_depth: usize) -> Result<Self> {
        if !root.exists() {
            bail!("Repository path does not exist: {}", root.display());
        }
        if !root.is_dir() {
            bail!("Repository path is not a directory: {}", root.display());
        }

        let mut entries = BTreeMap::new();
        let walker = WalkBuilder::new(root).max_depth(Some(max_depth)).build();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    debug!("Skipping unreadable entry: {}", err);
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue; // the root itself
            }
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_path_buf();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            entries.insert(
                rel,
                EntryMeta {
                    is_dir,
                    size,
                    depth: entry.depth(),
                },
            );
        }

        debug!(
            "Captured {} entries under {}",
            entries.len(),
            root.display()
        );
        Ok(Self {
            root: root.to_path_buf(),
            entries,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All captured entries, keyed by repository-relative path (sorted).
    pub fn entries(&self) -> impl Iterator<Item = (&PathBuf, &EntryMeta)> {
        self.entries.iter()
    }

    /// Whether a regular file with exactly this name exists at the root.
    pub fn has_root_file(&self, name: &str) -> bool {
        self.entries
            .get(Path::new(name))
            .map(|meta| !meta.is_dir)
            .unwrap_or(false)
    }

    /// Names of the regular files at the repository root.
    pub fn root_file_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, meta)| meta.depth == 1 && !meta.is_dir)
            .filter_map(|(path, _)| path.file_name().and_then(|n| n.to_str()))
            .map(str::to_string)
            .collect()
    }

    /// Read a captured file's raw bytes by repository-relative path.
    pub fn read(&self, rel: &Path) -> Result<Vec<u8>> {
        fs::read(self.root.join(rel)).with_context(|| format!("Failed to read {}", rel.display()))
    }

    /// Read a captured file as UTF-8 text (lossy) by repository-relative path.
    pub fn read_to_string(&self, rel: &Path) -> Result<String> {
        let bytes = self.read(rel)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
