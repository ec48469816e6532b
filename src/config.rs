use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Bounds the analysis applies to arbitrary repositories. Kept as
/// configuration with conservative defaults rather than hard-coded
/// constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum bytes kept per extracted documentation file. Content beyond
    /// this is truncated with an explicit marker, never silently dropped.
    #[serde(default = "default_max_doc_bytes")]
    pub max_doc_bytes: usize,

    /// Snapshot traversal depth (path components below the root).
    #[serde(default = "default_walk_depth")]
    pub walk_depth: usize,

    /// Depth bound for documentation-candidate matching. Marker evidence is
    /// root-level only regardless of this value.
    #[serde(default = "default_doc_depth")]
    pub doc_depth: usize,

    /// Entry cap for the directory tree rendered into SKILL.md.
    #[serde(default = "default_tree_max_entries")]
    pub tree_max_entries: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_doc_bytes: default_max_doc_bytes(),
            walk_depth: default_walk_depth(),
            doc_depth: default_doc_depth(),
            tree_max_entries: default_tree_max_entries(),
        }
    }
}

fn default_max_doc_bytes() -> usize {
    65_536
}

fn default_walk_depth() -> usize {
    3
}

fn default_doc_depth() -> usize {
    2
}

fn default_tree_max_entries() -> usize {
    50
}

impl Config {
    /// Load config from repo root or user config directory
    #[allow(dead_code)]
    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    /// Load configuration from a specific path, or use default search paths
    pub fn load_with_path(path: Option<String>) -> Result<Self> {
        // If explicit path provided, use it
        if let Some(config_path) = path {
            debug!("Loading config from explicit path: {}", config_path);
            return Self::load_from_path(&config_path);
        }

        // Try working directory first (per-project config)
        if let Ok(config) = Self::load_from_path("skillpack.toml") {
            debug!("Loaded config from ./skillpack.toml");
            return Ok(config);
        }

        // Try user config directory
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("skillpack").join("config.toml");
            if let Ok(config) = Self::load_from_path(&config_path) {
                debug!("Loaded config from {:?}", config_path);
                return Ok(config);
            }
        }

        // Return defaults
        debug!("Using default config");
        Ok(Self::default())
    }

    fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
