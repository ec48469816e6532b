//! skillpack - Generate self-contained skill bundles from source repositories
//!
//! Analyzes a repository's filesystem evidence, classifies its project type,
//! extracts and normalizes documentation, and composes a deterministic bundle
//! (SKILL.md instructions, reference docs, optional wrapper scripts) that an
//! external orchestrator can invoke uniformly regardless of the repository's
//! original language or build system.

pub mod cli;
pub mod config;
pub mod contract;
pub mod detector;
pub mod pipeline;
pub mod provider;
pub mod snapshot;
pub mod writer;
