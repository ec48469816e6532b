//! File writer collaborator used by the bundle composer.
//!
//! Abstracting the writes keeps the composer testable and makes the
//! all-or-nothing publish contract checkable without touching a real disk
//! failure.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Persists generated bundle content.
pub trait FileWriter {
    /// Create a directory and all missing parents.
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Write `contents` to `path`, creating or overwriting the file.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Copy a single file from `from` to `to`.
    fn copy(&self, from: &Path, to: &Path) -> Result<()>;

    /// Atomically move `from` to `to`. Both must live on one filesystem.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Mark a file executable where the platform supports it.
    fn make_executable(&self, path: &Path) -> Result<()>;
}

/// The real thing: std::fs with path context on every failure.
pub struct DiskWriter;

impl FileWriter for DiskWriter {
    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        fs::copy(from, to)
            .map(|_| ())
            .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to)
            .with_context(|| format!("Failed to move {} to {}", from.display(), to.display()))
    }

    #[cfg(unix)]
    fn make_executable(&self, path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .permissions();
        perms.set_mode(perms.mode() | 0o755);
        fs::set_permissions(path, perms)
            .with_context(|| format!("Failed to set permissions on {}", path.display()))
    }

    #[cfg(not(unix))]
    fn make_executable(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_disk_writer_roundtrip() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let writer = DiskWriter;

        writer.create_dir_all(&nested).unwrap();
        let file = nested.join("out.txt");
        writer.write(&file, b"content").unwrap();

        assert_eq!(fs::read_to_string(&file).unwrap(), "content");
    }

    #[test]
    fn test_disk_writer_copy() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("dst.txt");
        fs::write(&src, "payload").unwrap();

        DiskWriter.copy(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(&dst).unwrap(), "payload");
    }

    #[test]
    fn test_disk_writer_rename() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("staged");
        let to = dir.path().join("published");
        fs::create_dir(&from).unwrap();
        fs::write(from.join("file.txt"), "x").unwrap();

        DiskWriter.rename(&from, &to).unwrap();
        assert!(!from.exists());
        assert!(to.join("file.txt").is_file());
    }

    #[test]
    fn test_disk_writer_write_to_missing_dir_fails_with_path() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("missing").join("out.txt");

        let err = DiskWriter.write(&target, b"x").unwrap_err();
        assert!(err.to_string().contains("out.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_disk_writer_make_executable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("run.sh");
        fs::write(&file, "#!/bin/sh\n").unwrap();

        DiskWriter.make_executable(&file).unwrap();
        let mode = fs::metadata(&file).unwrap().permissions().mode();
        assert_eq!(mode & 0o100, 0o100, "owner-execute bit should be set");
    }
}
