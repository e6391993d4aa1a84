//! Scratch directory lifecycle for snapshot downloads.
//!
//! The sync feature owns one directory under temporary storage. It is
//! recreated (deleted if present, then created) once per process
//! lifetime before any download begins, so stale files from earlier
//! sessions never collide with new downloads. Each download attempt
//! gets its own timestamp-derived file name inside the directory.

use chrono::Utc;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File extension for downloaded snapshots.
pub const SNAPSHOT_EXTENSION: &str = "geodatabase";

/// Directory preparation or path allocation failed.
///
/// Fatal to the sync feature for this session: without scratch storage
/// no download can land anywhere. Online layers are unaffected.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Could not delete a pre-existing directory.
    #[error("cannot clear scratch directory {path}: {source}")]
    Clear {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Could not create the directory.
    #[error("cannot create scratch directory {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A prepared scratch directory.
///
/// Constructed only through [`ScratchDirectory::prepare`], so holding a
/// value implies the directory exists and started empty.
#[derive(Debug, Clone)]
pub struct ScratchDirectory {
    path: PathBuf,
}

impl ScratchDirectory {
    /// Clears and recreates the directory at `path`.
    ///
    /// Any pre-existing content (stale snapshots from a previous run,
    /// partially written files from a crash) is removed.
    pub fn prepare(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        if path.exists() {
            warn!(path = %path.display(), "clearing pre-existing scratch directory");
            fs::remove_dir_all(&path).map_err(|source| StorageError::Clear {
                path: path.clone(),
                source,
            })?;
        }

        fs::create_dir_all(&path).map_err(|source| StorageError::Create {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), "scratch directory ready");
        Ok(Self { path })
    }

    /// The directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Allocates a unique destination path for one download attempt.
    ///
    /// Names are UTC timestamps at millisecond precision with the
    /// snapshot extension. If two attempts land in the same millisecond
    /// a numeric suffix keeps them distinct.
    pub fn snapshot_path(&self) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string();
        let mut candidate = self
            .path
            .join(format!("{stamp}.{SNAPSHOT_EXTENSION}"));

        let mut suffix = 1u32;
        while candidate.exists() {
            candidate = self
                .path
                .join(format!("{stamp}-{suffix}.{SNAPSHOT_EXTENSION}"));
            suffix += 1;
        }
        candidate
    }

    /// Returns true if `candidate` lies inside this scratch directory.
    ///
    /// Download jobs must only ever write inside the scratch directory;
    /// this backs that invariant check.
    pub fn contains(&self, candidate: &Path) -> bool {
        candidate.starts_with(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prepare_creates_directory() {
        let root = TempDir::new().unwrap();
        let target = root.path().join("sync-scratch");

        let scratch = ScratchDirectory::prepare(&target).unwrap();
        assert!(scratch.path().is_dir());
    }

    #[test]
    fn test_prepare_clears_stale_files() {
        let root = TempDir::new().unwrap();
        let target = root.path().join("sync-scratch");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("old.geodatabase"), b"stale").unwrap();

        let scratch = ScratchDirectory::prepare(&target).unwrap();

        let entries: Vec<_> = fs::read_dir(scratch.path()).unwrap().collect();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_snapshot_path_inside_directory() {
        let root = TempDir::new().unwrap();
        let scratch = ScratchDirectory::prepare(root.path().join("s")).unwrap();

        let path = scratch.snapshot_path();
        assert!(scratch.contains(&path));
        assert_eq!(
            path.extension().and_then(|e| e.to_str()),
            Some(SNAPSHOT_EXTENSION)
        );
    }

    #[test]
    fn test_snapshot_paths_unique_within_same_millisecond() {
        let root = TempDir::new().unwrap();
        let scratch = ScratchDirectory::prepare(root.path().join("s")).unwrap();

        let first = scratch.snapshot_path();
        fs::write(&first, b"").unwrap();
        let second = scratch.snapshot_path();
        fs::write(&second, b"").unwrap();
        let third = scratch.snapshot_path();

        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_ne!(first, third);
    }

    #[test]
    fn test_contains_rejects_outside_path() {
        let root = TempDir::new().unwrap();
        let scratch = ScratchDirectory::prepare(root.path().join("s")).unwrap();
        assert!(!scratch.contains(Path::new("/tmp/elsewhere.geodatabase")));
    }

    #[test]
    fn test_prepare_fails_when_parent_is_a_file() {
        let root = TempDir::new().unwrap();
        let blocker = root.path().join("blocker");
        fs::write(&blocker, b"file, not dir").unwrap();

        let result = ScratchDirectory::prepare(blocker.join("child"));
        assert!(matches!(result, Err(StorageError::Create { .. })));
    }
}
