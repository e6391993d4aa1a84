//! Local geodatabase file: snapshot document format and loader.
//!
//! A snapshot is a self-contained JSON document written by the export
//! job. The loader parses it, enumerates feature tables, and surfaces
//! the geometry-bearing subset as map layer candidates. A file that
//! cannot be read or parsed (truncated download, crashed process) is
//! reported as corrupt; the remedy is a fresh download, never in-place
//! repair.

use crate::extent::Extent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Snapshot document version this loader understands.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// The downloaded file is unusable.
///
/// Not recoverable in place: callers should discard the file and run a
/// fresh download.
#[derive(Debug, thiserror::Error)]
pub enum CorruptStoreError {
    /// File missing or unreadable.
    #[error("cannot read geodatabase at {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File contents are not a valid snapshot document.
    #[error("invalid geodatabase at {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    /// Document written by an incompatible format version.
    #[error("geodatabase at {path} has format version {found}, expected {expected}")]
    VersionMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
}

/// One feature table inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    /// Table name (matches the service layer name).
    pub name: String,
    /// Whether rows in this table carry geometry.
    #[serde(rename = "hasGeometry")]
    pub has_geometry: bool,
    /// Feature rows, kept as raw JSON objects.
    #[serde(default)]
    pub features: Vec<serde_json::Value>,
}

impl FeatureTable {
    /// Number of features in the table.
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }
}

/// Presentation ordering for geometry tables surfaced as layers.
///
/// The service display convention renders layers in reverse of their
/// declaration order so higher-priority layers draw last (on top). That
/// is a presentation policy, not a structural property of the snapshot,
/// so it is configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayerOrder {
    /// Reverse of declaration order (the inherited display convention).
    #[default]
    ReverseDeclared,
    /// Declaration order as-is.
    Declared,
}

/// On-disk snapshot document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    /// Format version.
    pub version: u32,
    /// When the server generated the snapshot.
    #[serde(rename = "generatedAt")]
    pub generated_at: DateTime<Utc>,
    /// Region the snapshot covers.
    pub extent: Extent,
    /// Feature tables in service declaration order.
    pub tables: Vec<FeatureTable>,
}

/// A materialized local geodatabase.
///
/// Created when a download job succeeds and replaced wholesale on the
/// next successful sync; the previous instance is discarded, never
/// merged.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalGeodatabase {
    path: PathBuf,
    document: SnapshotDocument,
}

impl LocalGeodatabase {
    /// Opens and parses the snapshot file at `path`.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CorruptStoreError> {
        let path = path.as_ref().to_path_buf();

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| CorruptStoreError::Unreadable {
                path: path.clone(),
                source,
            })?;

        let document: SnapshotDocument =
            serde_json::from_slice(&bytes).map_err(|e| {
                warn!(path = %path.display(), error = %e, "geodatabase parse failed");
                CorruptStoreError::Invalid {
                    path: path.clone(),
                    reason: e.to_string(),
                }
            })?;

        if document.version != SNAPSHOT_FORMAT_VERSION {
            return Err(CorruptStoreError::VersionMismatch {
                path,
                found: document.version,
                expected: SNAPSHOT_FORMAT_VERSION,
            });
        }

        info!(
            path = %path.display(),
            tables = document.tables.len(),
            "geodatabase loaded"
        );
        Ok(Self { path, document })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Region this snapshot covers.
    pub fn extent(&self) -> Extent {
        self.document.extent
    }

    /// All feature tables, in service declaration order.
    ///
    /// Includes tables without geometry; those stay queryable offline
    /// but are never surfaced as map layers.
    pub fn feature_tables(&self) -> &[FeatureTable] {
        &self.document.tables
    }

    /// Geometry-bearing tables in the requested presentation order.
    ///
    /// This is the layer set a map surface should render. An empty
    /// snapshot yields an empty list, not an error.
    pub fn layer_candidates(&self, order: LayerOrder) -> Vec<&FeatureTable> {
        let geometry_tables = self.document.tables.iter().filter(|t| t.has_geometry);
        match order {
            LayerOrder::Declared => geometry_tables.collect(),
            LayerOrder::ReverseDeclared => {
                let mut tables: Vec<_> = geometry_tables.collect();
                tables.reverse();
                tables
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_document(table_names: &[(&str, bool)]) -> SnapshotDocument {
        SnapshotDocument {
            version: SNAPSHOT_FORMAT_VERSION,
            generated_at: Utc::now(),
            extent: Extent::new(-122.5, 37.7, -122.4, 37.8).unwrap(),
            tables: table_names
                .iter()
                .map(|(name, has_geometry)| FeatureTable {
                    name: name.to_string(),
                    has_geometry: *has_geometry,
                    features: vec![serde_json::json!({"objectId": 1})],
                })
                .collect(),
        }
    }

    async fn write_document(dir: &TempDir, document: &SnapshotDocument) -> PathBuf {
        let path = dir.path().join("snapshot.geodatabase");
        tokio::fs::write(&path, serde_json::to_vec(document).unwrap())
            .await
            .unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_valid_snapshot() {
        let dir = TempDir::new().unwrap();
        let document = sample_document(&[("Incidents", true), ("Notes", false)]);
        let path = write_document(&dir, &document).await;

        let gdb = LocalGeodatabase::load(&path).await.unwrap();
        assert_eq!(gdb.feature_tables().len(), 2);
        assert_eq!(gdb.feature_tables()[0].name, "Incidents");
        assert_eq!(gdb.feature_tables()[0].feature_count(), 1);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = LocalGeodatabase::load(dir.path().join("absent.geodatabase"))
            .await
            .unwrap_err();
        assert!(matches!(err, CorruptStoreError::Unreadable { .. }));
    }

    #[tokio::test]
    async fn test_load_truncated_file_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.geodatabase");
        tokio::fs::write(&path, br#"{"version": 1, "tab"#)
            .await
            .unwrap();

        let err = LocalGeodatabase::load(&path).await.unwrap_err();
        assert!(matches!(err, CorruptStoreError::Invalid { .. }));
    }

    #[tokio::test]
    async fn test_load_version_mismatch() {
        let dir = TempDir::new().unwrap();
        let mut document = sample_document(&[]);
        document.version = 99;
        let path = write_document(&dir, &document).await;

        let err = LocalGeodatabase::load(&path).await.unwrap_err();
        assert!(matches!(
            err,
            CorruptStoreError::VersionMismatch {
                found: 99,
                expected: SNAPSHOT_FORMAT_VERSION,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_layer_candidates_reverse_declared() {
        let dir = TempDir::new().unwrap();
        let document = sample_document(&[
            ("A", true),
            ("B", false),
            ("C", true),
            ("D", true),
        ]);
        let path = write_document(&dir, &document).await;
        let gdb = LocalGeodatabase::load(&path).await.unwrap();

        let layers = gdb.layer_candidates(LayerOrder::ReverseDeclared);
        let names: Vec<_> = layers.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["D", "C", "A"]);
    }

    #[tokio::test]
    async fn test_layer_candidates_declared() {
        let dir = TempDir::new().unwrap();
        let document = sample_document(&[("A", true), ("B", true)]);
        let path = write_document(&dir, &document).await;
        let gdb = LocalGeodatabase::load(&path).await.unwrap();

        let layers = gdb.layer_candidates(LayerOrder::Declared);
        let names: Vec<_> = layers.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_empty_snapshot_yields_empty_layer_list() {
        let dir = TempDir::new().unwrap();
        let document = sample_document(&[]);
        let path = write_document(&dir, &document).await;
        let gdb = LocalGeodatabase::load(&path).await.unwrap();

        assert!(gdb.layer_candidates(LayerOrder::ReverseDeclared).is_empty());
    }

    #[tokio::test]
    async fn test_attribute_only_tables_excluded_from_layers() {
        let dir = TempDir::new().unwrap();
        let document = sample_document(&[("Notes", false)]);
        let path = write_document(&dir, &document).await;
        let gdb = LocalGeodatabase::load(&path).await.unwrap();

        assert!(gdb.layer_candidates(LayerOrder::ReverseDeclared).is_empty());
        // Still present for offline queries.
        assert_eq!(gdb.feature_tables().len(), 1);
    }

    #[test]
    fn test_layer_order_default_is_reverse() {
        assert_eq!(LayerOrder::default(), LayerOrder::ReverseDeclared);
    }
}
