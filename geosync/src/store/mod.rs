//! Local snapshot store: the downloaded geodatabase and its loader.

mod geodatabase;

pub use geodatabase::{
    CorruptStoreError, FeatureTable, LayerOrder, LocalGeodatabase, SnapshotDocument,
    SNAPSHOT_FORMAT_VERSION,
};
