//! Feature service data model.
//!
//! These types mirror the wire format of the remote feature service:
//! the service descriptor with its ordered layer list, and the snapshot
//! generation parameters negotiated per sync attempt.

use crate::extent::Extent;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One named, indexed collection of features within a feature service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerInfo {
    /// Numeric layer index within the service.
    pub id: u32,
    /// Layer name as declared by the service.
    pub name: String,
    /// Whether features in this layer carry geometry.
    ///
    /// Pure attribute tables set this to false; they are queryable
    /// offline but never surfaced as map layers.
    #[serde(rename = "hasGeometry", default = "default_has_geometry")]
    pub has_geometry: bool,
}

fn default_has_geometry() -> bool {
    true
}

/// Remote feature service metadata, loaded once at session startup.
///
/// Read-only after load; the layer list preserves the service's
/// declaration order, which drives the display ordering policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureServiceDescriptor {
    /// Service display name.
    pub name: String,
    /// Ordered layer metadata.
    pub layers: Vec<LayerInfo>,
}

impl FeatureServiceDescriptor {
    /// Returns the number of layers declared by the service.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

/// Parameters for one snapshot generation attempt.
///
/// Built by the request builder from the descriptor and the captured
/// extent; immutable once submitted. Attachments are excluded by
/// default to keep snapshot downloads small, regardless of the server's
/// own default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotParameters {
    /// Region to scope the snapshot to.
    pub extent: Extent,
    /// Layers to include, by numeric index.
    #[serde(rename = "layerIds")]
    pub layer_ids: Vec<u32>,
    /// Whether feature attachments are included in the snapshot.
    #[serde(rename = "includeAttachments")]
    pub include_attachments: bool,
}

/// Server-assigned identifier for an in-flight export job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportJobId(pub String);

impl fmt::Display for ExportJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "export-{}", self.0)
    }
}

/// Server-side state of an export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportState {
    /// Generation still in progress.
    Running,
    /// Snapshot ready for download.
    Succeeded,
    /// Server-side generation failed.
    Failed,
}

/// One status poll result for an export job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportStatus {
    /// Current server-side state.
    pub state: ExportState,
    /// Generation progress fraction in [0, 1].
    #[serde(default)]
    pub progress: f32,
    /// Failure detail when `state` is `Failed`.
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_deserializes_wire_format() {
        let json = r#"{
            "name": "WildfireSync",
            "layers": [
                {"id": 0, "name": "Points of Interest", "hasGeometry": true},
                {"id": 1, "name": "Incident Notes", "hasGeometry": false}
            ]
        }"#;

        let descriptor: FeatureServiceDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.name, "WildfireSync");
        assert_eq!(descriptor.layer_count(), 2);
        assert_eq!(descriptor.layers[0].id, 0);
        assert!(descriptor.layers[0].has_geometry);
        assert!(!descriptor.layers[1].has_geometry);
    }

    #[test]
    fn test_layer_geometry_defaults_to_true() {
        let json = r#"{"id": 3, "name": "Perimeters"}"#;
        let layer: LayerInfo = serde_json::from_str(json).unwrap();
        assert!(layer.has_geometry);
    }

    #[test]
    fn test_parameters_serialize_camel_case() {
        let params = SnapshotParameters {
            extent: Extent::new(-122.5, 37.7, -122.4, 37.8).unwrap(),
            layer_ids: vec![0, 1],
            include_attachments: false,
        };

        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains("\"layerIds\":[0,1]"));
        assert!(json.contains("\"includeAttachments\":false"));
    }

    #[test]
    fn test_export_status_progress_defaults_to_zero() {
        let status: ExportStatus = serde_json::from_str(r#"{"state": "running"}"#).unwrap();
        assert_eq!(status.state, ExportState::Running);
        assert_eq!(status.progress, 0.0);
        assert!(status.error.is_none());
    }

    #[test]
    fn test_export_job_id_display() {
        let id = ExportJobId("a1b2".to_string());
        assert_eq!(format!("{}", id), "export-a1b2");
    }
}
