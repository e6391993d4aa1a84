//! Map surface collaborator.
//!
//! The orchestrator does not own the map. It reads the visible extent
//! from it and rewrites its operational layer list (clear, then add)
//! when switching between online and offline data. [`MapSurface`] is
//! the seam that keeps rendering concerns out of this crate;
//! [`MemoryMap`] is the in-memory implementation used by tests and the
//! CLI.

use crate::extent::{current_extent, Extent, Viewport};

/// Where a map layer's features come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerSource {
    /// Live layer on the remote feature service, by layer index.
    Online { layer_id: u32 },
    /// Feature table inside a downloaded snapshot.
    Offline { table: String },
}

/// One operational layer on the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureLayer {
    pub name: String,
    pub source: LayerSource,
}

impl FeatureLayer {
    /// A layer backed by the remote service.
    pub fn online(name: impl Into<String>, layer_id: u32) -> Self {
        Self {
            name: name.into(),
            source: LayerSource::Online { layer_id },
        }
    }

    /// A layer backed by a local snapshot table.
    pub fn offline(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: LayerSource::Offline {
                table: table.into(),
            },
        }
    }

    /// True when the layer reads from a local snapshot.
    pub fn is_offline(&self) -> bool {
        matches!(self.source, LayerSource::Offline { .. })
    }
}

/// The mutable map the orchestrator stages layers onto.
pub trait MapSurface {
    /// Current viewport geometry.
    fn viewport(&self) -> Viewport;

    /// Removes all operational layers. The basemap is untouched.
    fn clear_layers(&mut self);

    /// Appends a layer; later layers render on top of earlier ones.
    fn add_layer(&mut self, layer: FeatureLayer);

    /// Visible extent, if the viewport is established and non-empty.
    fn visible_extent(&self) -> Option<Extent> {
        current_extent(&self.viewport())
    }
}

/// In-memory map for tests and headless use.
#[derive(Debug, Default)]
pub struct MemoryMap {
    viewport: Viewport,
    layers: Vec<FeatureLayer>,
}

impl MemoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A map whose viewport shows the given extent.
    pub fn showing(extent: Extent) -> Self {
        Self {
            viewport: Viewport::showing(extent),
            layers: Vec::new(),
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Current operational layers, bottom to top.
    pub fn layers(&self) -> &[FeatureLayer] {
        &self.layers
    }
}

impl MapSurface for MemoryMap {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn clear_layers(&mut self) {
        self.layers.clear();
    }

    fn add_layer(&mut self, layer: FeatureLayer) {
        self.layers.push(layer);
    }
}
