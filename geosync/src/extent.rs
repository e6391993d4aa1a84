//! Geographic extent types and the viewport-to-extent resolver.
//!
//! An [`Extent`] is the immutable region used to scope a snapshot request.
//! It is captured from the map [`Viewport`] at sync-initiation time; a
//! viewport that has not completed its first layout has no visible area
//! yet and resolves to `None`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Degrees of longitude spanned per unit of map scale.
///
/// Matches the rough relationship between the viewpoint scale values used
/// by interactive maps (e.g. 1:250 000) and the width of the visible area
/// at mid latitudes. Only the ratio matters for scoping a snapshot.
const DEGREES_PER_SCALE_UNIT: f64 = 1.0 / 500_000.0;

/// An axis-aligned geographic bounding box in WGS-84 degrees.
///
/// Extents are immutable values. The constructors validate coordinate
/// ranges and corner ordering so downstream code can rely on
/// `xmin <= xmax` and `ymin <= ymax`.
///
/// # Examples
///
/// ```
/// use geosync::extent::Extent;
///
/// let extent = Extent::new(-122.52, 37.76, -122.43, 37.85).unwrap();
/// assert!(extent.width() > 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    /// Western edge (longitude, degrees).
    pub xmin: f64,
    /// Southern edge (latitude, degrees).
    pub ymin: f64,
    /// Eastern edge (longitude, degrees).
    pub xmax: f64,
    /// Northern edge (latitude, degrees).
    pub ymax: f64,
}

/// Error constructing an [`Extent`] from raw coordinates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtentError {
    /// Latitude outside [-90, 90] or longitude outside [-180, 180].
    #[error("coordinate out of range: ({lon}, {lat})")]
    OutOfRange { lon: f64, lat: f64 },

    /// Min corner not south-west of max corner.
    #[error("inverted extent: ({xmin}, {ymin}) to ({xmax}, {ymax})")]
    Inverted {
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
    },
}

fn in_range(lon: f64, lat: f64) -> bool {
    (-180.0..=180.0).contains(&lon) && (-90.0..=90.0).contains(&lat)
}

impl Extent {
    /// Creates an extent from corner coordinates.
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Result<Self, ExtentError> {
        if !in_range(xmin, ymin) {
            return Err(ExtentError::OutOfRange {
                lon: xmin,
                lat: ymin,
            });
        }
        if !in_range(xmax, ymax) {
            return Err(ExtentError::OutOfRange {
                lon: xmax,
                lat: ymax,
            });
        }
        if xmin > xmax || ymin > ymax {
            return Err(ExtentError::Inverted {
                xmin,
                ymin,
                xmax,
                ymax,
            });
        }
        Ok(Self {
            xmin,
            ymin,
            xmax,
            ymax,
        })
    }

    /// Derives an extent from a viewpoint center and map scale.
    ///
    /// This is the path a map view takes when converting its current
    /// viewpoint into a download region. Larger scale values produce a
    /// wider box. The box is clamped to valid coordinate ranges.
    pub fn around(lat: f64, lon: f64, scale: f64) -> Result<Self, ExtentError> {
        if !in_range(lon, lat) {
            return Err(ExtentError::OutOfRange { lon, lat });
        }
        let half_width = (scale * DEGREES_PER_SCALE_UNIT) / 2.0;
        // Visible height is roughly half the width on a typical display.
        let half_height = half_width / 2.0;
        Self::new(
            (lon - half_width).max(-180.0),
            (lat - half_height).max(-90.0),
            (lon + half_width).min(180.0),
            (lat + half_height).min(90.0),
        )
    }

    /// Width of the extent in degrees of longitude.
    #[inline]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// Height of the extent in degrees of latitude.
    #[inline]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Returns true if the extent covers no area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width() == 0.0 || self.height() == 0.0
    }

    /// Returns true if this extent fully contains `other`.
    pub fn contains(&self, other: &Extent) -> bool {
        self.xmin <= other.xmin
            && self.ymin <= other.ymin
            && self.xmax >= other.xmax
            && self.ymax >= other.ymax
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.5}, {:.5}, {:.5}, {:.5}]",
            self.xmin, self.ymin, self.xmax, self.ymax
        )
    }
}

/// The map viewport collaborator's geometry.
///
/// A viewport starts *unestablished*: before the first layout pass the
/// map has no visible area, and requesting a snapshot for it would send
/// a null region to the server. [`Viewport::visible_extent`] returns
/// `None` in that state and callers must abort sync initiation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Viewport {
    visible: Option<Extent>,
}

impl Viewport {
    /// Creates an unestablished viewport (no layout yet).
    pub fn unestablished() -> Self {
        Self { visible: None }
    }

    /// Creates a viewport showing the given extent.
    pub fn showing(extent: Extent) -> Self {
        Self {
            visible: Some(extent),
        }
    }

    /// Creates a viewport centered on a point at the given map scale.
    pub fn centered_on(lat: f64, lon: f64, scale: f64) -> Result<Self, ExtentError> {
        Ok(Self::showing(Extent::around(lat, lon, scale)?))
    }

    /// Returns the currently visible extent, or `None` if the viewport
    /// is not yet established.
    pub fn visible_extent(&self) -> Option<Extent> {
        self.visible
    }
}

/// Resolves the viewport's visible area into a snapshot extent.
///
/// Pure function of the viewport. Returns `None` iff the viewport is
/// unestablished.
pub fn current_extent(viewport: &Viewport) -> Option<Extent> {
    viewport.visible_extent().filter(|e| !e.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_valid() {
        let extent = Extent::new(-122.5, 37.7, -122.4, 37.8).unwrap();
        assert!(extent.width() > 0.0);
        assert!(extent.height() > 0.0);
        assert!(!extent.is_empty());
    }

    #[test]
    fn test_new_out_of_range() {
        let result = Extent::new(-200.0, 0.0, 0.0, 0.0);
        assert!(matches!(result, Err(ExtentError::OutOfRange { .. })));

        let result = Extent::new(0.0, 0.0, 0.0, 95.0);
        assert!(matches!(result, Err(ExtentError::OutOfRange { .. })));
    }

    #[test]
    fn test_new_inverted() {
        let result = Extent::new(10.0, 10.0, 5.0, 20.0);
        assert!(matches!(result, Err(ExtentError::Inverted { .. })));
    }

    #[test]
    fn test_around_san_francisco() {
        let extent = Extent::around(37.807606, -122.475711, 250_000.0).unwrap();
        assert!(extent.xmin < -122.475711);
        assert!(extent.xmax > -122.475711);
        assert!(extent.ymin < 37.807606);
        assert!(extent.ymax > 37.807606);
    }

    #[test]
    fn test_around_clamps_at_poles() {
        let extent = Extent::around(89.9, 0.0, 500_000.0).unwrap();
        assert!(extent.ymax <= 90.0);
    }

    #[test]
    fn test_around_rejects_bad_center() {
        assert!(Extent::around(91.0, 0.0, 10_000.0).is_err());
    }

    #[test]
    fn test_contains() {
        let outer = Extent::new(-123.0, 37.0, -122.0, 38.0).unwrap();
        let inner = Extent::new(-122.6, 37.4, -122.4, 37.6).unwrap();
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
    }

    #[test]
    fn test_unestablished_viewport_resolves_to_none() {
        let viewport = Viewport::unestablished();
        assert_eq!(current_extent(&viewport), None);
    }

    #[test]
    fn test_established_viewport_resolves_to_some() {
        let extent = Extent::new(-122.5, 37.7, -122.4, 37.8).unwrap();
        let viewport = Viewport::showing(extent);
        assert_eq!(current_extent(&viewport), Some(extent));
    }

    #[test]
    fn test_default_viewport_is_unestablished() {
        assert!(Viewport::default().visible_extent().is_none());
    }

    #[test]
    fn test_empty_visible_area_resolves_to_none() {
        let degenerate = Extent::new(0.0, 0.0, 0.0, 0.0).unwrap();
        let viewport = Viewport::showing(degenerate);
        assert_eq!(current_extent(&viewport), None);
    }

    #[test]
    fn test_display() {
        let extent = Extent::new(-122.5, 37.7, -122.4, 37.8).unwrap();
        let s = format!("{}", extent);
        assert!(s.starts_with('['));
        assert!(s.contains("-122.5"));
    }

    #[test]
    fn test_serde_round_trip() {
        let extent = Extent::new(-122.5, 37.7, -122.4, 37.8).unwrap();
        let json = serde_json::to_string(&extent).unwrap();
        let back: Extent = serde_json::from_str(&json).unwrap();
        assert_eq!(extent, back);
    }
}
