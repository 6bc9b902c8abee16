//! Marker identity and descriptor types.

use serde::Deserialize;

/// Dense, 0-based marker index.
///
/// A MarkerId is the marker's position in the registry and the index into
/// every per-marker array (tracked state, object pool). Ids are only ever
/// handed out by [`MarkerRegistry`](super::MarkerRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub usize);

impl MarkerId {
    pub fn index(self) -> usize {
        self.0
    }

    /// 1-based number used in user-facing text ("Marker 3").
    pub fn display_number(self) -> usize {
        self.0 + 1
    }
}

impl std::fmt::Display for MarkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "M{}", self.0)
    }
}

/// A registered marker. Immutable after the registry is built.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerDescriptor {
    pub id: MarkerId,
    pub name: String,
    /// Image reference exactly as the tracking runtime reports it back.
    pub image_ref: String,
    /// Printed width of the marker in meters.
    pub estimated_real_world_width: f64,
}

/// Marker description as supplied by configuration (manifest file or the
/// built-in naming convention), before an id is assigned.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarkerSpec {
    pub name: String,
    pub src: String,
    #[serde(alias = "estimatedRealWorldWidth")]
    pub estimated_real_world_width: f64,
}

/// One entry of the image list handed to the tracking feature.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingImage {
    pub image_ref: String,
    pub estimated_real_world_width: f64,
}
