//! Marker registry: the fixed, ordered set of reference images the tracking
//! runtime is asked to recognize.
//!
//! The registry is built once at startup and never mutated afterwards. A
//! marker's [`MarkerId`] is its position in the registry and indexes every
//! other per-marker array in the crate (state store, object pool).

mod descriptor;

pub use descriptor::{MarkerDescriptor, MarkerId, MarkerSpec, TrackingImage};

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Result, bail, ensure};

/// Number of markers in the reference deployment.
pub const DEFAULT_MARKER_COUNT: usize = 10;

/// Printed marker width (meters) assumed when nothing better is known.
pub const DEFAULT_MARKER_WIDTH_M: f64 = 0.1;

/// Directory the conventional image paths live in.
pub const DEFAULT_IMAGE_DIR: &str = "images";

/// Immutable, ordered list of markers plus an index from image reference to id.
#[derive(Debug, Clone)]
pub struct MarkerRegistry {
    markers: Vec<MarkerDescriptor>,
    by_image_ref: HashMap<String, MarkerId>,
}

impl MarkerRegistry {
    /// Build `count` markers named `marker1..markerN` with images under `images/`.
    pub fn from_count(count: usize, width_m: f64) -> Result<Self> {
        Self::with_image_dir(count, width_m, DEFAULT_IMAGE_DIR)
    }

    /// Same naming convention as [`MarkerRegistry::from_count`] with a custom image directory.
    pub fn with_image_dir(count: usize, width_m: f64, image_dir: impl AsRef<Path>) -> Result<Self> {
        let image_dir = image_dir.as_ref();
        let specs = (0..count)
            .map(|i| {
                let name = format!("marker{}", i + 1);
                let src = image_dir
                    .join(format!("{name}.jpg"))
                    .to_string_lossy()
                    .replace('\\', "/");
                MarkerSpec {
                    name,
                    src,
                    estimated_real_world_width: width_m,
                }
            })
            .collect();
        Self::from_specs(specs)
    }

    /// Build a registry from explicit descriptors, in the given order.
    pub fn from_specs(specs: Vec<MarkerSpec>) -> Result<Self> {
        ensure!(!specs.is_empty(), "marker registry needs at least one marker");

        let mut markers = Vec::with_capacity(specs.len());
        let mut by_image_ref = HashMap::with_capacity(specs.len());

        for (index, spec) in specs.into_iter().enumerate() {
            let width = spec.estimated_real_world_width;
            if !width.is_finite() || width <= 0.0 {
                bail!(
                    "marker '{}' has invalid estimated real-world width {}",
                    spec.name,
                    width
                );
            }

            let id = MarkerId(index);
            if by_image_ref.insert(spec.src.clone(), id).is_some() {
                bail!("image '{}' is registered more than once", spec.src);
            }

            markers.push(MarkerDescriptor {
                id,
                name: spec.name,
                image_ref: spec.src,
                estimated_real_world_width: width,
            });
        }

        Ok(Self {
            markers,
            by_image_ref,
        })
    }

    /// All markers in registration order.
    pub fn all(&self) -> &[MarkerDescriptor] {
        &self.markers
    }

    /// Resolve an image reference reported by the tracking runtime.
    pub fn lookup_by_image_ref(&self, image_ref: &str) -> Option<MarkerId> {
        self.by_image_ref.get(image_ref).copied()
    }

    pub fn get(&self, id: MarkerId) -> Option<&MarkerDescriptor> {
        self.markers.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Image list in the shape the tracking feature expects.
    pub fn tracking_images(&self) -> Vec<TrackingImage> {
        self.markers
            .iter()
            .map(|m| TrackingImage {
                image_ref: m.image_ref.clone(),
                estimated_real_world_width: m.estimated_real_world_width,
            })
            .collect()
    }
}

impl Default for MarkerRegistry {
    fn default() -> Self {
        let markers: Vec<MarkerDescriptor> = (0..DEFAULT_MARKER_COUNT)
            .map(|i| MarkerDescriptor {
                id: MarkerId(i),
                name: format!("marker{}", i + 1),
                image_ref: format!("{}/marker{}.jpg", DEFAULT_IMAGE_DIR, i + 1),
                estimated_real_world_width: DEFAULT_MARKER_WIDTH_M,
            })
            .collect();
        let by_image_ref = markers
            .iter()
            .map(|m| (m.image_ref.clone(), m.id))
            .collect();
        Self {
            markers,
            by_image_ref,
        }
    }
}
