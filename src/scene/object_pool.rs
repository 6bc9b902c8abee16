//! Object pool: one overlay object per registered marker.
//!
//! Handles are created once when the session starts and live until the
//! session is torn down. Tracking only ever flips their visibility and
//! moves them; it never creates or destroys them.

use nalgebra::{UnitQuaternion, Vector3};
use tracing::{debug, warn};

use crate::geometry::Pose;
use crate::registry::{MarkerId, MarkerRegistry};

use super::asset::{AssetLoader, MeshAsset};
use super::palette::{Primitive, marker_color, palette_entry};
use super::IdleBehavior;

/// Edge length of the procedural shapes (meters).
pub const DEFAULT_OBJECT_SIZE_M: f64 = 0.07;

/// Configuration for the object pool.
#[derive(Debug, Clone)]
pub struct ObjectPoolConfig {
    /// Base size of procedural shapes in meters.
    pub object_size_m: f64,
    /// Whether idle animations run at all.
    pub idle_animations: bool,
}

impl Default for ObjectPoolConfig {
    fn default() -> Self {
        Self {
            object_size_m: DEFAULT_OBJECT_SIZE_M,
            idle_animations: true,
        }
    }
}

/// What an object looks like.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Primitive(Primitive),
    Mesh(MeshAsset),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Appearance {
    pub shape: Shape,
    pub color: [f32; 3],
    pub size_m: f64,
}

/// A single overlay object.
#[derive(Debug, Clone)]
pub struct ObjectHandle {
    id: MarkerId,
    name: String,
    visible: bool,
    pose: Pose,
    appearance: Appearance,
    idle: IdleBehavior,
    /// Seconds of idle animation played so far (only advances while visible).
    idle_elapsed: f64,
}

impl ObjectHandle {
    pub fn id(&self) -> MarkerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Last pose applied by tracking.
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    pub fn idle(&self) -> IdleBehavior {
        self.idle
    }

    pub fn idle_elapsed(&self) -> f64 {
        self.idle_elapsed
    }

    /// Tracked pose with the idle animation applied on top.
    pub fn world_transform(&self) -> (Pose, f64) {
        let offset = self.idle.offset_at(self.idle_elapsed);
        (self.pose.compose(&offset.local), offset.scale)
    }
}

/// A visible object as the render loop needs it for one frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderItem<'a> {
    pub id: MarkerId,
    pub world: Pose,
    pub scale: f64,
    pub appearance: &'a Appearance,
}

/// Owner of all overlay objects, indexed by marker id.
#[derive(Debug)]
pub struct ObjectPool {
    handles: Vec<ObjectHandle>,
}

impl ObjectPool {
    /// Create one hidden object per marker.
    ///
    /// An asset that fails to load is logged and replaced by the marker's
    /// procedural primitive; it never aborts pool construction.
    pub fn new(registry: &MarkerRegistry, assets: &dyn AssetLoader, config: &ObjectPoolConfig) -> Self {
        let handles = registry
            .all()
            .iter()
            .map(|marker| {
                let entry = palette_entry(marker.id);
                let shape = match assets.load(marker) {
                    Ok(Some(mesh)) => {
                        debug!(
                            "Marker {} uses asset {} ({} vertices)",
                            marker.id.display_number(),
                            mesh.source.display(),
                            mesh.vertices.len()
                        );
                        Shape::Mesh(mesh)
                    }
                    Ok(None) => Shape::Primitive(entry.primitive),
                    Err(e) => {
                        warn!(
                            "Asset for marker {} failed to load, using {}: {:#}",
                            marker.id.display_number(),
                            entry.primitive.name(),
                            e
                        );
                        Shape::Primitive(entry.primitive)
                    }
                };
                let idle = if config.idle_animations {
                    entry.idle
                } else {
                    IdleBehavior::Still
                };

                ObjectHandle {
                    id: marker.id,
                    name: format!("obj_{}", marker.id.index()),
                    visible: false,
                    pose: Pose::identity(),
                    appearance: Appearance {
                        shape,
                        color: marker_color(marker.id),
                        size_m: config.object_size_m,
                    },
                    idle,
                    idle_elapsed: 0.0,
                }
            })
            .collect();

        Self { handles }
    }

    /// Show or hide an object. Returns whether the visibility changed;
    /// repeating the current value does nothing.
    pub fn set_visible(&mut self, id: MarkerId, visible: bool) -> bool {
        let Some(handle) = self.handles.get_mut(id.index()) else {
            warn!("set_visible on unknown object {}", id);
            return false;
        };
        if handle.visible == visible {
            return false;
        }
        handle.visible = visible;
        true
    }

    /// Move an object. Only meaningful while it is visible.
    pub fn apply_pose(&mut self, id: MarkerId, position: Vector3<f64>, rotation: UnitQuaternion<f64>) {
        let Some(handle) = self.handles.get_mut(id.index()) else {
            warn!("apply_pose on unknown object {}", id);
            return;
        };
        debug_assert!(handle.visible, "pose applied to hidden object {}", id);
        handle.pose = Pose { position, rotation };
    }

    pub fn is_visible(&self, id: MarkerId) -> bool {
        self.handles.get(id.index()).is_some_and(|h| h.visible)
    }

    pub fn pose(&self, id: MarkerId) -> Option<&Pose> {
        self.handles.get(id.index()).map(|h| &h.pose)
    }

    pub fn handle(&self, id: MarkerId) -> Option<&ObjectHandle> {
        self.handles.get(id.index())
    }

    pub fn handles(&self) -> &[ObjectHandle] {
        &self.handles
    }

    pub fn visible_count(&self) -> usize {
        self.handles.iter().filter(|h| h.visible).count()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Advance idle animations of visible objects by `dt_secs`.
    pub fn advance(&mut self, dt_secs: f64) {
        if !(dt_secs.is_finite() && dt_secs > 0.0) {
            return;
        }
        for handle in self.handles.iter_mut().filter(|h| h.visible) {
            handle.idle_elapsed += dt_secs;
        }
    }

    /// Visible objects with their animated world transforms.
    pub fn render_items(&self) -> impl Iterator<Item = RenderItem<'_>> {
        self.handles.iter().filter(|h| h.visible).map(|h| {
            let (world, scale) = h.world_transform();
            RenderItem {
                id: h.id,
                world,
                scale,
                appearance: &h.appearance,
            }
        })
    }

    /// Hide every object. Returns how many were visible.
    pub fn hide_all(&mut self) -> usize {
        let mut hidden = 0;
        for handle in self.handles.iter_mut().filter(|h| h.visible) {
            handle.visible = false;
            hidden += 1;
        }
        hidden
    }

    /// Destroy all objects at session teardown. Objects must already be hidden.
    pub fn release(&mut self) -> usize {
        debug_assert!(
            self.handles.iter().all(|h| !h.visible),
            "releasing pool with visible objects"
        );
        let released = self.handles.len();
        self.handles.clear();
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MarkerDescriptor;
    use crate::scene::asset::NoAssets;
    use anyhow::{Result, anyhow};
    use approx::assert_relative_eq;

    struct FailingAssets;

    impl AssetLoader for FailingAssets {
        fn load(&self, marker: &MarkerDescriptor) -> Result<Option<MeshAsset>> {
            match marker.id.index() {
                0 => Err(anyhow!("corrupt model")),
                1 => Ok(Some(MeshAsset {
                    source: "models/marker2.obj".into(),
                    vertices: vec![Vector3::zeros(), Vector3::new(1.0, 1.0, 1.0)],
                    face_count: 0,
                })),
                _ => Ok(None),
            }
        }
    }

    fn pool() -> ObjectPool {
        ObjectPool::new(&MarkerRegistry::default(), &NoAssets, &ObjectPoolConfig::default())
    }

    #[test]
    fn test_one_hidden_handle_per_marker() {
        let pool = pool();
        assert_eq!(pool.len(), 10);
        for (i, handle) in pool.handles().iter().enumerate() {
            assert_eq!(handle.id(), MarkerId(i));
            assert!(!handle.is_visible());
            assert_eq!(handle.name(), format!("obj_{}", i));
        }
        assert_eq!(pool.visible_count(), 0);
        assert_eq!(pool.render_items().count(), 0);
    }

    #[test]
    fn test_appearance_follows_palette() {
        let pool = pool();
        let a = pool.handle(MarkerId(0)).unwrap().appearance();
        let b = pool.handle(MarkerId(5)).unwrap().appearance();
        assert_eq!(a, b);
        assert_eq!(a.shape, Shape::Primitive(Primitive::Cube));
        assert_eq!(a.size_m, DEFAULT_OBJECT_SIZE_M);
    }

    #[test]
    fn test_asset_failure_falls_back_to_primitive() {
        let pool = ObjectPool::new(
            &MarkerRegistry::default(),
            &FailingAssets,
            &ObjectPoolConfig::default(),
        );
        assert_eq!(pool.len(), 10);
        assert_eq!(
            pool.handle(MarkerId(0)).unwrap().appearance().shape,
            Shape::Primitive(Primitive::Cube)
        );
        assert!(matches!(
            pool.handle(MarkerId(1)).unwrap().appearance().shape,
            Shape::Mesh(_)
        ));
    }

    #[test]
    fn test_set_visible_is_idempotent() {
        let mut pool = pool();
        assert!(pool.set_visible(MarkerId(3), true));
        assert!(!pool.set_visible(MarkerId(3), true));
        assert!(pool.is_visible(MarkerId(3)));
        assert!(pool.set_visible(MarkerId(3), false));
        assert!(!pool.set_visible(MarkerId(3), false));
        assert!(!pool.is_visible(MarkerId(3)));
    }

    #[test]
    fn test_out_of_range_id_is_ignored() {
        let mut pool = pool();
        assert!(!pool.set_visible(MarkerId(42), true));
        assert!(!pool.is_visible(MarkerId(42)));
        assert!(pool.pose(MarkerId(42)).is_none());
    }

    #[test]
    fn test_apply_pose() {
        let mut pool = pool();
        pool.set_visible(MarkerId(1), true);
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.4);
        pool.apply_pose(MarkerId(1), Vector3::new(1.0, 2.0, 3.0), rotation);

        let pose = pool.pose(MarkerId(1)).unwrap();
        assert_eq!(pose.position, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(pose.rotation, rotation);
    }

    #[test]
    fn test_idle_advances_only_while_visible() {
        let mut pool = pool();
        pool.set_visible(MarkerId(0), true);
        pool.advance(0.5);
        pool.advance(0.25);
        pool.advance(f64::NAN);
        pool.advance(-1.0);

        assert_relative_eq!(pool.handle(MarkerId(0)).unwrap().idle_elapsed(), 0.75);
        assert_eq!(pool.handle(MarkerId(1)).unwrap().idle_elapsed(), 0.0);

        pool.set_visible(MarkerId(0), false);
        pool.advance(1.0);
        assert_relative_eq!(pool.handle(MarkerId(0)).unwrap().idle_elapsed(), 0.75);
    }

    #[test]
    fn test_render_items_apply_idle_rotation() {
        let mut pool = pool();
        pool.set_visible(MarkerId(0), true);
        pool.apply_pose(
            MarkerId(0),
            Vector3::new(0.0, 0.0, -1.0),
            UnitQuaternion::identity(),
        );
        pool.advance(1.0);

        let items: Vec<_> = pool.render_items().collect();
        assert_eq!(items.len(), 1);
        let item = items[0];
        assert_eq!(item.id, MarkerId(0));
        assert_eq!(item.world.position, Vector3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(item.world.rotation.angle(), 1.2, epsilon = 1e-12);
        assert_eq!(item.scale, 1.0);
    }

    #[test]
    fn test_idle_disabled_by_config() {
        let config = ObjectPoolConfig {
            idle_animations: false,
            ..Default::default()
        };
        let pool = ObjectPool::new(&MarkerRegistry::default(), &NoAssets, &config);
        assert!(pool.handles().iter().all(|h| h.idle() == IdleBehavior::Still));
    }

    #[test]
    fn test_hide_all_then_release() {
        let mut pool = pool();
        pool.set_visible(MarkerId(2), true);
        pool.set_visible(MarkerId(7), true);
        assert_eq!(pool.hide_all(), 2);
        assert_eq!(pool.visible_count(), 0);
        assert_eq!(pool.release(), 10);
        assert!(pool.is_empty());
    }
}
