//! Tracking event dispatcher.
//!
//! Turns raw runtime events into state-store mutations and object-pool
//! commands:
//!
//! ```text
//! event ─▶ registry lookup ─▶ state store ─▶ object pool ─▶ UI summary
//! ```
//!
//! Events are processed one at a time, fully, in the order they are handed
//! in. Nothing is queued, reordered or coalesced here; several `Updated`
//! events for the same marker are simply applied in turn (last writer wins).

use tracing::{debug, info, warn};

use crate::geometry::TransformMatrix;
use crate::registry::{MarkerId, MarkerRegistry};
use crate::scene::ObjectPool;
use crate::ui::UiSync;

use super::events::TrackingEvent;
use super::result::DispatchOutcome;
use super::store::StateStore;

/// Borrows the session's registry, state and objects for the duration of a
/// batch of events.
pub struct Dispatcher<'a> {
    registry: &'a MarkerRegistry,
    store: &'a mut StateStore,
    pool: &'a mut ObjectPool,
    ui: &'a mut dyn UiSync,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        registry: &'a MarkerRegistry,
        store: &'a mut StateStore,
        pool: &'a mut ObjectPool,
        ui: &'a mut dyn UiSync,
    ) -> Self {
        debug_assert_eq!(registry.len(), store.len());
        debug_assert_eq!(registry.len(), pool.len());
        Self {
            registry,
            store,
            pool,
            ui,
        }
    }

    /// Process a single event to completion.
    pub fn dispatch(&mut self, event: &TrackingEvent) -> DispatchOutcome {
        let Some(id) = self.registry.lookup_by_image_ref(event.src()) else {
            warn!("Ignoring {} event for unregistered image '{}'", event.kind(), event.src());
            return DispatchOutcome::UnknownMarker;
        };

        match event {
            TrackingEvent::Added { .. } => self.on_added(id),
            TrackingEvent::Removed { .. } => self.on_removed(id),
            TrackingEvent::Updated { transform, .. } => self.on_updated(id, transform),
        }
    }

    /// Hidden → Visible.
    fn on_added(&mut self, id: MarkerId) -> DispatchOutcome {
        let was_active = self.store.set_active(id, true).unwrap_or(false);
        self.pool.set_visible(id, true);
        if !was_active {
            info!("Marker {} found", id.display_number());
        }
        self.publish();
        DispatchOutcome::Shown {
            id,
            changed: !was_active,
        }
    }

    /// Visible → Hidden.
    fn on_removed(&mut self, id: MarkerId) -> DispatchOutcome {
        let was_active = self.store.set_active(id, false).unwrap_or(false);
        self.pool.set_visible(id, false);
        if was_active {
            info!("Marker {} lost", id.display_number());
        }
        self.publish();
        DispatchOutcome::Hidden {
            id,
            changed: was_active,
        }
    }

    /// Pose update; only applied while the marker is visible.
    fn on_updated(&mut self, id: MarkerId, transform: &TransformMatrix) -> DispatchOutcome {
        if !self.store.visibility(id).is_visible() {
            return DispatchOutcome::IgnoredWhileHidden { id };
        }

        let pose = match transform.decompose() {
            Ok(pose) => pose,
            Err(error) => {
                warn!("Marker {}: dropping pose update: {}", id.display_number(), error);
                return DispatchOutcome::InvalidPose { id, error };
            }
        };

        self.store.record_pose(id, &pose);
        self.pool.apply_pose(id, pose.position, pose.rotation);
        debug!(
            "Marker {} at [{:.3}, {:.3}, {:.3}]",
            id.display_number(),
            pose.position.x,
            pose.position.y,
            pose.position.z
        );
        DispatchOutcome::PoseApplied { id }
    }

    fn publish(&mut self) {
        let summary = self.store.summary();
        self.ui.publish(&summary);
    }
}
