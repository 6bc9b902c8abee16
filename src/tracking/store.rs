//! State store: per-marker active flag and last applied pose.
//!
//! The store is owned by the session and lent to the dispatcher; nothing
//! else writes to it. Readers (UI, render loop) only see it through
//! [`StateStore::summary`] and the accessors below.

use nalgebra::{UnitQuaternion, Vector3};

use crate::geometry::Pose;
use crate::registry::MarkerId;

use super::result::ActiveSummary;
use super::state::MarkerVisibility;

/// Tracking state of one marker.
///
/// `position` and `rotation` are only meaningful while `active` is true;
/// after the marker is lost they keep their last values, which are stale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedState {
    pub active: bool,
    pub position: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
}

impl TrackedState {
    pub fn visibility(&self) -> MarkerVisibility {
        MarkerVisibility::from_active(self.active)
    }
}

impl Default for TrackedState {
    fn default() -> Self {
        Self {
            active: false,
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }
}

/// Per-marker tracking state, indexed by [`MarkerId`].
#[derive(Debug, Clone)]
pub struct StateStore {
    states: Vec<TrackedState>,
}

impl StateStore {
    /// All `marker_count` markers start inactive.
    pub fn new(marker_count: usize) -> Self {
        Self {
            states: vec![TrackedState::default(); marker_count],
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn get(&self, id: MarkerId) -> Option<&TrackedState> {
        self.states.get(id.index())
    }

    pub fn visibility(&self, id: MarkerId) -> MarkerVisibility {
        self.get(id)
            .map(TrackedState::visibility)
            .unwrap_or_default()
    }

    /// Set the active flag. Returns the previous value, or `None` for an
    /// id outside the store.
    pub fn set_active(&mut self, id: MarkerId, active: bool) -> Option<bool> {
        let state = self.states.get_mut(id.index())?;
        let previous = state.active;
        state.active = active;
        Some(previous)
    }

    /// Store the latest pose of a marker.
    pub fn record_pose(&mut self, id: MarkerId, pose: &Pose) {
        if let Some(state) = self.states.get_mut(id.index()) {
            state.position = pose.position;
            state.rotation = pose.rotation;
        }
    }

    pub fn active_count(&self) -> usize {
        self.states.iter().filter(|s| s.active).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MarkerId, &TrackedState)> {
        self.states.iter().enumerate().map(|(i, s)| (MarkerId(i), s))
    }

    /// Snapshot for the UI.
    pub fn summary(&self) -> ActiveSummary {
        let per_marker_active: Vec<bool> = self.states.iter().map(|s| s.active).collect();
        ActiveSummary {
            active_count: per_marker_active.iter().filter(|a| **a).count(),
            per_marker_active,
        }
    }

    /// Mark every marker inactive (session teardown). Returns how many were active.
    pub fn force_all_hidden(&mut self) -> usize {
        let mut count = 0;
        for state in self.states.iter_mut().filter(|s| s.active) {
            state.active = false;
            count += 1;
        }
        count
    }
}
