//! Dispatch outcomes and the aggregate state published to the UI.

use crate::geometry::PoseError;
use crate::registry::MarkerId;

/// What a single tracking event did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispatchOutcome {
    /// Marker is now visible; `changed` is false if it already was.
    Shown { id: MarkerId, changed: bool },
    /// Marker is now hidden; `changed` is false if it already was.
    Hidden { id: MarkerId, changed: bool },
    /// Pose stored and applied to the marker's object.
    PoseApplied { id: MarkerId },
    /// Update for a hidden marker; nothing changed.
    IgnoredWhileHidden { id: MarkerId },
    /// Update carried a matrix that could not be decomposed; nothing changed.
    InvalidPose { id: MarkerId, error: PoseError },
    /// Image reference not in the registry; nothing changed.
    UnknownMarker,
}

/// Aggregate marker state handed to the UI after each transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSummary {
    pub active_count: usize,
    pub per_marker_active: Vec<bool>,
}

impl ActiveSummary {
    pub fn total(&self) -> usize {
        self.per_marker_active.len()
    }

    /// Status line shown while tracking is running.
    pub fn status_line(&self) -> String {
        format!("Found: {}/{} markers", self.active_count, self.total())
    }
}

/// Counters accumulated over a session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchStats {
    pub events: usize,
    pub shown: usize,
    pub hidden: usize,
    pub poses_applied: usize,
    pub ignored_while_hidden: usize,
    pub invalid_poses: usize,
    pub unknown_markers: usize,
}

impl DispatchStats {
    pub fn record(&mut self, outcome: &DispatchOutcome) {
        self.events += 1;
        match outcome {
            DispatchOutcome::Shown { changed: true, .. } => self.shown += 1,
            DispatchOutcome::Hidden { changed: true, .. } => self.hidden += 1,
            DispatchOutcome::Shown { .. } | DispatchOutcome::Hidden { .. } => {}
            DispatchOutcome::PoseApplied { .. } => self.poses_applied += 1,
            DispatchOutcome::IgnoredWhileHidden { .. } => self.ignored_while_hidden += 1,
            DispatchOutcome::InvalidPose { .. } => self.invalid_poses += 1,
            DispatchOutcome::UnknownMarker => self.unknown_markers += 1,
        }
    }
}
