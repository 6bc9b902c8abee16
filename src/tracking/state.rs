//! Per-marker tracking state machine.

/// Visibility state of a single marker.
///
/// Every marker starts `Hidden`. `Added` moves it to `Visible`, `Removed`
/// moves it back; both are idempotent. There is no terminal state: the
/// machine runs for the lifetime of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerVisibility {
    /// Not currently tracked; stored pose is stale.
    #[default]
    Hidden,
    /// Tracked; pose updates are applied.
    Visible,
}

impl MarkerVisibility {
    pub fn from_active(active: bool) -> Self {
        if active {
            Self::Visible
        } else {
            Self::Hidden
        }
    }

    pub fn is_visible(self) -> bool {
        self == Self::Visible
    }
}
