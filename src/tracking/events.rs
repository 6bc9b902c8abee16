//! Typed tracking events delivered by the runtime's image-tracking feature.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use crossbeam_channel::{Receiver, Sender};

use crate::geometry::TransformMatrix;

/// Producer side of the tracking event channel.
pub type EventSender = Sender<TrackingEvent>;

/// Consumer side of the tracking event channel.
pub type EventReceiver = Receiver<TrackingEvent>;

/// One notification from the tracking runtime.
///
/// `src` is the image reference exactly as it was registered.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingEvent {
    /// The image started being tracked. The runtime may attach an initial
    /// transform; it is not applied (poses arrive through `Updated`).
    Added {
        src: String,
        transform: Option<TransformMatrix>,
    },
    /// The image is no longer tracked.
    Removed { src: String },
    /// New pose for a tracked image.
    Updated {
        src: String,
        transform: TransformMatrix,
    },
}

impl TrackingEvent {
    pub fn added(src: impl Into<String>) -> Self {
        Self::Added {
            src: src.into(),
            transform: None,
        }
    }

    pub fn removed(src: impl Into<String>) -> Self {
        Self::Removed { src: src.into() }
    }

    pub fn updated(src: impl Into<String>, transform: TransformMatrix) -> Self {
        Self::Updated {
            src: src.into(),
            transform,
        }
    }

    pub fn src(&self) -> &str {
        match self {
            Self::Added { src, .. } | Self::Removed { src } | Self::Updated { src, .. } => src,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Added { .. } => EventKind::Added,
            Self::Removed { .. } => EventKind::Removed,
            Self::Updated { .. } => EventKind::Updated,
        }
    }
}

/// Event discriminant, used by trace files and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Added,
    Removed,
    Updated,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Added => "added",
            EventKind::Removed => "removed",
            EventKind::Updated => "updated",
        };
        f.write_str(s)
    }
}

impl FromStr for EventKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "added" => Ok(EventKind::Added),
            "removed" => Ok(EventKind::Removed),
            "updated" => Ok(EventKind::Updated),
            other => bail!("unknown tracking event kind '{}'", other),
        }
    }
}
