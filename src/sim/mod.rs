//! Reference tracking runtimes.
//!
//! These stand in for a device XR runtime: they answer the capability probe,
//! accept the image list and push [`TrackingEvent`](crate::tracking::TrackingEvent)s
//! over a channel. `LoopbackRuntime` hands the sender to the caller,
//! `ReplayRuntime` plays a recorded trace on a producer thread and
//! `SimulatedRuntime` generates a random walk of markers appearing, moving
//! and disappearing.

pub mod loopback;
pub mod replay;
pub mod simulated;

pub use loopback::LoopbackRuntime;
pub use replay::{ReplayConfig, ReplayRuntime};
pub use simulated::{SimulatedFeed, SimulatedRuntime, SimulationConfig};

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::system::SessionError;

/// Longest single sleep of a producer thread, so a stop request is noticed
/// promptly.
const MAX_SLEEP_SLICE: Duration = Duration::from_millis(20);

/// What a reference runtime claims to support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeCapabilities {
    /// Answer to the session-mode probe.
    pub session_supported: bool,
    /// Whether enabling image tracking succeeds.
    pub image_tracking: bool,
}

impl Default for RuntimeCapabilities {
    fn default() -> Self {
        Self {
            session_supported: true,
            image_tracking: true,
        }
    }
}

impl RuntimeCapabilities {
    fn check_image_tracking(&self, images: usize) -> Result<(), SessionError> {
        if !self.image_tracking {
            return Err(SessionError::FeatureUnavailable(
                "image tracking is disabled on this runtime".to_string(),
            ));
        }
        if images == 0 {
            return Err(SessionError::FeatureUnavailable(
                "no images to track".to_string(),
            ));
        }
        Ok(())
    }
}

/// Sleep until `deadline` in short slices. Returns false if stopped.
fn sleep_until(deadline: Instant, stop: &AtomicBool) -> bool {
    loop {
        if stop.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(MAX_SLEEP_SLICE));
    }
}
