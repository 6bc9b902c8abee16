//! Boundary to the XR runtime that owns the camera and the image tracker.
//!
//! The runtime is probed once for session support, then asked to enable
//! image tracking for the registered images. Tracking events come back over
//! a channel wrapped in a [`FeatureHandle`]; dropping or unsubscribing the
//! handle stops the feed.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::TryRecvError;
use tracing::{debug, warn};

use crate::registry::TrackingImage;
use crate::tracking::{EventReceiver, TrackingEvent};

use super::error::SessionError;

/// Kind of session requested from the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionMode {
    #[default]
    ImmersiveAr,
    ImmersiveVr,
    Inline,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionMode::ImmersiveAr => "immersive-ar",
            SessionMode::ImmersiveVr => "immersive-vr",
            SessionMode::Inline => "inline",
        })
    }
}

/// An XR runtime able to track registered images.
pub trait XrRuntime {
    /// Capability probe, called once at startup.
    fn supports_session(&self, mode: SessionMode) -> bool;

    /// Start tracking `images`. Events for them arrive through the handle.
    fn enable_image_tracking(
        &mut self,
        images: &[TrackingImage],
    ) -> Result<FeatureHandle, SessionError>;
}

/// Subscription to the image-tracking event stream.
pub struct FeatureHandle {
    receiver: Option<EventReceiver>,
    stop: Arc<AtomicBool>,
    producer: Option<JoinHandle<()>>,
    disconnected: Cell<bool>,
}

impl FeatureHandle {
    /// Wrap the consumer side of an event channel. Producers should stop
    /// when `stop` is raised or when sending fails.
    pub fn new(receiver: EventReceiver, stop: Arc<AtomicBool>) -> Self {
        Self {
            receiver: Some(receiver),
            stop,
            producer: None,
            disconnected: Cell::new(false),
        }
    }

    /// Attach the producer thread so that unsubscribing can join it.
    pub fn with_producer(mut self, producer: JoinHandle<()>) -> Self {
        self.producer = Some(producer);
        self
    }

    /// Next pending event, without blocking.
    pub fn try_next(&self) -> Option<TrackingEvent> {
        let receiver = self.receiver.as_ref()?;
        match receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                if !self.disconnected.replace(true) {
                    debug!("Tracking feed closed by the runtime");
                }
                None
            }
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.receiver.is_some()
    }

    /// True once the producer has gone away and every event was consumed.
    pub fn is_exhausted(&self) -> bool {
        self.disconnected.get()
    }

    /// Stop the feed: signal the producer, drop the receiver and wait for
    /// the producer thread. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(receiver) = self.receiver.take() {
            let dropped = receiver.len();
            if dropped > 0 {
                debug!("Discarding {} undelivered tracking events", dropped);
            }
        }
        if let Some(producer) = self.producer.take() {
            if producer.join().is_err() {
                warn!("Tracking producer thread panicked");
            }
        }
    }
}

impl Drop for FeatureHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for FeatureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureHandle")
            .field("subscribed", &self.is_subscribed())
            .field("exhausted", &self.is_exhausted())
            .finish()
    }
}
