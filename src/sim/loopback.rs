//! Runtime whose event sender is handed to the caller.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crossbeam_channel::unbounded;

use crate::registry::TrackingImage;
use crate::system::{FeatureHandle, SessionError, SessionMode, XrRuntime};
use crate::tracking::EventSender;

use super::RuntimeCapabilities;

/// The caller pushes events itself through [`LoopbackRuntime::sender`].
#[derive(Debug, Default)]
pub struct LoopbackRuntime {
    capabilities: RuntimeCapabilities,
    images: Vec<TrackingImage>,
    sender: Option<EventSender>,
}

impl LoopbackRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(capabilities: RuntimeCapabilities) -> Self {
        Self {
            capabilities,
            ..Self::default()
        }
    }

    /// Sender for the active feature, once image tracking is enabled.
    pub fn sender(&self) -> Option<EventSender> {
        self.sender.clone()
    }

    /// Images passed to the last successful `enable_image_tracking`.
    pub fn enabled_images(&self) -> &[TrackingImage] {
        &self.images
    }
}

impl XrRuntime for LoopbackRuntime {
    fn supports_session(&self, mode: SessionMode) -> bool {
        self.capabilities.session_supported && mode == SessionMode::ImmersiveAr
    }

    fn enable_image_tracking(
        &mut self,
        images: &[TrackingImage],
    ) -> Result<FeatureHandle, SessionError> {
        self.capabilities.check_image_tracking(images.len())?;

        let (tx, rx) = unbounded();
        self.images = images.to_vec();
        self.sender = Some(tx);
        Ok(FeatureHandle::new(rx, Arc::new(AtomicBool::new(false))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::TrackingEvent;

    #[test]
    fn test_loopback_delivers() {
        let mut runtime = LoopbackRuntime::new();
        assert!(runtime.supports_session(SessionMode::ImmersiveAr));
        assert!(!runtime.supports_session(SessionMode::ImmersiveVr));
        assert!(runtime.sender().is_none());

        let images = vec![TrackingImage {
            image_ref: "images/a.jpg".into(),
            estimated_real_world_width: 0.1,
        }];
        let handle = runtime.enable_image_tracking(&images).unwrap();
        runtime.sender().unwrap().send(TrackingEvent::added("images/a.jpg")).unwrap();
        assert_eq!(handle.try_next(), Some(TrackingEvent::added("images/a.jpg")));
        assert_eq!(runtime.enabled_images(), images.as_slice());
    }

    #[test]
    fn test_no_images_is_unavailable() {
        let mut runtime = LoopbackRuntime::new();
        assert!(matches!(
            runtime.enable_image_tracking(&[]),
            Err(SessionError::FeatureUnavailable(_))
        ));
    }
}
