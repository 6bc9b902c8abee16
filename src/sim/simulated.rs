//! Synthetic tracking feed: markers randomly appear in front of the camera,
//! drift a little while tracked, and disappear again.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, ensure};
use crossbeam_channel::unbounded;
use nalgebra::{UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::geometry::{Pose, TransformMatrix};
use crate::registry::TrackingImage;
use crate::system::{FeatureHandle, SessionError, SessionMode, XrRuntime};
use crate::tracking::TrackingEvent;

use super::{RuntimeCapabilities, sleep_until};

/// Image reference used for stray detections of unregistered images.
pub const STRAY_IMAGE_REF: &str = "images/unregistered.jpg";

/// Configuration for the synthetic feed.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,

    /// Time between feed steps.
    pub step_interval: Duration,

    /// Stop after this many steps (`None` runs until unsubscribed).
    pub steps: Option<usize>,

    /// Upper bound on simultaneously tracked markers.
    pub max_visible: usize,

    /// Per-step chance that a hidden marker is found.
    pub appear_probability: f64,

    /// Per-step chance that a tracked marker is lost.
    pub disappear_probability: f64,

    /// Per-step chance of a detection for an image that is not registered.
    pub stray_probability: f64,

    /// Random-walk step for positions (meters) and orientations (radians).
    pub walk_step_m: f64,
    pub walk_step_rad: f64,
}

impl SimulationConfig {
    /// Reject values the random generator cannot work with.
    pub fn validate(&self) -> Result<()> {
        for (name, p) in [
            ("appear_probability", self.appear_probability),
            ("disappear_probability", self.disappear_probability),
            ("stray_probability", self.stray_probability),
        ] {
            ensure!(p.is_finite(), "{name} must be finite, got {p}");
        }
        for (name, step) in [
            ("walk_step_m", self.walk_step_m),
            ("walk_step_rad", self.walk_step_rad),
        ] {
            ensure!(step.is_finite(), "{name} must be finite, got {step}");
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            step_interval: Duration::from_millis(33),
            steps: None,
            max_visible: 3,
            appear_probability: 0.02,
            disappear_probability: 0.01,
            stray_probability: 0.0,
            walk_step_m: 0.002,
            walk_step_rad: 0.01,
        }
    }
}

struct SimMarker {
    image_ref: String,
    visible: bool,
    pose: Pose,
}

/// Deterministic (given a seed) event generator behind [`SimulatedRuntime`].
pub struct SimulatedFeed {
    rng: StdRng,
    markers: Vec<SimMarker>,
    config: SimulationConfig,
}

impl SimulatedFeed {
    /// Probabilities are clamped to `[0, 1]`; non-finite values are an error.
    pub fn new(images: &[TrackingImage], config: &SimulationConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut config = config.clone();
        config.appear_probability = config.appear_probability.clamp(0.0, 1.0);
        config.disappear_probability = config.disappear_probability.clamp(0.0, 1.0);
        config.stray_probability = config.stray_probability.clamp(0.0, 1.0);
        config.walk_step_m = config.walk_step_m.abs();
        config.walk_step_rad = config.walk_step_rad.abs();

        let markers = images
            .iter()
            .map(|image| SimMarker {
                image_ref: image.image_ref.clone(),
                visible: false,
                pose: Pose::identity(),
            })
            .collect();

        Ok(Self {
            rng,
            markers,
            config,
        })
    }

    pub fn visible_count(&self) -> usize {
        self.markers.iter().filter(|m| m.visible).count()
    }

    /// Events produced by one step, in delivery order.
    pub fn step(&mut self) -> Vec<TrackingEvent> {
        let mut events = Vec::new();
        let mut visible = self.visible_count();

        for i in 0..self.markers.len() {
            if self.markers[i].visible {
                if self.rng.gen_bool(self.config.disappear_probability) {
                    self.markers[i].visible = false;
                    visible -= 1;
                    events.push(TrackingEvent::removed(self.markers[i].image_ref.clone()));
                } else {
                    let delta = self.random_walk();
                    let marker = &mut self.markers[i];
                    marker.pose = marker.pose.compose(&delta);
                    events.push(TrackingEvent::updated(
                        marker.image_ref.clone(),
                        TransformMatrix::from_pose(&marker.pose),
                    ));
                }
            } else if visible < self.config.max_visible
                && self.rng.gen_bool(self.config.appear_probability)
            {
                let pose = self.random_placement();
                let marker = &mut self.markers[i];
                marker.visible = true;
                marker.pose = pose;
                visible += 1;
                let transform = TransformMatrix::from_pose(&pose);
                events.push(TrackingEvent::Added {
                    src: marker.image_ref.clone(),
                    transform: Some(transform),
                });
                events.push(TrackingEvent::updated(marker.image_ref.clone(), transform));
            }
        }

        if self.rng.gen_bool(self.config.stray_probability) {
            events.push(TrackingEvent::added(STRAY_IMAGE_REF));
        }

        events
    }

    /// A pose somewhere in front of the camera, roughly facing it.
    fn random_placement(&mut self) -> Pose {
        let position = Vector3::new(
            self.rng.gen_range(-0.3..=0.3),
            self.rng.gen_range(-0.2..=0.2),
            self.rng.gen_range(-1.0..=-0.4),
        );
        let rotation = UnitQuaternion::from_euler_angles(
            self.rng.gen_range(-0.3..=0.3),
            self.rng.gen_range(-0.3..=0.3),
            self.rng.gen_range(-0.3..=0.3),
        );
        Pose::new(position, rotation)
    }

    fn random_walk(&mut self) -> Pose {
        let s = self.config.walk_step_m;
        let r = self.config.walk_step_rad;
        Pose::new(
            Vector3::new(
                self.rng.gen_range(-s..=s),
                self.rng.gen_range(-s..=s),
                self.rng.gen_range(-s..=s),
            ),
            UnitQuaternion::from_euler_angles(
                self.rng.gen_range(-r..=r),
                self.rng.gen_range(-r..=r),
                self.rng.gen_range(-r..=r),
            ),
        )
    }
}

/// Runtime backed by a [`SimulatedFeed`] on a producer thread.
#[derive(Debug, Clone, Default)]
pub struct SimulatedRuntime {
    config: SimulationConfig,
    capabilities: RuntimeCapabilities,
}

impl SimulatedRuntime {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            capabilities: RuntimeCapabilities::default(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: RuntimeCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

impl XrRuntime for SimulatedRuntime {
    fn supports_session(&self, mode: SessionMode) -> bool {
        self.capabilities.session_supported && mode == SessionMode::ImmersiveAr
    }

    fn enable_image_tracking(
        &mut self,
        images: &[TrackingImage],
    ) -> Result<FeatureHandle, SessionError> {
        self.capabilities.check_image_tracking(images.len())?;

        let (tx, rx) = unbounded();
        let stop = Arc::new(AtomicBool::new(false));
        let producer_stop = Arc::clone(&stop);
        let mut feed = SimulatedFeed::new(images, &self.config)
            .map_err(|e| SessionError::FeatureUnavailable(format!("invalid simulation config: {e:#}")))?;
        let interval = self.config.step_interval;
        let steps = self.config.steps;

        let producer = thread::Builder::new()
            .name("simulated-tracker".to_string())
            .spawn(move || {
                let mut next = Instant::now();
                let mut step = 0usize;
                while steps.map_or(true, |n| step < n) {
                    for event in feed.step() {
                        if tx.send(event).is_err() {
                            return;
                        }
                    }
                    step += 1;
                    next += interval;
                    if !sleep_until(next, &producer_stop) {
                        return;
                    }
                }
                debug!("Simulated feed finished after {} steps", step);
            })
            .map_err(|e| {
                SessionError::FeatureUnavailable(format!("cannot start simulated tracker: {e}"))
            })?;

        Ok(FeatureHandle::new(rx, stop).with_producer(producer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MarkerRegistry;
    use std::collections::HashSet;

    fn config(seed: u64) -> SimulationConfig {
        SimulationConfig {
            seed: Some(seed),
            appear_probability: 0.3,
            disappear_probability: 0.2,
            ..Default::default()
        }
    }

    #[test]
    fn test_same_seed_same_events() {
        let images = MarkerRegistry::default().tracking_images();
        let mut a = SimulatedFeed::new(&images, &config(7)).unwrap();
        let mut b = SimulatedFeed::new(&images, &config(7)).unwrap();
        for _ in 0..50 {
            assert_eq!(a.step(), b.step());
        }
    }

    #[test]
    fn test_feed_respects_state_machine() {
        let images = MarkerRegistry::default().tracking_images();
        let mut feed = SimulatedFeed::new(&images, &config(11)).unwrap();
        let mut visible: HashSet<String> = HashSet::new();

        for _ in 0..500 {
            for event in feed.step() {
                match event {
                    TrackingEvent::Added { src, .. } => assert!(visible.insert(src)),
                    TrackingEvent::Removed { src } => assert!(visible.remove(&src)),
                    TrackingEvent::Updated { src, transform } => {
                        assert!(visible.contains(&src));
                        assert!(transform.decompose().is_ok());
                    }
                }
            }
            assert!(visible.len() <= 3);
            assert_eq!(visible.len(), feed.visible_count());
        }
    }

    #[test]
    fn test_stray_detections() {
        let images = MarkerRegistry::default().tracking_images();
        let mut feed = SimulatedFeed::new(
            &images,
            &SimulationConfig {
                seed: Some(3),
                appear_probability: 0.0,
                stray_probability: 1.0,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(feed.step(), vec![TrackingEvent::added(STRAY_IMAGE_REF)]);
    }

    #[test]
    fn test_non_finite_config_is_rejected() {
        let images = MarkerRegistry::default().tracking_images();
        let bad = [
            SimulationConfig {
                appear_probability: f64::NAN,
                ..Default::default()
            },
            SimulationConfig {
                disappear_probability: f64::INFINITY,
                ..Default::default()
            },
            SimulationConfig {
                walk_step_rad: f64::NAN,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(SimulatedFeed::new(&images, &config).is_err());
        }

        let mut runtime = SimulatedRuntime::new(SimulationConfig {
            stray_probability: f64::NAN,
            ..Default::default()
        });
        assert!(matches!(
            runtime.enable_image_tracking(&images),
            Err(SessionError::FeatureUnavailable(_))
        ));
    }

    #[test]
    fn test_out_of_range_probability_is_clamped() {
        let images = MarkerRegistry::default().tracking_images();
        let mut feed = SimulatedFeed::new(
            &images,
            &SimulationConfig {
                seed: Some(1),
                appear_probability: 4.0,
                disappear_probability: -1.0,
                ..Default::default()
            },
        )
        .unwrap();
        feed.step();
        assert_eq!(feed.visible_count(), 3);
    }

    #[test]
    fn test_runtime_runs_fixed_number_of_steps() {
        let mut runtime = SimulatedRuntime::new(SimulationConfig {
            seed: Some(5),
            step_interval: Duration::from_millis(1),
            steps: Some(20),
            appear_probability: 1.0,
            disappear_probability: 0.0,
            ..Default::default()
        });
        let images = MarkerRegistry::default().tracking_images();
        let handle = runtime.enable_image_tracking(&images).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = Vec::new();
        while !handle.is_exhausted() && Instant::now() < deadline {
            match handle.try_next() {
                Some(e) => events.push(e),
                None => thread::sleep(Duration::from_millis(1)),
            }
        }

        // Step 1 finds three markers (Added + Updated each), the remaining
        // 19 steps move them.
        assert_eq!(events.len(), 3 * 2 + 19 * 3);
        assert!(handle.is_exhausted());
    }
}
