//! Replays a recorded tracking trace on a producer thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::unbounded;
use tracing::{debug, info};

use crate::io::TraceEntry;
use crate::registry::TrackingImage;
use crate::system::{FeatureHandle, SessionError, SessionMode, XrRuntime};
use crate::tracking::EventSender;

use super::{MAX_SLEEP_SLICE, RuntimeCapabilities, sleep_until};

/// Configuration for trace replay.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Playback speed relative to the recording. `0` or a non-finite value
    /// sends every event immediately.
    pub speed: f64,

    /// Start over when the trace ends.
    pub looped: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            looped: false,
        }
    }
}

/// Runtime that plays back a [`TraceEntry`] list.
#[derive(Debug, Clone)]
pub struct ReplayRuntime {
    entries: Arc<Vec<TraceEntry>>,
    config: ReplayConfig,
    capabilities: RuntimeCapabilities,
}

impl ReplayRuntime {
    pub fn new(entries: Vec<TraceEntry>, config: ReplayConfig) -> Self {
        Self {
            entries: Arc::new(entries),
            config,
            capabilities: RuntimeCapabilities::default(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: RuntimeCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl XrRuntime for ReplayRuntime {
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
        let entries = Arc::clone(&self.entries);
        let config = self.config.clone();

        let producer = thread::Builder::new()
            .name("trace-replay".to_string())
            .spawn(move || replay(&entries, &config, &tx, &producer_stop))
            .map_err(|e| SessionError::FeatureUnavailable(format!("cannot start replay thread: {e}")))?;

        info!("Replaying {} tracking events", self.entries.len());
        Ok(FeatureHandle::new(rx, stop).with_producer(producer))
    }
}

/// Producer loop. Returns when the trace ends (and is not looped), the
/// consumer goes away, or a stop is requested.
fn replay(entries: &[TraceEntry], config: &ReplayConfig, tx: &EventSender, stop: &AtomicBool) {
    let realtime = config.speed.is_finite() && config.speed > 0.0;

    loop {
        let start = Instant::now();
        let Some(first) = entries.first() else {
            return;
        };

        for entry in entries {
            if realtime {
                let offset_ns = entry.timestamp_ns.saturating_sub(first.timestamp_ns) as f64;
                let due = Duration::from_secs_f64(offset_ns / 1e9 / config.speed);
                if !sleep_until(start + due, stop) {
                    return;
                }
            } else if stop.load(Ordering::SeqCst) {
                return;
            }

            if tx.send(entry.event.clone()).is_err() {
                debug!("Replay consumer disconnected");
                return;
            }
        }

        if !config.looped {
            debug!("Replay finished");
            return;
        }
        if !sleep_until(start + loop_period(entries, config), stop) {
            return;
        }
    }
}

/// Minimum time between the starts of two passes over a looped trace.
/// Never shorter than [`MAX_SLEEP_SLICE`], so a trace whose events share
/// one timestamp cannot flood the channel.
fn loop_period(entries: &[TraceEntry], config: &ReplayConfig) -> Duration {
    let span_ns = match (entries.first(), entries.last()) {
        (Some(first), Some(last)) => last.timestamp_ns.saturating_sub(first.timestamp_ns),
        _ => 0,
    };
    let span = if config.speed.is_finite() && config.speed > 0.0 {
        Duration::from_secs_f64(span_ns as f64 / 1e9 / config.speed)
    } else {
        Duration::ZERO
    };
    span.max(MAX_SLEEP_SLICE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::read_trace;
    use crate::registry::MarkerRegistry;
    use crate::tracking::TrackingEvent;

    const TRACE: &str = "\
0,added,images/marker1.jpg
1000000,updated,images/marker1.jpg,1,0,0,0,0,1,0,0,0,0,1,0,0.1,0.2,-0.5,1
2000000,removed,images/marker1.jpg
";

    fn drain(handle: &FeatureHandle) -> Vec<TrackingEvent> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = Vec::new();
        while !handle.is_exhausted() && Instant::now() < deadline {
            match handle.try_next() {
                Some(e) => events.push(e),
                None => thread::sleep(Duration::from_millis(1)),
            }
        }
        events
    }

    #[test]
    fn test_replay_delivers_in_order() {
        let entries = read_trace(TRACE.as_bytes()).unwrap();
        let mut runtime = ReplayRuntime::new(entries.clone(), ReplayConfig::default());
        let images = MarkerRegistry::default().tracking_images();

        let handle = runtime.enable_image_tracking(&images).unwrap();
        let events = drain(&handle);
        let expected: Vec<TrackingEvent> = entries.into_iter().map(|e| e.event).collect();
        assert_eq!(events, expected);
    }

    #[test]
    fn test_unsubscribe_stops_looped_replay() {
        let entries = read_trace(TRACE.as_bytes()).unwrap();
        let mut runtime = ReplayRuntime::new(
            entries,
            ReplayConfig {
                speed: 0.001,
                looped: true,
            },
        );
        let images = MarkerRegistry::default().tracking_images();

        let mut handle = runtime.enable_image_tracking(&images).unwrap();
        let started = Instant::now();
        handle.unsubscribe();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(!handle.is_subscribed());
    }

    #[test]
    fn test_looped_single_timestamp_trace_is_paced() {
        let entries = read_trace("0,added,images/marker1.jpg\n".as_bytes()).unwrap();
        let mut runtime = ReplayRuntime::new(
            entries,
            ReplayConfig {
                speed: 1.0,
                looped: true,
            },
        );
        let images = MarkerRegistry::default().tracking_images();

        let mut handle = runtime.enable_image_tracking(&images).unwrap();
        thread::sleep(Duration::from_millis(100));
        let mut queued = 0;
        while handle.try_next().is_some() {
            queued += 1;
        }
        handle.unsubscribe();

        // One pass per MAX_SLEEP_SLICE at most.
        assert!(queued >= 1);
        assert!(queued <= 10, "{queued} events queued in 100 ms");
    }

    #[test]
    fn test_loop_period_follows_trace_span() {
        let entries = read_trace(TRACE.as_bytes()).unwrap();
        let config = |speed| ReplayConfig {
            speed,
            looped: true,
        };
        assert_eq!(loop_period(&entries, &config(1.0)), MAX_SLEEP_SLICE);
        approx::assert_relative_eq!(
            loop_period(&entries, &config(0.01)).as_secs_f64(),
            0.2,
            epsilon = 1e-6
        );
        assert_eq!(loop_period(&entries, &config(0.0)), MAX_SLEEP_SLICE);
        assert_eq!(loop_period(&[], &config(1.0)), MAX_SLEEP_SLICE);
    }

    #[test]
    fn test_refuses_when_disabled() {
        let mut runtime = ReplayRuntime::new(Vec::new(), ReplayConfig::default())
            .with_capabilities(RuntimeCapabilities {
                session_supported: false,
                image_tracking: false,
            });
        assert!(!runtime.supports_session(SessionMode::ImmersiveAr));
        let images = MarkerRegistry::default().tracking_images();
        assert!(runtime.enable_image_tracking(&images).is_err());
    }
}
