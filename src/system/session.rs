//! AR session - startup, event pump, render tick and teardown.
//!
//! The session owns the registry, the state store and the object pool. It
//! is driven from a single thread (the render thread): the caller invokes
//! [`ArSession::tick`] once per frame, which first drains pending tracking
//! events through the dispatcher and then advances idle animations.

use tracing::{debug, info};

use crate::registry::MarkerRegistry;
use crate::scene::{AssetLoader, ObjectPool, ObjectPoolConfig};
use crate::tracking::{ActiveSummary, DispatchOutcome, DispatchStats, Dispatcher, StateStore, TrackingEvent};
use crate::ui::UiSync;

use super::error::SessionError;
use super::runtime::{FeatureHandle, SessionMode, XrRuntime};

/// Configuration for an AR session.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Session mode requested from the runtime.
    pub mode: SessionMode,

    /// Object pool configuration.
    pub pool: ObjectPoolConfig,
}

/// A running marker-tracking session.
pub struct ArSession<U: UiSync> {
    registry: MarkerRegistry,
    store: StateStore,
    pool: ObjectPool,
    ui: U,

    /// Tracking subscription; `None` once the session has been shut down.
    feature: Option<FeatureHandle>,

    stats: DispatchStats,
    frame_count: u64,
    shut_down: bool,
}

impl<U: UiSync> ArSession<U> {
    /// Bring a session up.
    ///
    /// Fails fast, without constructing any dispatch machinery, when the
    /// runtime does not support the requested session mode; fails after the
    /// objects were created when image tracking cannot be enabled. In both
    /// cases the error is also reported to `ui` as status text.
    pub fn start(
        runtime: &mut dyn XrRuntime,
        registry: MarkerRegistry,
        assets: &dyn AssetLoader,
        config: &SessionConfig,
        mut ui: U,
    ) -> Result<Self, SessionError> {
        ui.status("Checking AR support...", false);
        if !runtime.supports_session(config.mode) {
            let err = SessionError::CapabilityUnsupported(config.mode);
            ui.status(&err.to_string(), true);
            return Err(err);
        }
        info!("{} session supported", config.mode);

        ui.status("Creating 3D objects...", false);
        let store = StateStore::new(registry.len());
        let mut pool = ObjectPool::new(&registry, assets, &config.pool);
        debug!("Created {} overlay objects", pool.len());

        ui.status("Enabling image tracking...", false);
        let feature = match runtime.enable_image_tracking(&registry.tracking_images()) {
            Ok(feature) => feature,
            Err(err) => {
                ui.status(&err.to_string(), true);
                pool.release();
                return Err(err);
            }
        };
        info!("Image tracking enabled for {} markers", registry.len());

        ui.publish(&store.summary());
        ui.status("AR ready! Point the camera at a marker", false);

        Ok(Self {
            registry,
            store,
            pool,
            ui,
            feature: Some(feature),
            stats: DispatchStats::default(),
            frame_count: 0,
            shut_down: false,
        })
    }

    /// Process every tracking event currently waiting, in arrival order.
    /// Returns how many were processed.
    pub fn pump(&mut self) -> usize {
        let Some(feature) = self.feature.as_ref() else {
            return 0;
        };

        let mut dispatcher = Dispatcher::new(&self.registry, &mut self.store, &mut self.pool, &mut self.ui);
        let mut processed = 0;
        while let Some(event) = feature.try_next() {
            let outcome = dispatcher.dispatch(&event);
            self.stats.record(&outcome);
            processed += 1;
        }
        processed
    }

    /// Handle one event delivered directly by a callback-style runtime.
    /// Returns `None` once the session has been shut down.
    pub fn handle_event(&mut self, event: &TrackingEvent) -> Option<DispatchOutcome> {
        if self.shut_down {
            return None;
        }
        let outcome =
            Dispatcher::new(&self.registry, &mut self.store, &mut self.pool, &mut self.ui).dispatch(event);
        self.stats.record(&outcome);
        Some(outcome)
    }

    /// One render frame: drain tracking events, then advance idle
    /// animations by `dt_secs`. Returns the number of events processed.
    pub fn tick(&mut self, dt_secs: f64) -> usize {
        let processed = self.pump();
        self.pool.advance(dt_secs);
        self.frame_count += 1;
        processed
    }

    /// Whether the tracking feed has ended on its own.
    pub fn feed_exhausted(&self) -> bool {
        self.feature.as_ref().map_or(true, FeatureHandle::is_exhausted)
    }

    /// Tear the session down: stop the feed, force every marker hidden,
    /// hide every object, then release the objects. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        if let Some(mut feature) = self.feature.take() {
            feature.unsubscribe();
        }

        let deactivated = self.store.force_all_hidden();
        let hidden = self.pool.hide_all();
        debug!("Teardown: {} markers deactivated, {} objects hidden", deactivated, hidden);
        self.ui.publish(&self.store.summary());

        let released = self.pool.release();
        info!(
            "Session ended after {} frames, {} events ({} objects released)",
            self.frame_count, self.stats.events, released
        );
        self.ui.status("AR session ended", false);
    }

    pub fn registry(&self) -> &MarkerRegistry {
        &self.registry
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn pool(&self) -> &ObjectPool {
        &self.pool
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut U {
        &mut self.ui
    }

    /// The UI together with the objects it should draw this frame.
    pub fn ui_and_pool(&mut self) -> (&mut U, &ObjectPool) {
        (&mut self.ui, &self.pool)
    }

    pub fn summary(&self) -> ActiveSummary {
        self.store.summary()
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn is_running(&self) -> bool {
        !self.shut_down
    }
}

impl<U: UiSync> Drop for ArSession<U> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
