//! Marker tracking: event types, per-marker state and the dispatcher that
//! keeps overlay objects in sync with the tracking feed.

pub mod dispatcher;
pub mod events;
pub mod result;
pub mod state;
pub mod store;

pub use dispatcher::Dispatcher;
pub use events::{EventKind, EventReceiver, EventSender, TrackingEvent};
pub use result::{ActiveSummary, DispatchOutcome, DispatchStats};
pub use state::MarkerVisibility;
pub use store::{StateStore, TrackedState};
