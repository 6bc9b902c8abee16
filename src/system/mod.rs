//! Session orchestration and the boundary to the XR runtime.
//!
//! This module contains the top-level [`ArSession`] that owns the marker
//! state and objects, the [`XrRuntime`] trait the session is driven by, and
//! the startup errors.

pub mod error;
pub mod runtime;
mod session;

pub use error::SessionError;
pub use runtime::{FeatureHandle, SessionMode, XrRuntime};
pub use session::{ArSession, SessionConfig};
