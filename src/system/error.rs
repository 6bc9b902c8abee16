//! Startup failures that prevent a tracking session from running.

use thiserror::Error;

use super::runtime::SessionMode;

/// Errors surfaced while bringing a session up.
///
/// Both variants are fatal for the session and are never retried; the user
/// has to restart the session after fixing the cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The device/runtime cannot run the requested session mode.
    #[error("{0} sessions are not supported on this device")]
    CapabilityUnsupported(SessionMode),

    /// The session mode is available but image tracking could not be enabled.
    #[error("image tracking could not be enabled: {0}")]
    FeatureUnavailable(String),
}
