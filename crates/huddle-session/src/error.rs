//! Error types for the session layer.

use crate::{SessionEvent, SessionPhase};

/// Errors that can occur while binding identity or advancing a
/// connection through its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The client supplied an empty display name or character.
    /// Recoverable: the client may retry with corrected input.
    #[error("invalid identity: {0}")]
    InvalidIdentity(&'static str),

    /// The event is not legal in the current phase, e.g. anything after
    /// the connection has been disconnected.
    #[error("cannot apply {event:?} in phase {from}")]
    InvalidTransition {
        from: SessionPhase,
        event: SessionEvent,
    },
}
