//! Unified error type for Huddle.

use huddle_protocol::ProtocolError;
use huddle_room::{AdmissionError, RoomError};
use huddle_session::SessionError;
use huddle_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum HuddleError {
    /// A transport-level error (accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An event could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Identity validation or an illegal lifecycle transition.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room operation failed, or the limits are invalid.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A connection was refused at the door.
    #[error("connection rejected: {0}")]
    Admission(#[from] AdmissionError),

    /// The configuration file is not valid TOML for [`ServerConfig`].
    ///
    /// [`ServerConfig`]: crate::ServerConfig
    #[error("invalid config file: {0}")]
    Config(#[from] toml::de::Error),

    /// Reading the config file or serving HTTP failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
