//! Error types for the room layer.
//!
//! Each error a client should hear about maps to exactly one
//! [`ServerEvent`] through `client_event()`, so callers never inspect
//! message text.

use huddle_protocol::{ConnectionId, RoomId, ServerEvent};
use huddle_session::SessionError;

const SERVER_AT_CAPACITY: &str = "Server at capacity. Please try again later.";
const ROOM_AT_CAPACITY: &str = "Room is at maximum capacity";
const ROOM_BUSY_ON_ADMIT: &str = "Room is busy. Please try again later.";
const ROOM_BUSY: &str = "Room is busy, please retry";
const NO_SEATS: &str = "No seats available";

/// Errors from operations on an existing room.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The connection is already a member.
    #[error("{0} already in room {1}")]
    AlreadyInRoom(ConnectionId, RoomId),

    /// The connection is not (or no longer) a member.
    #[error("{0} not in room {1}")]
    NotInRoom(ConnectionId, RoomId),

    /// The room holds its maximum number of participants.
    #[error("room {0} is at maximum capacity")]
    RoomFull(RoomId),

    /// Every seat in the pool is taken.
    #[error("no seats available in room {0}")]
    SeatsExhausted(RoomId),

    /// The supplied name or character failed validation.
    #[error(transparent)]
    InvalidIdentity(#[from] SessionError),

    /// The room's mailbox is full.
    #[error("room {0} is busy")]
    Busy(RoomId),

    /// The room actor has shut down; it was emptied and deleted.
    #[error("room {0} is closed")]
    Closed(RoomId),

    /// A limit was configured as zero.
    #[error("invalid room limits: {0} must be greater than zero")]
    InvalidConfig(&'static str),
}

impl RoomError {
    /// The event the affected client receives, if any.
    ///
    /// Membership and lifecycle errors are internal: they only occur when a
    /// connection races its own removal, and the client learns about that
    /// from the socket closing.
    pub fn client_event(&self) -> Option<ServerEvent> {
        match self {
            Self::RoomFull(_) => Some(ServerEvent::room_full(ROOM_AT_CAPACITY)),
            Self::SeatsExhausted(_) => Some(ServerEvent::room_full(NO_SEATS)),
            Self::InvalidIdentity(SessionError::InvalidIdentity(reason)) => {
                Some(ServerEvent::error(*reason))
            }
            Self::Busy(_) => Some(ServerEvent::error(ROOM_BUSY)),
            _ => None,
        }
    }
}

/// Why the gatekeeper refused a connection. Every variant is fatal for
/// the connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    /// The upgrade request carried no (or an empty) room id.
    #[error("no room id provided")]
    MissingRoomId,

    /// Creating another room would exceed `max_rooms`.
    #[error("server at capacity ({max_rooms} rooms)")]
    ServerAtCapacity { max_rooms: usize },

    /// The room exists and is full.
    #[error("room {0} is at maximum capacity")]
    RoomAtCapacity(RoomId),

    /// The room's mailbox stayed full.
    #[error("room {0} is busy")]
    RoomBusy(RoomId),
}

impl AdmissionError {
    /// The event sent before the connection is closed. A missing room id
    /// closes the connection without any exchange.
    pub fn client_event(&self) -> Option<ServerEvent> {
        match self {
            Self::MissingRoomId => None,
            Self::ServerAtCapacity { .. } => Some(ServerEvent::error(SERVER_AT_CAPACITY)),
            Self::RoomAtCapacity(_) => Some(ServerEvent::room_full(ROOM_AT_CAPACITY)),
            Self::RoomBusy(_) => Some(ServerEvent::error(ROOM_BUSY_ON_ADMIT)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> RoomId {
        RoomId::new("R1").unwrap()
    }

    #[test]
    fn test_room_error_events() {
        assert_eq!(
            RoomError::SeatsExhausted(room()).client_event(),
            Some(ServerEvent::room_full("No seats available"))
        );
        assert_eq!(
            RoomError::Busy(room()).client_event(),
            Some(ServerEvent::error("Room is busy, please retry"))
        );
        let invalid = RoomError::from(SessionError::InvalidIdentity(
            "Name and character are required",
        ));
        assert_eq!(
            invalid.client_event(),
            Some(ServerEvent::error("Name and character are required"))
        );
    }

    #[test]
    fn test_internal_errors_stay_silent() {
        let conn = ConnectionId::new(1);
        assert_eq!(RoomError::NotInRoom(conn, room()).client_event(), None);
        assert_eq!(RoomError::Closed(room()).client_event(), None);
    }

    #[test]
    fn test_admission_events() {
        assert_eq!(AdmissionError::MissingRoomId.client_event(), None);
        assert_eq!(
            AdmissionError::ServerAtCapacity { max_rooms: 100 }.client_event(),
            Some(ServerEvent::error("Server at capacity. Please try again later."))
        );
        assert_eq!(
            AdmissionError::RoomAtCapacity(room()).client_event(),
            Some(ServerEvent::room_full("Room is at maximum capacity"))
        );
        assert_eq!(
            AdmissionError::RoomBusy(room()).client_event(),
            Some(ServerEvent::error("Room is busy. Please try again later."))
        );
    }
}
