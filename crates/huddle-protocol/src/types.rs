//! Core protocol types for Huddle's wire format.
//!
//! Every type here travels "on the wire": clients and the coordinator
//! exchange JSON objects of the shape
//!
//! ```text
//! { "event": "<name>", "data": <payload> }
//! ```
//!
//! Event names and field names are camelCase because the clients are
//! browser applications.

use std::fmt;

use serde::{Deserialize, Serialize};

pub use huddle_transport::ConnectionId;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The identifier of a room.
///
/// Room ids are opaque strings chosen by clients (typically shared by link),
/// so unlike connection ids they are never generated by the server. The only
/// rule is that they are non-empty, which [`RoomId::new`] enforces.
///
/// `#[serde(transparent)]` makes a `RoomId("R1")` serialize as just `"R1"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Creates a room id, or `None` if `raw` is empty.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.is_empty() { None } else { Some(Self(raw)) }
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Transient state
// ---------------------------------------------------------------------------

/// A two-axis camera orientation. The last value a client sends wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub x: f64,
    pub y: f64,
}

// ---------------------------------------------------------------------------
// Client → coordinator
// ---------------------------------------------------------------------------

/// Payload of `joinRoom`: the identity a client wants to show.
///
/// Both fields default to empty when missing so that an incomplete
/// `joinRoom` reaches the session binder and is rejected there with a
/// proper validation error instead of a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoom {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub character: String,
}

/// Payload of `cameraUpdate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraUpdate {
    pub rotation: Rotation,
}

/// Events a client sends after its connection has been admitted.
///
/// `#[serde(tag = "event", content = "data")]` produces "adjacently
/// tagged" JSON:
///   `{ "event": "joinRoom", "data": { "name": "Ann", "character": "Student1" } }`
/// Unit variants carry no `data` at all:
///   `{ "event": "requestSeat" }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Attach a display name and character to this connection.
    JoinRoom(JoinRoom),

    /// Ask for the lowest free seat.
    RequestSeat,

    /// Store the latest camera orientation.
    CameraUpdate(CameraUpdate),
}

// ---------------------------------------------------------------------------
// Coordinator → client
// ---------------------------------------------------------------------------

/// One participant as seen by other room members.
///
/// Identity fields and the seat stay absent from the JSON until they are
/// set, so spectators serialize as just `{ "id": 7 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: ConnectionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_index: Option<usize>,
}

/// Events the coordinator sends to clients.
///
/// Every rejection a client should react to has its own event, so a UI
/// can branch on `event` without inspecting message text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// A seat was reserved for the receiving connection.
    #[serde(rename_all = "camelCase")]
    SeatAssigned { seat_index: usize },

    /// Full roster snapshot of the receiver's room, in join order.
    UpdateUsers(Vec<RosterEntry>),

    /// A recoverable protocol or validation failure, or the reason an
    /// admission was refused.
    Error { message: String },

    /// The seat pool or the room's participant cap is exhausted.
    RoomFull { message: String },
}

impl ServerEvent {
    /// Builds an `error` event.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Builds a `roomFull` event.
    pub fn room_full(message: impl Into<String>) -> Self {
        Self::RoomFull {
            message: message.into(),
        }
    }

    /// The wire name of this event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SeatAssigned { .. } => "seatAssigned",
            Self::UpdateUsers(_) => "updateUsers",
            Self::Error { .. } => "error",
            Self::RoomFull { .. } => "roomFull",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
