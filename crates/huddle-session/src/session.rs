//! The per-connection lifecycle state machine.
//!
//! Every connection walks through the same phases:
//!
//! ```text
//!   Connecting ──admit──→ Admitted ──bind──→ Identified ──seat──→ Seated
//!                            │   └─────────────seat──────────────→ ↑ │
//!                            │                                       │ (seat: idempotent)
//!                            └──────────→ Disconnected ←─────────────┘
//! ```
//!
//! - **Connecting**: transport accepted, not yet admitted to a room.
//! - **Admitted**: in a room's roster, no identity yet.
//! - **Identified**: a name and character are bound. Rebinding is allowed.
//! - **Seated**: holds a seat. Asking again keeps the same seat. A seat
//!   does not require an identity.
//! - **Disconnected**: terminal. A reconnecting client is a new
//!   connection and starts over at `Connecting`.

use std::fmt;

use crate::SessionError;

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    Connecting,
    Admitted,
    Identified,
    Seated,
    Disconnected,
}

/// Things that happen to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    /// The gatekeeper put the connection into a room.
    Admitted,
    /// The session binder stored a name and character.
    IdentityBound,
    /// The seat allocator granted (or re-confirmed) a seat.
    SeatGranted,
    /// The transport went away, or the server evicted the connection.
    Disconnected,
}

impl SessionPhase {
    /// Derives the phase of a connection that is a room member.
    pub fn of_member(identified: bool, seated: bool) -> Self {
        match (identified, seated) {
            (_, true) => Self::Seated,
            (true, false) => Self::Identified,
            (false, false) => Self::Admitted,
        }
    }

    /// Applies `event`, returning the next phase.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidTransition`] for events that make no
    /// sense in the current phase.
    pub fn apply(self, event: SessionEvent) -> Result<Self, SessionError> {
        use SessionEvent as E;

        let next = match (self, event) {
            (Self::Disconnected, _) => None,
            (_, E::Disconnected) => Some(Self::Disconnected),
            (Self::Connecting, E::Admitted) => Some(Self::Admitted),
            (Self::Admitted | Self::Identified, E::IdentityBound) => Some(Self::Identified),
            // Rebinding a name never gives up the seat.
            (Self::Seated, E::IdentityBound) => Some(Self::Seated),
            (Self::Admitted | Self::Identified | Self::Seated, E::SeatGranted) => {
                Some(Self::Seated)
            }
            _ => None,
        };

        next.ok_or(SessionError::InvalidTransition { from: self, event })
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::Admitted => write!(f, "Admitted"),
            Self::Identified => write!(f, "Identified"),
            Self::Seated => write!(f, "Seated"),
            Self::Disconnected => write!(f, "Disconnected"),
        }
    }
}
