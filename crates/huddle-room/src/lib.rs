//! Room state for Huddle.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! participants and seat pool. Rooms are created on the first admitted
//! connection and deleted the moment their last participant leaves.
//!
//! # Key types
//!
//! - [`Gatekeeper`]: admits connections, creating rooms on demand
//! - [`Registry`]: room id to running actor
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`Room`]: the per-room data model, with seat and capacity invariants
//! - [`RoomLimits`]: capacity and queue limits

mod actor;
mod config;
mod error;
mod gatekeeper;
mod presence;
mod registry;
mod room;
mod seats;

pub use actor::{DisconnectReason, RoomHandle};
pub use config::RoomLimits;
pub use error::{AdmissionError, RoomError};
pub use gatekeeper::Gatekeeper;
pub use presence::ParticipantSender;
pub use registry::Registry;
pub use room::{Participant, ParticipantSnapshot, Room, RoomInfo, RoomSnapshot, SeatGrant};
pub use seats::SeatPool;
