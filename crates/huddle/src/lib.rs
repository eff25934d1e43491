//! # Huddle
//!
//! Real-time room presence coordinator.
//!
//! Clients connect over WebSocket with a room id
//! (`ws://host:3000/?roomId=R1`), pick a name and character, and claim one
//! of a fixed pool of seats. Every member of a room receives the full
//! roster whenever it changes. Rooms exist only while someone is in them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use huddle::prelude::*;
//!
//! # async fn run() -> Result<(), HuddleError> {
//! let config = ServerConfig::default();
//! let server = HuddleServerBuilder::from_config(&config).build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;
pub mod telemetry;

pub use config::{ConnectionConfig, ListenConfig, ServerConfig};
pub use error::HuddleError;
pub use server::{HuddleServer, HuddleServerBuilder};

pub mod prelude {
    pub use crate::{
        ConnectionConfig, HuddleError, HuddleServer, HuddleServerBuilder, ListenConfig,
        ServerConfig,
    };
    pub use huddle_protocol::{
        ClientEvent, ConnectionId, RoomId, RosterEntry, Rotation, ServerEvent,
    };
    pub use huddle_room::{DisconnectReason, Registry, RoomLimits};
}
