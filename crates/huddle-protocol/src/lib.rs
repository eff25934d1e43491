//! Wire protocol for Huddle.
//!
//! This crate defines the "language" browser clients and the coordinator
//! speak:
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`RosterEntry`],
//!   [`RoomId`], [`Rotation`]): the events that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those events are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while doing so.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (events) → Room actors (presence state)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    CameraUpdate, ClientEvent, ConnectionId, JoinRoom, RoomId, RosterEntry, Rotation,
    ServerEvent,
};
