//! Transport abstraction layer for Huddle.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the network protocol carrying client events. The coordinator only ever
//! sees bytes plus the parameters of the request that opened the
//! connection ([`ConnectRequest`]).
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Opaque identifier for a connection.
///
/// Unique for the lifetime of the process: a reconnecting client always
/// gets a fresh id. Serializes as a plain number because it doubles as the
/// participant `id` in roster snapshots.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The request line of the upgrade that opened a connection.
///
/// Clients pass their admission parameters (the room id) in the query
/// string, so the transport keeps it around for the handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Request path, e.g. `/`.
    pub path: String,
    /// Raw query string without the leading `?`, if any.
    pub query: Option<String>,
}

impl ConnectRequest {
    /// Deserializes the query string into `T`, the way axum's `Query`
    /// extractor does. A request without a query parses as an empty one.
    pub fn query<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_urlencoded::from_str(self.query.as_deref().unwrap_or(""))
            .map_err(TransportError::InvalidQuery)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that can send and receive bytes.
///
/// Sending and receiving must not block each other: a handler waits in
/// `recv` while room broadcasts are pushed through `send`.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends data to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Sends a keep-alive probe. Transports without one may no-op.
    async fn ping(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Time since the last frame of any kind arrived from the peer.
    fn idle_for(&self) -> Duration;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Returns the request that opened this connection.
    fn request(&self) -> &ConnectRequest;
}
