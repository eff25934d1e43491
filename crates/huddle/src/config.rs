//! Server configuration, loaded from TOML.

use std::path::Path;
use std::time::Duration;

use huddle_room::{RoomError, RoomLimits};
use serde::{Deserialize, Serialize};

use crate::HuddleError;

/// Everything the server can be configured with.
///
/// Every section and field is optional in the file:
///
/// ```toml
/// [listen]
/// ws_addr = "0.0.0.0:3000"
/// http_addr = "0.0.0.0:3001"
///
/// [limits]
/// max_rooms = 100
/// max_users_per_room = 20
/// seat_capacity = 20
///
/// [connection]
/// ping_interval_secs = 25
/// ping_timeout_secs = 60
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub limits: RoomLimits,
    #[serde(default)]
    pub connection: ConnectionConfig,
}

/// Listen addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenConfig {
    /// WebSocket endpoint clients connect to.
    #[serde(default = "default_ws_addr")]
    pub ws_addr: String,

    /// Operator HTTP endpoints (`/health`, `/stats`, `/rooms/{id}`).
    #[serde(default = "default_http_addr")]
    pub http_addr: String,
}

fn default_ws_addr() -> String {
    "0.0.0.0:3000".to_owned()
}

fn default_http_addr() -> String {
    "0.0.0.0:3001".to_owned()
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            ws_addr: default_ws_addr(),
            http_addr: default_http_addr(),
        }
    }
}

/// Keep-alive settings for client connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Interval between server pings.
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    /// Silence after which a connection is dropped.
    #[serde(default = "default_ping_timeout_secs")]
    pub ping_timeout_secs: u64,
}

fn default_ping_interval_secs() -> u64 {
    25
}

fn default_ping_timeout_secs() -> u64 {
    60
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: default_ping_interval_secs(),
            ping_timeout_secs: default_ping_timeout_secs(),
        }
    }
}

impl ConnectionConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }
}

impl ServerConfig {
    /// Reads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HuddleError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parses and validates TOML text.
    pub fn from_toml(text: &str) -> Result<Self, HuddleError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks limits and keep-alive settings for zero values.
    pub fn validate(&self) -> Result<(), HuddleError> {
        self.limits.validate()?;
        if self.connection.ping_interval_secs == 0 {
            return Err(RoomError::InvalidConfig("ping_interval_secs").into());
        }
        if self.connection.ping_timeout_secs == 0 {
            return Err(RoomError::InvalidConfig("ping_timeout_secs").into());
        }
        Ok(())
    }
}
