//! Capacity limits shared by the gatekeeper and every room.

use serde::{Deserialize, Serialize};

use crate::RoomError;

/// Capacity and queue limits.
///
/// Every field has a default so a config file only has to name what it
/// changes:
///
/// ```toml
/// [limits]
/// max_rooms = 10
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomLimits {
    /// Rooms that may exist at once. Only checked when creating a room.
    #[serde(default = "default_max_rooms")]
    pub max_rooms: usize,

    /// Participants (seated or not) a single room admits.
    #[serde(default = "default_max_users_per_room")]
    pub max_users_per_room: usize,

    /// Size of each room's seat pool. Seats are `0..seat_capacity`.
    #[serde(default = "default_seat_capacity")]
    pub seat_capacity: usize,

    /// Commands a room actor buffers before callers see `Busy`.
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,

    /// Events buffered per connection before the connection is evicted
    /// as a slow consumer.
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,
}

fn default_max_rooms() -> usize {
    100
}

fn default_max_users_per_room() -> usize {
    20
}

fn default_seat_capacity() -> usize {
    20
}

fn default_mailbox_capacity() -> usize {
    64
}

fn default_outbound_capacity() -> usize {
    256
}

impl Default for RoomLimits {
    fn default() -> Self {
        Self {
            max_rooms: default_max_rooms(),
            max_users_per_room: default_max_users_per_room(),
            seat_capacity: default_seat_capacity(),
            mailbox_capacity: default_mailbox_capacity(),
            outbound_capacity: default_outbound_capacity(),
        }
    }
}

impl RoomLimits {
    /// Rejects limits that would make every admission (or every channel)
    /// fail.
    ///
    /// # Errors
    /// Returns [`RoomError::InvalidConfig`] naming the first zero field.
    pub fn validate(&self) -> Result<(), RoomError> {
        let fields = [
            ("max_rooms", self.max_rooms),
            ("max_users_per_room", self.max_users_per_room),
            ("seat_capacity", self.seat_capacity),
            ("mailbox_capacity", self.mailbox_capacity),
            ("outbound_capacity", self.outbound_capacity),
        ];
        match fields.into_iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(RoomError::InvalidConfig(name)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let limits = RoomLimits::default();
        assert_eq!(limits.max_rooms, 100);
        assert_eq!(limits.max_users_per_room, 20);
        assert_eq!(limits.seat_capacity, 20);
        assert_eq!(limits.mailbox_capacity, 64);
        assert_eq!(limits.outbound_capacity, 256);
        assert!(limits.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let limits: RoomLimits = toml::from_str("max_rooms = 3\nseat_capacity = 5").unwrap();
        assert_eq!(limits.max_rooms, 3);
        assert_eq!(limits.seat_capacity, 5);
        assert_eq!(limits.max_users_per_room, 20);
    }

    #[test]
    fn test_validate_rejects_zero() {
        let limits = RoomLimits {
            seat_capacity: 0,
            ..RoomLimits::default()
        };
        let err = limits.validate().unwrap_err();
        assert!(matches!(err, RoomError::InvalidConfig("seat_capacity")));
    }
}
