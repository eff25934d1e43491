//! Seat requests and per-participant transient state.

use huddle_protocol::{ConnectionId, Rotation, ServerEvent};

use super::RoomActor;
use crate::{RoomError, SeatGrant};

impl RoomActor {
    /// Grants the lowest free seat.
    ///
    /// The requester hears `seatAssigned` before anyone sees the new roster.
    /// A repeated request re-sends the held seat and publishes nothing.
    pub(super) fn handle_request_seat(&mut self, conn: ConnectionId) -> Result<SeatGrant, RoomError> {
        let grant = match self.room.request_seat(conn) {
            Ok(grant) => grant,
            Err(err) => {
                if matches!(err, RoomError::SeatsExhausted(_)) {
                    tracing::warn!(room_id = %self.room.id(), conn_id = %conn, "no seats available");
                }
                if let Some(event) = err.client_event() {
                    self.notify(conn, event);
                }
                return Err(err);
            }
        };

        self.notify(conn, ServerEvent::SeatAssigned {
            seat_index: grant.index(),
        });
        if let SeatGrant::Assigned(seat_index) = grant {
            tracing::info!(room_id = %self.room.id(), conn_id = %conn, seat_index, "seat assigned");
            // An evicted requester has already triggered a publish.
            if self.room.contains(conn) {
                self.publish_roster();
            }
        }
        Ok(grant)
    }

    /// Stores the orientation. Never broadcast.
    pub(super) fn handle_update_orientation(&mut self, conn: ConnectionId, rotation: Rotation) {
        if let Err(e) = self.room.update_orientation(conn, rotation) {
            tracing::debug!(room_id = %self.room.id(), error = %e, "ignoring camera update");
        }
    }
}
