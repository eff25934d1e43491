//! Admission control.

use huddle_protocol::{ConnectionId, RoomId};

use crate::actor::spawn_room;
use crate::{AdmissionError, ParticipantSender, Registry, RoomError, RoomHandle, RoomLimits};

/// How often admission retries after losing a race with a room teardown.
const MAX_ADMIT_ATTEMPTS: usize = 4;

/// Decides whether a new connection may enter a room, creating the room on
/// first use.
///
/// `max_rooms` is only checked when a room would be created; joins to an
/// existing room are judged against `max_users_per_room` by the room
/// itself.
#[derive(Debug, Clone)]
pub struct Gatekeeper {
    registry: Registry,
    limits: RoomLimits,
}

impl Gatekeeper {
    pub fn new(registry: Registry, limits: RoomLimits) -> Self {
        Self { registry, limits }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn limits(&self) -> &RoomLimits {
        &self.limits
    }

    /// Admits `conn` to `room_id` as an unidentified, unseated participant.
    ///
    /// No roster is published; the first broadcast follows `joinRoom` or
    /// `requestSeat`.
    ///
    /// # Errors
    /// Any [`AdmissionError`]; the caller should notify the client with
    /// [`AdmissionError::client_event`] and close the connection.
    pub async fn admit(
        &self,
        room_id: Option<RoomId>,
        conn: ConnectionId,
        outbound: ParticipantSender,
    ) -> Result<RoomHandle, AdmissionError> {
        let Some(room_id) = room_id else {
            tracing::warn!(conn_id = %conn, "connection rejected: no roomId provided");
            return Err(AdmissionError::MissingRoomId);
        };

        for _ in 0..MAX_ADMIT_ATTEMPTS {
            let handle = {
                let mut rooms = self.registry.lock();
                match rooms.get(&room_id) {
                    Some(handle) => handle.clone(),
                    None => {
                        if rooms.len() >= self.limits.max_rooms {
                            tracing::warn!(
                                conn_id = %conn,
                                %room_id,
                                max_rooms = self.limits.max_rooms,
                                "connection rejected: maximum rooms reached"
                            );
                            return Err(AdmissionError::ServerAtCapacity {
                                max_rooms: self.limits.max_rooms,
                            });
                        }
                        let handle = spawn_room(
                            room_id.clone(),
                            &self.limits,
                            conn,
                            outbound,
                            self.registry.clone(),
                            self.registry.next_instance(),
                        );
                        rooms.insert(room_id.clone(), handle.clone());
                        tracing::info!(%room_id, conn_id = %conn, "new room created");
                        return Ok(handle);
                    }
                }
            };

            match handle.admit(conn, outbound.clone()).await {
                Ok(()) => return Ok(handle),
                Err(RoomError::RoomFull(_)) => {
                    tracing::warn!(conn_id = %conn, %room_id, "connection rejected: room at capacity");
                    return Err(AdmissionError::RoomAtCapacity(room_id));
                }
                Err(RoomError::Busy(_)) => {
                    tracing::warn!(conn_id = %conn, %room_id, "connection rejected: room busy");
                    return Err(AdmissionError::RoomBusy(room_id));
                }
                Err(RoomError::Closed(_)) => {
                    // The room emptied while we were queued; unregister it
                    // (if it has not done so itself) and start over.
                    self.registry.remove_if_same(&room_id, handle.instance());
                }
                Err(e) => {
                    tracing::error!(conn_id = %conn, %room_id, error = %e, "admission failed");
                    return Err(AdmissionError::RoomBusy(room_id));
                }
            }
        }

        tracing::warn!(conn_id = %conn, %room_id, "connection rejected: room kept closing");
        Err(AdmissionError::RoomBusy(room_id))
    }
}
