//! Identity binding.

use huddle_protocol::ConnectionId;
use huddle_session::Identity;

use super::RoomActor;
use crate::RoomError;

impl RoomActor {
    /// Validates and stores a name and character, then republishes the
    /// roster. A validation failure is reported to the requester only and
    /// changes nothing.
    pub(super) fn handle_bind_identity(
        &mut self,
        conn: ConnectionId,
        name: &str,
        character: &str,
    ) -> Result<(), RoomError> {
        if !self.room.contains(conn) {
            return Err(RoomError::NotInRoom(conn, self.room.id().clone()));
        }

        let identity = match Identity::new(name, character) {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(
                    room_id = %self.room.id(),
                    conn_id = %conn,
                    name,
                    character,
                    "invalid joinRoom data"
                );
                let err = RoomError::from(e);
                if let Some(event) = err.client_event() {
                    self.notify(conn, event);
                }
                return Err(err);
            }
        };

        tracing::info!(
            room_id = %self.room.id(),
            conn_id = %conn,
            name = identity.name(),
            character = identity.character(),
            "identity bound"
        );
        self.room.bind_identity(conn, identity)?;
        self.publish_roster();
        Ok(())
    }
}
