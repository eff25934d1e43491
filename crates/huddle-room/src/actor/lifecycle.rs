//! Admission, disconnect cleanup, slow-consumer eviction and teardown.

use std::fmt;

use huddle_protocol::{ConnectionId, ServerEvent};
use tokio::sync::mpsc::error::TryRecvError;

use super::{RoomActor, RoomCommand};
use crate::{ParticipantSender, RoomError};

/// Why a participant left its room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisconnectReason {
    /// The client closed the socket.
    ClientClosed,
    /// Reading from or writing to the socket failed.
    TransportError,
    /// Nothing arrived from the client within the keep-alive timeout.
    Timeout,
    /// The client's outbound queue overflowed.
    SlowConsumer,
    /// The server is stopping.
    ServerShutdown,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ClientClosed => "client closed",
            Self::TransportError => "transport error",
            Self::Timeout => "timeout",
            Self::SlowConsumer => "slow consumer",
            Self::ServerShutdown => "server shutdown",
        };
        f.write_str(s)
    }
}

impl RoomActor {
    pub(super) fn handle_admit(
        &mut self,
        conn: ConnectionId,
        outbound: ParticipantSender,
    ) -> Result<(), RoomError> {
        self.room.admit(conn)?;
        self.broadcaster.attach(conn, outbound);
        tracing::info!(
            room_id = %self.room.id(),
            conn_id = %conn,
            users = self.room.len(),
            "participant admitted"
        );
        Ok(())
    }

    /// Removes `conn` and republishes the roster. Idempotent.
    pub(super) fn handle_disconnect(&mut self, conn: ConnectionId, reason: DisconnectReason) -> bool {
        if !self.remove(conn, reason) {
            return false;
        }
        self.publish_roster();
        true
    }

    pub(super) fn handle_shutdown(&mut self) {
        for conn in self.room.member_ids() {
            self.remove(conn, DisconnectReason::ServerShutdown);
        }
    }

    /// Sends one event to one member. A member that cannot take it is
    /// evicted and the roster republished.
    pub(super) fn notify(&mut self, conn: ConnectionId, event: ServerEvent) {
        if !self.broadcaster.send_to(conn, event) && self.remove(conn, DisconnectReason::SlowConsumer) {
            self.publish_roster();
        }
    }

    /// Sends the current roster to every member.
    ///
    /// Members whose queue is full are evicted, which changes the roster,
    /// so the remaining members get another snapshot. Each round removes at
    /// least one member, so this terminates.
    pub(super) fn publish_roster(&mut self) {
        loop {
            let members = self.room.member_ids();
            if members.is_empty() {
                return;
            }
            let event = ServerEvent::UpdateUsers(self.room.roster());
            let laggards = self.broadcaster.publish(&members, &event);
            if laggards.is_empty() {
                return;
            }
            for conn in laggards {
                self.remove(conn, DisconnectReason::SlowConsumer);
            }
        }
    }

    /// Releases the seat, drops the participant and its outbound channel.
    fn remove(&mut self, conn: ConnectionId, reason: DisconnectReason) -> bool {
        let Some(participant) = self.room.release(conn) else {
            return false;
        };
        self.broadcaster.detach(conn);

        if reason == DisconnectReason::SlowConsumer {
            tracing::warn!(
                room_id = %self.room.id(),
                conn_id = %conn,
                "evicting slow consumer"
            );
        }
        tracing::info!(
            room_id = %self.room.id(),
            conn_id = %conn,
            %reason,
            name = participant.name(),
            character = participant.character(),
            seat_index = participant.seat_index(),
            users = self.room.len(),
            "participant disconnected"
        );
        true
    }

    /// Removes the room from the registry once its last participant is
    /// gone. Safe to call repeatedly.
    pub(super) fn unregister_if_empty(&mut self) {
        if self.room.is_empty() && self.registry.remove_if_same(self.room.id(), self.instance) {
            tracing::info!(room_id = %self.room.id(), "room deleted");
        }
    }

    /// Unregisters the room and fails whatever is still queued.
    ///
    /// A command that raced the teardown gets `Closed`; the gatekeeper
    /// answers that by creating a fresh room under the same id.
    pub(super) fn close(&mut self) {
        self.unregister_if_empty();
        self.receiver.close();

        loop {
            let cmd = match self.receiver.try_recv() {
                Ok(cmd) => cmd,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            };
            let closed = RoomError::Closed(self.room.id().clone());
            match cmd {
                RoomCommand::Admit { reply, .. } | RoomCommand::BindIdentity { reply, .. } => {
                    let _ = reply.send(Err(closed));
                }
                RoomCommand::RequestSeat { reply, .. } => {
                    let _ = reply.send(Err(closed));
                }
                RoomCommand::Disconnect { reply, .. } => {
                    let _ = reply.send(false);
                }
                RoomCommand::Shutdown { reply } => {
                    let _ = reply.send(());
                }
                // Dropping the reply reports `Closed` to the caller.
                RoomCommand::Info { .. }
                | RoomCommand::Snapshot { .. }
                | RoomCommand::UpdateOrientation { .. } => {}
            }
        }
    }
}
