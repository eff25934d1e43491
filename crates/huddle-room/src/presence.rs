//! Delivery of events to room members.

use std::collections::HashMap;

use huddle_protocol::{ConnectionId, ServerEvent};
use tokio::sync::mpsc;

/// Channel the room actor pushes a connection's outbound events into.
///
/// Bounded: a receiver that falls `outbound_capacity` events behind is
/// treated as a slow consumer and evicted.
pub type ParticipantSender = mpsc::Sender<ServerEvent>;

/// Per-member outbound channels of one room.
///
/// Never blocks: delivery uses `try_send`, and callers get back the
/// members that could not take the event so the lifecycle code can evict
/// them.
#[derive(Debug, Default)]
pub(crate) struct Broadcaster {
    senders: HashMap<ConnectionId, ParticipantSender>,
}

impl Broadcaster {
    pub(crate) fn attach(&mut self, conn: ConnectionId, sender: ParticipantSender) {
        self.senders.insert(conn, sender);
    }

    /// Forgets a member. Dropping the sender ends the member's outbound
    /// stream, which is how its handler learns it was removed.
    pub(crate) fn detach(&mut self, conn: ConnectionId) -> Option<ParticipantSender> {
        self.senders.remove(&conn)
    }

    /// Sends to one member. Returns `false` if its queue is full or gone.
    pub(crate) fn send_to(&self, conn: ConnectionId, event: ServerEvent) -> bool {
        match self.senders.get(&conn) {
            Some(sender) => sender.try_send(event).is_ok(),
            None => false,
        }
    }

    /// Sends the same event to every member in `order`, returning those that
    /// could not take it.
    pub(crate) fn publish(
        &self,
        order: &[ConnectionId],
        event: &ServerEvent,
    ) -> Vec<ConnectionId> {
        order
            .iter()
            .copied()
            .filter(|conn| !self.send_to(*conn, event.clone()))
            .collect()
    }
}
