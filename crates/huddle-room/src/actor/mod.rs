//! Room actor: an isolated Tokio task that owns one [`Room`].
//!
//! Each room runs in its own task and is reached only through a bounded
//! mpsc mailbox. Commands are applied strictly in arrival order, and the
//! broadcast a command triggers is fully queued before the next command is
//! taken, so every roster a member sees is a consistent snapshot.
//!
//! Handlers live in submodules by concern:
//!
//! - `binder`: identity binding
//! - `seating`: seat requests and orientation updates
//! - `lifecycle`: admission, disconnects, eviction, teardown

mod binder;
mod lifecycle;
mod seating;

pub use lifecycle::DisconnectReason;

use huddle_protocol::{ConnectionId, RoomId, Rotation};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use crate::presence::Broadcaster;
use crate::{
    ParticipantSender, Registry, Room, RoomError, RoomInfo, RoomLimits, RoomSnapshot, SeatGrant,
};

/// Commands sent to a room actor through its mailbox.
///
/// Variants with a `reply` are request/response; the caller awaits the
/// oneshot.
pub(crate) enum RoomCommand {
    Admit {
        conn: ConnectionId,
        outbound: ParticipantSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    BindIdentity {
        conn: ConnectionId,
        name: String,
        character: String,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    RequestSeat {
        conn: ConnectionId,
        reply: oneshot::Sender<Result<SeatGrant, RoomError>>,
    },
    UpdateOrientation {
        conn: ConnectionId,
        rotation: Rotation,
    },
    Disconnect {
        conn: ConnectionId,
        reason: DisconnectReason,
        reply: oneshot::Sender<bool>,
    },
    Info {
        reply: oneshot::Sender<RoomInfo>,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a running room actor.
///
/// Cheap to clone. The registry holds one per room and every connection
/// handler holds one for the room it was admitted to.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    instance: u64,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Distinguishes successive rooms that reuse the same id.
    pub fn instance(&self) -> u64 {
        self.instance
    }

    /// Returns `true` once the actor has stopped taking commands.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub(crate) async fn admit(
        &self,
        conn: ConnectionId,
        outbound: ParticipantSender,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Admit {
            conn,
            outbound,
            reply,
        })
        .await?
    }

    /// Binds a display name and character. On success every member gets a
    /// fresh roster; on a validation failure the requester gets an `error`
    /// event.
    ///
    /// # Errors
    /// [`RoomError::Busy`] if the mailbox is full (nothing was sent to the
    /// client), otherwise whatever the room reported.
    pub async fn bind_identity(
        &self,
        conn: ConnectionId,
        name: String,
        character: String,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::BindIdentity {
            conn,
            name,
            character,
            reply,
        })
        .await?
    }

    /// Requests the lowest free seat. The requester receives
    /// `seatAssigned` (or `roomFull`) through its outbound channel.
    ///
    /// # Errors
    /// [`RoomError::Busy`] if the mailbox is full, otherwise whatever the
    /// room reported.
    pub async fn request_seat(&self, conn: ConnectionId) -> Result<SeatGrant, RoomError> {
        self.request(|reply| RoomCommand::RequestSeat { conn, reply })
            .await?
    }

    /// Stores a camera orientation without waiting for the actor.
    ///
    /// # Errors
    /// [`RoomError::Busy`] when the update was dropped because the mailbox
    /// is full.
    pub fn update_orientation(
        &self,
        conn: ConnectionId,
        rotation: Rotation,
    ) -> Result<(), RoomError> {
        self.try_enqueue(RoomCommand::UpdateOrientation { conn, rotation })
    }

    /// Removes a participant. Waits for mailbox capacity instead of
    /// failing, and is a no-op for unknown participants or closed rooms.
    ///
    /// Returns `true` if this call removed the participant.
    pub async fn disconnect(&self, conn: ConnectionId, reason: DisconnectReason) -> bool {
        let (reply, rx) = oneshot::channel();
        let cmd = RoomCommand::Disconnect {
            conn,
            reason,
            reply,
        };
        if self.sender.send(cmd).await.is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Info { reply })
            .await
            .map_err(|_| self.closed())?;
        rx.await.map_err(|_| self.closed())
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Snapshot { reply })
            .await
            .map_err(|_| self.closed())?;
        rx.await.map_err(|_| self.closed())
    }

    /// Evicts every member and stops the actor. Returns once the room has
    /// left the registry.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.sender.send(RoomCommand::Shutdown { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.try_enqueue(make(reply))?;
        rx.await.map_err(|_| self.closed())
    }

    fn try_enqueue(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender.try_send(cmd).map_err(|e| match e {
            TrySendError::Full(_) => RoomError::Busy(self.room_id.clone()),
            TrySendError::Closed(_) => self.closed(),
        })
    }

    fn closed(&self) -> RoomError {
        RoomError::Closed(self.room_id.clone())
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room: Room,
    broadcaster: Broadcaster,
    registry: Registry,
    instance: u64,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Processes commands until the room is empty or shut down.
    async fn run(mut self) {
        tracing::debug!(room_id = %self.room.id(), instance = self.instance, "room actor started");

        while !self.room.is_empty() {
            let Some(cmd) = self.receiver.recv().await else {
                break;
            };
            match cmd {
                RoomCommand::Admit {
                    conn,
                    outbound,
                    reply,
                } => {
                    let result = self.handle_admit(conn, outbound);
                    self.reply(reply, result);
                }
                RoomCommand::BindIdentity {
                    conn,
                    name,
                    character,
                    reply,
                } => {
                    let result = self.handle_bind_identity(conn, &name, &character);
                    self.reply(reply, result);
                }
                RoomCommand::RequestSeat { conn, reply } => {
                    let result = self.handle_request_seat(conn);
                    self.reply(reply, result);
                }
                RoomCommand::UpdateOrientation { conn, rotation } => {
                    self.handle_update_orientation(conn, rotation);
                }
                RoomCommand::Disconnect {
                    conn,
                    reason,
                    reply,
                } => {
                    let removed = self.handle_disconnect(conn, reason);
                    self.reply(reply, removed);
                }
                RoomCommand::Info { reply } => {
                    let _ = reply.send(self.room.info());
                }
                RoomCommand::Snapshot { reply } => {
                    let _ = reply.send(self.room.snapshot());
                }
                RoomCommand::Shutdown { reply } => {
                    self.handle_shutdown();
                    self.reply(reply, ());
                }
            }
        }

        self.close();
        tracing::debug!(room_id = %self.room.id(), instance = self.instance, "room actor stopped");
    }

    /// Answers a command. A room the command emptied leaves the registry
    /// first, so the caller never observes an empty registered room.
    fn reply<T>(&mut self, reply: oneshot::Sender<T>, value: T) {
        self.unregister_if_empty();
        let _ = reply.send(value);
    }
}

/// Spawns a room actor with `founder` already admitted, and returns its
/// handle.
///
/// Rooms are only ever created for a connection, so a registered room is
/// never empty.
pub(crate) fn spawn_room(
    room_id: RoomId,
    limits: &RoomLimits,
    founder: ConnectionId,
    outbound: ParticipantSender,
    registry: Registry,
    instance: u64,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(limits.mailbox_capacity);

    let mut room = Room::new(room_id.clone(), limits);
    let mut broadcaster = Broadcaster::default();
    // A fresh room has room for one unless the cap is zero, which
    // `RoomLimits::validate` rules out.
    if room.admit(founder).is_ok() {
        broadcaster.attach(founder, outbound);
    }

    let actor = RoomActor {
        room,
        broadcaster,
        registry,
        instance,
        receiver: rx,
    };
    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        instance,
        sender: tx,
    }
}
