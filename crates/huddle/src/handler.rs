//! Per-connection handler: admission, event routing and keep-alive.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Read `roomId` from the upgrade URL → ask the gatekeeper
//!   2. On rejection: send the rejection event (if any) and close
//!   3. Loop: decode client events → room actor; room events → socket;
//!      ping on an interval and drop silent connections

use std::sync::Arc;

use huddle_protocol::{
    ClientEvent, Codec, ConnectionId, JoinRoom, RoomId, ServerEvent,
};
use huddle_room::{DisconnectReason, RoomError, RoomHandle};
use huddle_session::{SessionEvent, SessionPhase};
use huddle_transport::{Connection, WebSocketConnection};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::HuddleError;
use crate::server::ServerState;

/// Admission parameters of the upgrade URL, e.g. `/?roomId=R1`.
#[derive(Debug, Default, Deserialize)]
struct ConnectQuery {
    #[serde(rename = "roomId")]
    room_id: Option<String>,
}

/// Drop guard that removes the participant from its room when the handler
/// exits, however it exits.
///
/// `Drop` is synchronous, so the disconnect is sent from a spawned task.
/// Disconnects wait for mailbox space and are never dropped.
struct RoomGuard {
    handle: RoomHandle,
    conn_id: ConnectionId,
    reason: DisconnectReason,
}

impl Drop for RoomGuard {
    fn drop(&mut self) {
        let handle = self.handle.clone();
        let conn_id = self.conn_id;
        let reason = self.reason;
        tokio::spawn(async move {
            handle.disconnect(conn_id, reason).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), HuddleError> {
    let conn_id = conn.id();
    let query: ConnectQuery = conn.request().query().unwrap_or_else(|e| {
        tracing::debug!(%conn_id, error = %e, "unreadable connect query");
        ConnectQuery::default()
    });
    let room_id = query.room_id.and_then(RoomId::new);
    tracing::debug!(%conn_id, room_id = ?room_id, "handling new connection");

    let (tx, mut outbound) = mpsc::channel(state.gatekeeper.limits().outbound_capacity);
    let handle = match state.gatekeeper.admit(room_id, conn_id, tx).await {
        Ok(handle) => handle,
        Err(e) => {
            if let Some(event) = e.client_event() {
                let _ = send_event(&conn, &state.codec, &event).await;
            }
            let _ = conn.close().await;
            return Err(e.into());
        }
    };

    let mut phase = SessionPhase::Connecting.apply(SessionEvent::Admitted)?;
    let mut guard = RoomGuard {
        handle: handle.clone(),
        conn_id,
        reason: DisconnectReason::ClientClosed,
    };

    let period = state.connection.ping_interval();
    let mut ping = tokio::time::interval_at(Instant::now() + period, period);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            inbound = conn.recv() => match inbound {
                Ok(Some(data)) => match dispatch(&conn, &state, &handle, &data).await {
                    Ok(Some(event)) => match phase.apply(event) {
                        Ok(next) => phase = next,
                        Err(e) => tracing::warn!(%conn_id, error = %e, "unexpected transition"),
                    },
                    Ok(None) => {}
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "failed to answer client");
                        guard.reason = DisconnectReason::TransportError;
                        break;
                    }
                },
                Ok(None) => {
                    tracing::debug!(%conn_id, "connection closed cleanly");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "recv error");
                    guard.reason = DisconnectReason::TransportError;
                    break;
                }
            },
            event = outbound.recv() => match event {
                Some(event) => {
                    if let Err(e) = send_event(&conn, &state.codec, &event).await {
                        tracing::debug!(%conn_id, error = %e, "send error");
                        guard.reason = DisconnectReason::TransportError;
                        break;
                    }
                }
                // The room dropped us: evicted or shutting down.
                None => {
                    tracing::debug!(%conn_id, "removed from room");
                    break;
                }
            },
            _ = ping.tick() => {
                if conn.idle_for() >= state.connection.ping_timeout() {
                    tracing::info!(%conn_id, "connection timed out");
                    guard.reason = DisconnectReason::Timeout;
                    break;
                }
                if let Err(e) = conn.ping().await {
                    tracing::debug!(%conn_id, error = %e, "ping failed");
                    guard.reason = DisconnectReason::TransportError;
                    break;
                }
            }
        }
    }

    tracing::debug!(%conn_id, last_phase = %phase, reason = %guard.reason, "leaving room");
    drop(guard);
    let _ = conn.close().await;
    Ok(())
}

/// Decodes one client frame and hands it to the room.
///
/// Returns the lifecycle event a successful request caused. Only transport
/// failures are errors; everything else is answered on the socket or
/// logged.
async fn dispatch(
    conn: &WebSocketConnection,
    state: &ServerState,
    handle: &RoomHandle,
    data: &[u8],
) -> Result<Option<SessionEvent>, HuddleError> {
    let conn_id = conn.id();
    let event: ClientEvent = match state.codec.decode(data) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "failed to decode client event");
            let reply = ServerEvent::error(format!("Invalid event: {e}"));
            send_event(conn, &state.codec, &reply).await?;
            return Ok(None);
        }
    };

    let result = match event {
        ClientEvent::JoinRoom(JoinRoom { name, character }) => handle
            .bind_identity(conn_id, name, character)
            .await
            .map(|()| Some(SessionEvent::IdentityBound)),
        ClientEvent::RequestSeat => handle
            .request_seat(conn_id)
            .await
            .map(|_| Some(SessionEvent::SeatGranted)),
        ClientEvent::CameraUpdate(update) => {
            // Last value wins, so a dropped update is harmless.
            if let Err(e) = handle.update_orientation(conn_id, update.rotation) {
                tracing::trace!(%conn_id, error = %e, "camera update dropped");
            }
            Ok(None)
        }
    };

    match result {
        Ok(event) => Ok(event),
        // The room never saw the request, so nobody told the client.
        Err(e @ RoomError::Busy(_)) => {
            tracing::debug!(%conn_id, error = %e, "room busy");
            if let Some(reply) = e.client_event() {
                send_event(conn, &state.codec, &reply).await?;
            }
            Ok(None)
        }
        // The room already sent the client event for these.
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "request rejected");
            Ok(None)
        }
    }
}

async fn send_event(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    event: &ServerEvent,
) -> Result<(), HuddleError> {
    tracing::trace!(conn_id = %conn.id(), event = event.name(), "sending event");
    let bytes = codec.encode(event)?;
    conn.send(&bytes).await?;
    Ok(())
}
