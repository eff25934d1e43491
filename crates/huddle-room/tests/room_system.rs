//! Integration tests for the room system: gatekeeper, registry and room
//! actors driven through plain `mpsc` receivers.

use std::time::Duration;

use huddle_protocol::{ConnectionId, RoomId, RosterEntry, Rotation, ServerEvent};
use huddle_room::{
    AdmissionError, DisconnectReason, Gatekeeper, Registry, RoomError, RoomHandle, RoomLimits,
    SeatGrant,
};
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

/// A fake connection: the room handle it was admitted with and its
/// outbound queue.
struct Client {
    conn: ConnectionId,
    handle: RoomHandle,
    rx: mpsc::Receiver<ServerEvent>,
}

impl Client {
    async fn join(&self, name: &str) -> Result<(), RoomError> {
        self.handle
            .bind_identity(self.conn, name.into(), "Student1".into())
            .await
    }

    async fn seat(&self) -> Result<SeatGrant, RoomError> {
        self.handle.request_seat(self.conn).await
    }

    async fn leave(&self) -> bool {
        self.handle
            .disconnect(self.conn, DisconnectReason::ClientClosed)
            .await
    }

    /// The next queued event. Room actors queue events before replying, so
    /// anything a command produced is already here once it returns.
    fn event(&mut self) -> ServerEvent {
        self.rx.try_recv().expect("expected a queued event")
    }

    fn roster(&mut self) -> Vec<RosterEntry> {
        match self.event() {
            ServerEvent::UpdateUsers(roster) => roster,
            other => panic!("expected updateUsers, got {other:?}"),
        }
    }

    fn assert_quiet(&mut self) {
        assert!(self.rx.try_recv().is_err(), "expected no queued events");
    }
}

fn gatekeeper(limits: RoomLimits) -> Gatekeeper {
    Gatekeeper::new(Registry::new(), limits)
}

fn room(id: &str) -> Option<RoomId> {
    RoomId::new(id)
}

async fn connect(gk: &Gatekeeper, room_id: &str, id: u64) -> Result<Client, AdmissionError> {
    let conn = ConnectionId::new(id);
    let (tx, rx) = mpsc::channel(64);
    let handle = gk.admit(room(room_id), conn, tx).await?;
    Ok(Client { conn, handle, rx })
}

/// Polls until the actor stops taking commands.
async fn wait_for_close(handle: &RoomHandle) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !handle.is_closed() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("room actor should stop");
}

fn seats_of(roster: &[RosterEntry]) -> Vec<(u64, Option<usize>)> {
    roster
        .iter()
        .map(|e| (e.id.into_inner(), e.seat_index))
        .collect()
}

// =========================================================================
// Scenarios
// =========================================================================

#[tokio::test]
async fn test_first_participant_gets_seat_zero() {
    let gk = gatekeeper(RoomLimits::default());
    let mut p1 = connect(&gk, "R1", 1).await.unwrap();
    p1.assert_quiet();

    p1.join("Ann").await.unwrap();
    let roster = p1.roster();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].name.as_deref(), Some("Ann"));
    assert_eq!(roster[0].character.as_deref(), Some("Student1"));
    assert_eq!(roster[0].seat_index, None);

    assert_eq!(p1.seat().await.unwrap(), SeatGrant::Assigned(0));
    assert_eq!(p1.event(), ServerEvent::SeatAssigned { seat_index: 0 });
    assert_eq!(seats_of(&p1.roster()), vec![(1, Some(0))]);
}

#[tokio::test]
async fn test_second_participant_gets_next_seat_and_release_on_disconnect() {
    let gk = gatekeeper(RoomLimits::default());
    let mut p1 = connect(&gk, "R1", 1).await.unwrap();
    p1.join("Ann").await.unwrap();
    p1.seat().await.unwrap();

    let mut p2 = connect(&gk, "R1", 2).await.unwrap();
    p2.join("Bob").await.unwrap();
    assert_eq!(p2.seat().await.unwrap(), SeatGrant::Assigned(1));
    assert_eq!(p2.roster().len(), 2); // after joinRoom
    assert_eq!(p2.event(), ServerEvent::SeatAssigned { seat_index: 1 });
    assert_eq!(seats_of(&p2.roster()), vec![(1, Some(0)), (2, Some(1))]);

    assert!(p1.leave().await);
    assert_eq!(seats_of(&p2.roster()), vec![(2, Some(1))]);

    let snapshot = gk.registry().snapshot(&RoomId::new("R1").unwrap()).await.unwrap();
    assert_eq!(snapshot.occupied_seats, vec![1]);
}

#[tokio::test]
async fn test_participant_cap_rejects_without_adding() {
    let gk = gatekeeper(RoomLimits::default());
    let mut clients = Vec::new();
    for id in 1..=20 {
        clients.push(connect(&gk, "R1", id).await.unwrap());
    }

    let err = connect(&gk, "R1", 21).await.err().unwrap();
    assert_eq!(err, AdmissionError::RoomAtCapacity(RoomId::new("R1").unwrap()));
    assert_eq!(
        err.client_event(),
        Some(ServerEvent::room_full("Room is at maximum capacity"))
    );

    let snapshot = gk.registry().snapshot(&RoomId::new("R1").unwrap()).await.unwrap();
    assert_eq!(snapshot.participants.len(), 20);
    assert!(snapshot.participants.iter().all(|p| p.id.into_inner() != 21));
    for client in &mut clients {
        client.assert_quiet();
    }
}

#[tokio::test]
async fn test_empty_room_is_deleted_and_id_reused_fresh() {
    let gk = gatekeeper(RoomLimits::default());
    let p1 = connect(&gk, "R1", 1).await.unwrap();
    p1.join("Ann").await.unwrap();
    p1.seat().await.unwrap();
    let first_instance = p1.handle.instance();

    assert!(p1.leave().await);
    assert!(!gk.registry().contains(&RoomId::new("R1").unwrap()));
    assert_eq!(gk.registry().room_count(), 0);

    let p2 = connect(&gk, "R1", 2).await.unwrap();
    assert_ne!(p2.handle.instance(), first_instance);

    let snapshot = p2.handle.snapshot().await.unwrap();
    assert!(snapshot.occupied_seats.is_empty());
    assert_eq!(snapshot.participants.len(), 1);
    assert_eq!(snapshot.participants[0].id, ConnectionId::new(2));
    assert_eq!(p2.seat().await.unwrap(), SeatGrant::Assigned(0));
}

// =========================================================================
// Gatekeeper
// =========================================================================

#[tokio::test]
async fn test_missing_room_id_is_rejected() {
    let gk = gatekeeper(RoomLimits::default());
    let (tx, _rx) = mpsc::channel(4);
    let err = gk.admit(None, ConnectionId::new(1), tx).await.unwrap_err();
    assert_eq!(err, AdmissionError::MissingRoomId);
    assert_eq!(gk.registry().room_count(), 0);
}

#[tokio::test]
async fn test_room_creation_refused_at_max_rooms() {
    let gk = gatekeeper(RoomLimits {
        max_rooms: 2,
        ..RoomLimits::default()
    });
    let _a = connect(&gk, "A", 1).await.unwrap();
    let _b = connect(&gk, "B", 2).await.unwrap();

    let err = connect(&gk, "C", 3).await.err().unwrap();
    assert_eq!(err, AdmissionError::ServerAtCapacity { max_rooms: 2 });
    assert_eq!(
        err.client_event(),
        Some(ServerEvent::error("Server at capacity. Please try again later."))
    );

    // Existing rooms are still joinable.
    let _a2 = connect(&gk, "A", 4).await.unwrap();
    assert_eq!(gk.registry().room_count(), 2);
}

#[tokio::test]
async fn test_last_disconnect_frees_room_slot_immediately() {
    let gk = gatekeeper(RoomLimits {
        max_rooms: 1,
        ..RoomLimits::default()
    });
    let r1 = RoomId::new("R1").unwrap();

    for round in 0..500u64 {
        let client = connect(&gk, "R1", round * 2 + 1).await.unwrap();
        assert!(client.leave().await);
        assert!(!gk.registry().contains(&r1), "round {round}: emptied room still registered");

        let other = connect(&gk, "R2", round * 2 + 2)
            .await
            .unwrap_or_else(|e| panic!("round {round}: {e}"));
        assert!(other.leave().await);
        assert_eq!(gk.registry().room_count(), 0);
    }
}

#[tokio::test]
async fn test_admission_does_not_broadcast() {
    let gk = gatekeeper(RoomLimits::default());
    let mut p1 = connect(&gk, "R1", 1).await.unwrap();
    let _p2 = connect(&gk, "R1", 2).await.unwrap();
    p1.assert_quiet();
}

// =========================================================================
// Session binder
// =========================================================================

#[tokio::test]
async fn test_invalid_identity_only_notifies_requester() {
    let gk = gatekeeper(RoomLimits::default());
    let mut p1 = connect(&gk, "R1", 1).await.unwrap();
    let mut p2 = connect(&gk, "R1", 2).await.unwrap();

    let err = p1
        .handle
        .bind_identity(p1.conn, "   ".into(), "Student1".into())
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::InvalidIdentity(_)));
    assert_eq!(p1.event(), ServerEvent::error("Name and character are required"));
    p1.assert_quiet();
    p2.assert_quiet();

    let err = p1
        .handle
        .bind_identity(p1.conn, "Ann".into(), String::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::InvalidIdentity(_)));

    // Still a member and able to bind correctly.
    p1.rx.try_recv().unwrap();
    p1.join("  Ann  ").await.unwrap();
    assert_eq!(p1.roster()[0].name.as_deref(), Some("Ann"));
    assert_eq!(p2.roster()[0].name.as_deref(), Some("Ann"));
}

#[tokio::test]
async fn test_rebinding_overwrites_and_broadcasts() {
    let gk = gatekeeper(RoomLimits::default());
    let mut p1 = connect(&gk, "R1", 1).await.unwrap();
    p1.join("Ann").await.unwrap();
    p1.roster();

    p1.handle
        .bind_identity(p1.conn, "Annie".into(), "Teacher".into())
        .await
        .unwrap();
    let roster = p1.roster();
    assert_eq!(roster[0].name.as_deref(), Some("Annie"));
    assert_eq!(roster[0].character.as_deref(), Some("Teacher"));
}

// =========================================================================
// Seat allocator
// =========================================================================

#[tokio::test]
async fn test_seat_rerequest_resends_index_without_broadcast() {
    let gk = gatekeeper(RoomLimits::default());
    let mut p1 = connect(&gk, "R1", 1).await.unwrap();
    let mut p2 = connect(&gk, "R1", 2).await.unwrap();
    p1.seat().await.unwrap();
    p1.event();
    p1.roster();
    p2.roster();

    assert_eq!(p1.seat().await.unwrap(), SeatGrant::AlreadySeated(0));
    assert_eq!(p1.event(), ServerEvent::SeatAssigned { seat_index: 0 });
    p1.assert_quiet();
    p2.assert_quiet();

    let snapshot = p1.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.occupied_seats, vec![0]);
}

#[tokio::test]
async fn test_seats_exhausted_keeps_spectator() {
    let gk = gatekeeper(RoomLimits {
        seat_capacity: 1,
        ..RoomLimits::default()
    });
    let mut p1 = connect(&gk, "R1", 1).await.unwrap();
    let mut p2 = connect(&gk, "R1", 2).await.unwrap();
    p1.seat().await.unwrap();
    p1.event();
    p1.roster();
    p2.roster();

    let err = p2.seat().await.unwrap_err();
    assert!(matches!(err, RoomError::SeatsExhausted(_)));
    assert_eq!(p2.event(), ServerEvent::room_full("No seats available"));
    p1.assert_quiet();

    // Freed seat goes to the spectator on the next request.
    assert!(p1.leave().await);
    p2.roster();
    assert_eq!(p2.seat().await.unwrap(), SeatGrant::Assigned(0));
}

#[tokio::test]
async fn test_lowest_free_seat_fills_holes() {
    let gk = gatekeeper(RoomLimits::default());
    let mut clients = Vec::new();
    for id in 1..=4 {
        let client = connect(&gk, "R1", id).await.unwrap();
        client.seat().await.unwrap();
        clients.push(client);
    }
    assert!(clients[1].leave().await);
    assert!(clients[2].leave().await);

    let late = connect(&gk, "R1", 5).await.unwrap();
    assert_eq!(late.seat().await.unwrap(), SeatGrant::Assigned(1));
}

// =========================================================================
// Presence broadcaster
// =========================================================================

#[tokio::test]
async fn test_broadcasts_stay_within_their_room() {
    let gk = gatekeeper(RoomLimits::default());
    let mut a1 = connect(&gk, "A", 1).await.unwrap();
    let mut a2 = connect(&gk, "A", 2).await.unwrap();
    let mut b1 = connect(&gk, "B", 3).await.unwrap();
    let mut b2 = connect(&gk, "B", 4).await.unwrap();

    a1.join("Ann").await.unwrap();
    b1.join("Bob").await.unwrap();
    a2.seat().await.unwrap();
    b2.seat().await.unwrap();

    let ids = |roster: Vec<RosterEntry>| -> Vec<u64> {
        roster.iter().map(|e| e.id.into_inner()).collect()
    };

    // joinRoom
    assert_eq!(ids(a1.roster()), vec![1, 2]);
    assert_eq!(ids(a2.roster()), vec![1, 2]);
    assert_eq!(ids(b1.roster()), vec![3, 4]);
    assert_eq!(ids(b2.roster()), vec![3, 4]);

    // requestSeat
    assert_eq!(ids(a1.roster()), vec![1, 2]);
    assert_eq!(a2.event(), ServerEvent::SeatAssigned { seat_index: 0 });
    assert_eq!(seats_of(&a2.roster()), vec![(1, None), (2, Some(0))]);
    assert_eq!(ids(b1.roster()), vec![3, 4]);
    assert_eq!(b2.event(), ServerEvent::SeatAssigned { seat_index: 0 });
    assert_eq!(seats_of(&b2.roster()), vec![(3, None), (4, Some(0))]);

    assert!(a1.leave().await);
    assert_eq!(ids(a2.roster()), vec![2]);
    b1.assert_quiet();
    b2.assert_quiet();
}

// =========================================================================
// Lifecycle
// =========================================================================

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let gk = gatekeeper(RoomLimits::default());
    let p1 = connect(&gk, "R1", 1).await.unwrap();
    let mut p2 = connect(&gk, "R1", 2).await.unwrap();

    assert!(p1.leave().await);
    assert_eq!(p2.roster().len(), 1);
    assert!(!p1.leave().await);
    p2.assert_quiet();

    assert!(!p2.handle.disconnect(ConnectionId::new(99), DisconnectReason::Timeout).await);
}

#[tokio::test]
async fn test_disconnect_closes_outbound_stream() {
    let gk = gatekeeper(RoomLimits::default());
    let mut p1 = connect(&gk, "R1", 1).await.unwrap();
    let _p2 = connect(&gk, "R1", 2).await.unwrap();

    assert!(p1.leave().await);
    assert!(p1.rx.recv().await.is_none());
}

#[tokio::test]
async fn test_slow_consumer_is_evicted() {
    let gk = gatekeeper(RoomLimits::default());
    let mut fast = connect(&gk, "R1", 1).await.unwrap();

    let (tx, mut slow_rx) = mpsc::channel(1);
    let slow_conn = ConnectionId::new(2);
    gk.admit(room("R1"), slow_conn, tx).await.unwrap();

    // Fills the slow queue.
    fast.join("Ann").await.unwrap();
    assert_eq!(fast.roster().len(), 2);

    // Overflows it: the slow member is dropped and the roster republished.
    fast.seat().await.unwrap();
    assert_eq!(fast.event(), ServerEvent::SeatAssigned { seat_index: 0 });
    assert_eq!(fast.roster().len(), 2);
    assert_eq!(seats_of(&fast.roster()), vec![(1, Some(0))]);

    assert!(matches!(slow_rx.recv().await, Some(ServerEvent::UpdateUsers(_))));
    assert!(slow_rx.recv().await.is_none());
}

#[tokio::test]
async fn test_shutdown_evicts_everyone() {
    let gk = gatekeeper(RoomLimits::default());
    let mut a = connect(&gk, "A", 1).await.unwrap();
    let mut b = connect(&gk, "B", 2).await.unwrap();

    gk.registry().shutdown().await;

    assert_eq!(gk.registry().room_count(), 0);
    assert!(a.rx.recv().await.is_none());
    assert!(b.rx.recv().await.is_none());
}

#[tokio::test]
async fn test_commands_after_close_report_closed() {
    let gk = gatekeeper(RoomLimits::default());
    let p1 = connect(&gk, "R1", 1).await.unwrap();
    assert!(p1.leave().await);
    wait_for_close(&p1.handle).await;

    assert!(matches!(p1.seat().await, Err(RoomError::Closed(_))));
    assert!(matches!(p1.join("Ann").await, Err(RoomError::Closed(_))));
    assert!(matches!(
        p1.handle.update_orientation(p1.conn, Rotation::default()),
        Err(RoomError::Closed(_))
    ));
}

// =========================================================================
// Transient state and read models
// =========================================================================

#[tokio::test]
async fn test_orientation_is_stored_not_broadcast() {
    let gk = gatekeeper(RoomLimits::default());
    let mut p1 = connect(&gk, "R1", 1).await.unwrap();
    let mut p2 = connect(&gk, "R1", 2).await.unwrap();

    p1.handle
        .update_orientation(p1.conn, Rotation { x: 0.25, y: -1.0 })
        .unwrap();
    p1.handle
        .update_orientation(p1.conn, Rotation { x: 0.5, y: 2.0 })
        .unwrap();

    let snapshot = p1.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.participants[0].camera_rotation, Rotation { x: 0.5, y: 2.0 });
    assert_eq!(snapshot.participants[1].camera_rotation, Rotation::default());
    p1.assert_quiet();
    p2.assert_quiet();
}

#[tokio::test]
async fn test_stats_lists_live_rooms() {
    let gk = gatekeeper(RoomLimits::default());
    let _a1 = connect(&gk, "A", 1).await.unwrap();
    let _a2 = connect(&gk, "A", 2).await.unwrap();
    let _b1 = connect(&gk, "B", 3).await.unwrap();

    let stats = gk.registry().stats().await;
    assert_eq!(stats.len(), 2);
    let a = stats.iter().find(|r| r.room_id.as_str() == "A").unwrap();
    assert_eq!(a.user_count, 2);
    let total: usize = stats.iter().map(|r| r.user_count).sum();
    assert_eq!(total, 3);
}

// =========================================================================
// Concurrency
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_seat_requests_never_collide() {
    let gk = gatekeeper(RoomLimits::default());

    let mut tasks = Vec::new();
    for id in 1..=20u64 {
        let gk = gk.clone();
        tasks.push(tokio::spawn(async move {
            let client = connect(&gk, "R1", id).await.unwrap();
            client.join(&format!("user{id}")).await.unwrap();
            let seat = client.seat().await.unwrap().index();
            (client, seat)
        }));
    }

    let mut clients = Vec::new();
    let mut seats = Vec::new();
    for task in tasks {
        let (client, seat) = task.await.unwrap();
        seats.push(seat);
        clients.push(client);
    }
    seats.sort_unstable();
    assert_eq!(seats, (0..20).collect::<Vec<_>>());

    let snapshot = gk.registry().snapshot(&RoomId::new("R1").unwrap()).await.unwrap();
    assert_eq!(snapshot.occupied_seats, (0..20).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_churn_leaves_registry_consistent() {
    let gk = gatekeeper(RoomLimits::default());

    let mut tasks = Vec::new();
    for id in 1..=40u64 {
        let gk = gk.clone();
        tasks.push(tokio::spawn(async move {
            let room_id = if id % 2 == 0 { "even" } else { "odd" };
            let client = connect(&gk, room_id, id).await.unwrap();
            client.seat().await.unwrap();
            client.leave().await
        }));
    }
    for task in tasks {
        assert!(task.await.unwrap());
    }

    assert_eq!(gk.registry().room_count(), 0);
}
