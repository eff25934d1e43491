//! The room data model.
//!
//! A [`Room`] is plain state with no concurrency of its own: it is owned by
//! exactly one room actor, which applies commands to it one at a time. All
//! invariants (seat bookkeeping, capacity, join order) are enforced here so
//! they can be tested without a runtime.

use chrono::{DateTime, Utc};
use huddle_protocol::{ConnectionId, RoomId, RosterEntry, Rotation};
use huddle_session::{Identity, SessionPhase};
use serde::Serialize;

use crate::{RoomError, RoomLimits, SeatPool};

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// One connection inside a room.
///
/// Starts unidentified and unseated. Without a seat it is a spectator,
/// which is a valid final state.
#[derive(Debug, Clone)]
pub struct Participant {
    id: ConnectionId,
    identity: Option<Identity>,
    seat_index: Option<usize>,
    rotation: Rotation,
    connected_at: DateTime<Utc>,
}

impl Participant {
    fn new(id: ConnectionId) -> Self {
        Self {
            id,
            identity: None,
            seat_index: None,
            rotation: Rotation::default(),
            connected_at: Utc::now(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.identity.as_ref().map(Identity::name)
    }

    pub fn character(&self) -> Option<&str> {
        self.identity.as_ref().map(Identity::character)
    }

    pub fn seat_index(&self) -> Option<usize> {
        self.seat_index
    }

    /// The lifecycle phase this participant is in.
    pub fn phase(&self) -> SessionPhase {
        SessionPhase::of_member(self.identity.is_some(), self.seat_index.is_some())
    }

    /// How other members see this participant.
    pub fn roster_entry(&self) -> RosterEntry {
        RosterEntry {
            id: self.id,
            name: self.name().map(str::to_owned),
            character: self.character().map(str::to_owned),
            seat_index: self.seat_index,
        }
    }

    fn snapshot(&self) -> ParticipantSnapshot {
        ParticipantSnapshot {
            id: self.id,
            name: self.name().map(str::to_owned),
            character: self.character().map(str::to_owned),
            seat_index: self.seat_index,
            camera_rotation: self.rotation,
            connected_at: self.connected_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Read models
// ---------------------------------------------------------------------------

/// Summary of a room, as listed by `/stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub user_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// A participant including the state that is never broadcast.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSnapshot {
    pub id: ConnectionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat_index: Option<usize>,
    pub camera_rotation: Rotation,
    pub connected_at: DateTime<Utc>,
}

/// Everything a room holds, in join order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub occupied_seats: Vec<usize>,
    pub participants: Vec<ParticipantSnapshot>,
}

/// Outcome of a successful seat request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatGrant {
    /// A free seat was reserved.
    Assigned(usize),
    /// The participant already held this seat; nothing changed.
    AlreadySeated(usize),
}

impl SeatGrant {
    pub fn index(self) -> usize {
        match self {
            Self::Assigned(index) | Self::AlreadySeated(index) => index,
        }
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// An ephemeral group of participants sharing a seat pool.
#[derive(Debug, Clone)]
pub struct Room {
    id: RoomId,
    /// Join order is roster order, so a `Vec` with linear lookup. Rooms
    /// hold a few dozen participants at most.
    participants: Vec<Participant>,
    seats: SeatPool,
    max_participants: usize,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl Room {
    /// Creates an empty room sized by `limits`.
    pub fn new(id: RoomId, limits: &RoomLimits) -> Self {
        let now = Utc::now();
        Self {
            id,
            participants: Vec::new(),
            seats: SeatPool::new(limits.seat_capacity),
            max_participants: limits.max_users_per_room,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.max_participants
    }

    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.position(conn).is_some()
    }

    pub fn participant(&self, conn: ConnectionId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == conn)
    }

    /// Member ids in join order.
    pub fn member_ids(&self) -> Vec<ConnectionId> {
        self.participants.iter().map(|p| p.id).collect()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Adds an unidentified, unseated participant.
    ///
    /// # Errors
    /// [`RoomError::AlreadyInRoom`] for a duplicate id and
    /// [`RoomError::RoomFull`] at the participant cap.
    pub fn admit(&mut self, conn: ConnectionId) -> Result<(), RoomError> {
        if self.contains(conn) {
            return Err(RoomError::AlreadyInRoom(conn, self.id.clone()));
        }
        if self.is_full() {
            return Err(RoomError::RoomFull(self.id.clone()));
        }
        self.participants.push(Participant::new(conn));
        Ok(())
    }

    /// Sets (or replaces) a participant's name and character.
    pub fn bind_identity(
        &mut self,
        conn: ConnectionId,
        identity: Identity,
    ) -> Result<(), RoomError> {
        let participant = self.participant_mut(conn)?;
        participant.identity = Some(identity);
        self.touch();
        Ok(())
    }

    /// Gives the participant the lowest free seat, or confirms the one it
    /// already holds.
    ///
    /// # Errors
    /// [`RoomError::NotInRoom`] for strangers and
    /// [`RoomError::SeatsExhausted`] when every seat is taken.
    pub fn request_seat(&mut self, conn: ConnectionId) -> Result<SeatGrant, RoomError> {
        let pos = self.position(conn).ok_or_else(|| self.not_in_room(conn))?;
        if let Some(index) = self.participants[pos].seat_index {
            return Ok(SeatGrant::AlreadySeated(index));
        }
        let index = self
            .seats
            .acquire()
            .ok_or_else(|| RoomError::SeatsExhausted(self.id.clone()))?;
        self.participants[pos].seat_index = Some(index);
        self.touch();
        debug_assert!(self.seats_consistent());
        Ok(SeatGrant::Assigned(index))
    }

    /// Stores a new camera orientation. Not an activity: it does not touch
    /// `last_activity`.
    pub fn update_orientation(
        &mut self,
        conn: ConnectionId,
        rotation: Rotation,
    ) -> Result<(), RoomError> {
        self.participant_mut(conn)?.rotation = rotation;
        Ok(())
    }

    /// Removes a participant and frees its seat. Returns `None` if it was
    /// not a member.
    pub fn release(&mut self, conn: ConnectionId) -> Option<Participant> {
        let pos = self.position(conn)?;
        let participant = self.participants.remove(pos);
        if let Some(index) = participant.seat_index {
            self.seats.release(index);
        }
        self.touch();
        debug_assert!(self.seats_consistent());
        Some(participant)
    }

    /// The roster broadcast to members, in join order.
    pub fn roster(&self) -> Vec<RosterEntry> {
        self.participants.iter().map(Participant::roster_entry).collect()
    }

    pub fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.id.clone(),
            user_count: self.participants.len(),
            created_at: self.created_at,
            last_activity: self.last_activity,
        }
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.id.clone(),
            created_at: self.created_at,
            last_activity: self.last_activity,
            occupied_seats: self.seats.occupied(),
            participants: self.participants.iter().map(Participant::snapshot).collect(),
        }
    }

    fn position(&self, conn: ConnectionId) -> Option<usize> {
        self.participants.iter().position(|p| p.id == conn)
    }

    fn participant_mut(&mut self, conn: ConnectionId) -> Result<&mut Participant, RoomError> {
        match self.position(conn) {
            Some(pos) => Ok(&mut self.participants[pos]),
            None => Err(self.not_in_room(conn)),
        }
    }

    fn not_in_room(&self, conn: ConnectionId) -> RoomError {
        RoomError::NotInRoom(conn, self.id.clone())
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// The occupied seats are exactly the seats participants hold.
    fn seats_consistent(&self) -> bool {
        let mut held: Vec<usize> = self
            .participants
            .iter()
            .filter_map(|p| p.seat_index)
            .collect();
        held.sort_unstable();
        held == self.seats.occupied()
    }
}

// =========================================================================
// Tests
// =========================================================================
