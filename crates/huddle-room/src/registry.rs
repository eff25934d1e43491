//! The directory of live rooms.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use huddle_protocol::RoomId;
use parking_lot::{Mutex, MutexGuard};

use crate::{RoomHandle, RoomInfo, RoomSnapshot};

/// Maps room ids to running room actors.
///
/// The map is behind a short-lived lock used only for lookups, creation and
/// deletion. It is never held across an `.await`: callers clone the handle
/// and talk to the actor after releasing it.
///
/// Cloning gives another reference to the same registry.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    rooms: Mutex<HashMap<RoomId, RoomHandle>>,
    next_instance: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle of the live room with this id.
    pub fn get(&self, room_id: &RoomId) -> Option<RoomHandle> {
        self.inner.rooms.lock().get(room_id).cloned()
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.inner.rooms.lock().contains_key(room_id)
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.lock().len()
    }

    pub fn handles(&self) -> Vec<RoomHandle> {
        self.inner.rooms.lock().values().cloned().collect()
    }

    /// Summaries of every live room, oldest first.
    ///
    /// Rooms that close while being queried are left out.
    pub async fn stats(&self) -> Vec<RoomInfo> {
        let mut infos = Vec::new();
        for handle in self.handles() {
            if let Ok(info) = handle.info().await {
                infos.push(info);
            }
        }
        infos.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.room_id.cmp(&b.room_id))
        });
        infos
    }

    /// Full state of one room, including stored orientations.
    pub async fn snapshot(&self, room_id: &RoomId) -> Option<RoomSnapshot> {
        self.get(room_id)?.snapshot().await.ok()
    }

    /// Evicts every participant of every room.
    pub async fn shutdown(&self) {
        for handle in self.handles() {
            handle.shutdown().await;
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, HashMap<RoomId, RoomHandle>> {
        self.inner.rooms.lock()
    }

    pub(crate) fn next_instance(&self) -> u64 {
        self.inner.next_instance.fetch_add(1, Ordering::Relaxed)
    }

    /// Removes `room_id` only if it still maps to `instance`, so a closing
    /// room never unregisters its successor.
    pub(crate) fn remove_if_same(&self, room_id: &RoomId, instance: u64) -> bool {
        let mut rooms = self.inner.rooms.lock();
        match rooms.get(room_id) {
            Some(handle) if handle.instance() == instance => {
                rooms.remove(room_id);
                true
            }
            _ => false,
        }
    }
}
