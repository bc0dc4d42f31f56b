use std::sync::Arc;

use dashmap::DashMap;
use log::info;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{BoxedDatabase, Result, RoomData, RoomId};

/// Owns room lifecycle: get-or-create on first join, teardown once empty.
///
/// Also the home of the per-room critical sections. Every mutating operation
/// against a room runs under that room's lock, which closes the
/// check-then-insert race two simultaneous first joins would otherwise hit,
/// while operations against different rooms never contend.
pub struct RoomRegistry {
    database: BoxedDatabase,
    locks: DashMap<RoomId, Arc<Mutex<()>>>,
}

impl RoomRegistry {
    pub fn new(database: BoxedDatabase) -> Self {
        Self {
            database,
            locks: DashMap::new(),
        }
    }

    /// Acquires the critical section for a room id.
    pub async fn lock(&self, room_id: &str) -> OwnedMutexGuard<()> {
        loop {
            let lock = self
                .locks
                .entry(room_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone();

            let guard = lock.clone().lock_owned().await;

            // The entry may have been dropped by a destroy while we were
            // waiting, in which case a fresh one could already be in use.
            let is_current = self
                .locks
                .get(room_id)
                .map(|current| Arc::ptr_eq(&lock, current.value()))
                .unwrap_or(false);

            if is_current {
                return guard;
            }
        }
    }

    /// Idempotent get-or-create. The `bool` is true when the room was just
    /// created, the signal that grants the first joiner `Host`.
    ///
    /// Must be called under the room's lock.
    pub async fn ensure_room(&self, room_id: &str) -> Result<(RoomData, bool)> {
        match self.database.room_by_id(room_id).await {
            Ok(room) => Ok((room, false)),
            Err(e) if e.is_not_found() => {
                let room = self.database.create_room(room_id).await?;
                info!("Room {room_id} created");

                Ok((room, true))
            }
            Err(e) => Err(e),
        }
    }

    /// Deletes the room when no participants remain. Returns whether the
    /// room was destroyed.
    ///
    /// Must be called under the room's lock.
    pub async fn destroy_if_empty(&self, room_id: &str) -> Result<bool> {
        let remaining = self.database.participants_in_room(room_id).await?;

        if !remaining.is_empty() {
            return Ok(false);
        }

        match self.database.delete_room(room_id).await {
            Ok(()) => {}
            // Already gone, nothing to do
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        self.locks.remove(room_id);
        info!("Room {room_id} destroyed");

        Ok(true)
    }
}
