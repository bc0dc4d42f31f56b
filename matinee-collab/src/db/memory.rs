use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::{
    auth::Role, DatabaseError, NewParticipant, ParticipantData, Result, RoomData, UpdatedRoom,
    DEFAULT_VIDEO_ID,
};

use super::Database;

/// An in-memory database, used by tests and local development.
///
/// Participants are kept in a Vec so enumeration order is join order, the
/// same order the postgres implementation gets from sorting on `joined_at`.
#[derive(Default)]
pub struct MemoryDatabase {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    rooms: HashMap<String, RoomData>,
    participants: Vec<ParticipantData>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn room_by_id(&self, room_id: &str) -> Result<RoomData> {
        self.state
            .lock()
            .rooms
            .get(room_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "room",
                identifier: "id",
            })
    }

    async fn create_room(&self, room_id: &str) -> Result<RoomData> {
        let mut state = self.state.lock();

        if state.rooms.contains_key(room_id) {
            return Err(DatabaseError::Conflict {
                resource: "room",
                field: "id",
                value: room_id.to_string(),
            });
        }

        let room = RoomData {
            id: room_id.to_string(),
            video_id: DEFAULT_VIDEO_ID.to_string(),
            position_seconds: 0.,
            is_playing: false,
            created_at: Utc::now(),
        };

        state.rooms.insert(room_id.to_string(), room.clone());
        Ok(room)
    }

    async fn update_room(&self, updated_room: UpdatedRoom) -> Result<RoomData> {
        let mut state = self.state.lock();

        let room = state
            .rooms
            .get_mut(&updated_room.id)
            .ok_or(DatabaseError::NotFound {
                resource: "room",
                identifier: "id",
            })?;

        if let Some(video_id) = updated_room.video_id {
            room.video_id = video_id;
        }
        if let Some(position_seconds) = updated_room.position_seconds {
            room.position_seconds = position_seconds;
        }
        if let Some(is_playing) = updated_room.is_playing {
            room.is_playing = is_playing;
        }

        Ok(room.clone())
    }

    async fn delete_room(&self, room_id: &str) -> Result<()> {
        let mut state = self.state.lock();

        state.rooms.remove(room_id).ok_or(DatabaseError::NotFound {
            resource: "room",
            identifier: "id",
        })?;

        // Cascade, like the foreign key constraint would
        state.participants.retain(|p| p.room_id != room_id);
        Ok(())
    }

    async fn participant_by_connection(&self, connection_id: &str) -> Result<ParticipantData> {
        self.state
            .lock()
            .participants
            .iter()
            .find(|p| p.connection_id == connection_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "participant",
                identifier: "connection_id",
            })
    }

    async fn participants_in_room(&self, room_id: &str) -> Result<Vec<ParticipantData>> {
        Ok(self
            .state
            .lock()
            .participants
            .iter()
            .filter(|p| p.room_id == room_id)
            .cloned()
            .collect())
    }

    async fn create_participant(&self, new_participant: NewParticipant) -> Result<ParticipantData> {
        let mut state = self.state.lock();

        if state
            .participants
            .iter()
            .any(|p| p.connection_id == new_participant.connection_id)
        {
            return Err(DatabaseError::Conflict {
                resource: "participant",
                field: "connection_id",
                value: new_participant.connection_id,
            });
        }

        let participant = ParticipantData {
            connection_id: new_participant.connection_id,
            room_id: new_participant.room_id,
            username: new_participant.username,
            role: new_participant.role,
            joined_at: Utc::now(),
        };

        state.participants.push(participant.clone());
        Ok(participant)
    }

    async fn update_participant_role(&self, connection_id: &str, role: Role) -> Result<ParticipantData> {
        let mut state = self.state.lock();

        let participant = state
            .participants
            .iter_mut()
            .find(|p| p.connection_id == connection_id)
            .ok_or(DatabaseError::NotFound {
                resource: "participant",
                identifier: "connection_id",
            })?;

        participant.role = role;
        Ok(participant.clone())
    }

    async fn delete_participant(&self, connection_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        let before = state.participants.len();

        state.participants.retain(|p| p.connection_id != connection_id);

        if state.participants.len() == before {
            return Err(DatabaseError::NotFound {
                resource: "participant",
                identifier: "connection_id",
            });
        }

        Ok(())
    }
}
