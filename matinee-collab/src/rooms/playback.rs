use crate::{BoxedDatabase, Result, RoomData, UpdatedRoom};

/// Applies playback transitions to a room's persisted state.
///
/// Authorization and per-room serialization are the manager's job; by the
/// time a transition lands here it is already allowed to happen.
pub struct PlaybackStateMachine {
    database: BoxedDatabase,
}

impl PlaybackStateMachine {
    pub fn new(database: BoxedDatabase) -> Self {
        Self { database }
    }

    pub async fn play(&self, room_id: &str) -> Result<RoomData> {
        self.database
            .update_room(UpdatedRoom {
                id: room_id.to_string(),
                is_playing: Some(true),
                ..Default::default()
            })
            .await
    }

    pub async fn pause(&self, room_id: &str) -> Result<RoomData> {
        self.database
            .update_room(UpdatedRoom {
                id: room_id.to_string(),
                is_playing: Some(false),
                ..Default::default()
            })
            .await
    }

    /// Sets the playhead. The value is passed through untouched; bounds
    /// checking is deliberately out of scope.
    pub async fn seek(&self, room_id: &str, time: f64) -> Result<RoomData> {
        self.database
            .update_room(UpdatedRoom {
                id: room_id.to_string(),
                position_seconds: Some(time),
                ..Default::default()
            })
            .await
    }

    /// Switching videos always rewinds to 0 and pauses.
    pub async fn change_video(&self, room_id: &str, video_id: &str) -> Result<RoomData> {
        self.database
            .update_room(UpdatedRoom {
                id: room_id.to_string(),
                video_id: Some(video_id.to_string()),
                position_seconds: Some(0.),
                is_playing: Some(false),
            })
            .await
    }
}
