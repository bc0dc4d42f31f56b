use serde::Serialize;

use crate::ParticipantMap;

/// Events pushed to clients after a committed mutation.
///
/// Event and field names are the wire protocol; membership-bearing payloads
/// always carry the complete participant mapping so any single message is
/// enough to reconstruct room membership client-side.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RoomEvent {
    /// Someone joined; sent to the whole room, joiner included.
    UserJoined { participants: ParticipantMap },
    /// Full playback snapshot, sent to a joining connection only.
    SyncState {
        video_id: String,
        current_time: f64,
        play_state: PlayState,
    },
    Play,
    Pause,
    Seek { time: f64 },
    ChangeVideo {
        video_id: String,
        /// Always 0; changing video rewinds.
        current_time: f64,
    },
    RoleUpdated { participants: ParticipantMap },
    /// Sent to a removed connection only, before the room hears about it.
    Removed,
    UserLeft { participants: ParticipantMap },
}

/// The play/pause flag as clients expect it in `sync_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayState {
    Playing,
    Paused,
}

impl From<bool> for PlayState {
    fn from(is_playing: bool) -> Self {
        if is_playing {
            PlayState::Playing
        } else {
            PlayState::Paused
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::Role, ParticipantProfile};
    use serde_json::json;

    #[test]
    fn sync_state_wire_shape() {
        let event = RoomEvent::SyncState {
            video_id: "dQw4w9WgXcQ".to_string(),
            current_time: 42.5,
            play_state: true.into(),
        };

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "sync_state",
                "videoId": "dQw4w9WgXcQ",
                "currentTime": 42.5,
                "playState": "playing",
            })
        );
    }

    #[test]
    fn membership_events_carry_the_full_mapping() {
        let mut participants = ParticipantMap::new();
        participants.insert(
            "c1".to_string(),
            ParticipantProfile {
                username: "alice".to_string(),
                role: Role::Host,
            },
        );

        assert_eq!(
            serde_json::to_value(RoomEvent::UserJoined { participants }).unwrap(),
            json!({
                "type": "user_joined",
                "participants": {
                    "c1": { "username": "alice", "role": "Host" },
                },
            })
        );
    }

    #[test]
    fn playback_events_wire_shape() {
        assert_eq!(
            serde_json::to_value(RoomEvent::Play).unwrap(),
            json!({ "type": "play" })
        );

        assert_eq!(
            serde_json::to_value(RoomEvent::ChangeVideo {
                video_id: "abc".to_string(),
                current_time: 0.,
            })
            .unwrap(),
            json!({ "type": "change_video", "videoId": "abc", "currentTime": 0.0 })
        );
    }
}
