use matinee_collab::Role;
use serde::Deserialize;

/// Messages clients send over the websocket.
///
/// Frames that fail to parse are dropped at the gateway; there is no error
/// channel back to the sender.
#[derive(Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinRoom { room_id: String, username: String },
    Play { room_id: String },
    Pause { room_id: String },
    Seek { room_id: String, time: f64 },
    ChangeVideo { room_id: String, video_id: String },
    AssignRole { room_id: String, user_id: String, role: Role },
    RemoveParticipant { room_id: String, user_id: String },
}
