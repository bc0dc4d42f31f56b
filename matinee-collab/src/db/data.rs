use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::Role;

/// Rooms are identified by the client-chosen name used to join them.
pub type RoomId = String;

/// The transport-level identifier of a live connection. Assigned by the
/// gateway when a socket is accepted, and used as the participant key.
pub type ConnectionId = String;

/// The video every new room starts out with.
pub const DEFAULT_VIDEO_ID: &str = "ikmY-nMFDQA";

/// A room's persisted playback state
#[derive(Debug, Clone)]
pub struct RoomData {
    pub id: RoomId,
    pub video_id: String,
    /// Playhead position in seconds. Deliberately unvalidated; clients may
    /// seek anywhere, including out of bounds.
    pub position_seconds: f64,
    pub is_playing: bool,
    pub created_at: DateTime<Utc>,
}

/// A user present in a room, keyed by their connection
#[derive(Debug, Clone)]
pub struct ParticipantData {
    pub connection_id: ConnectionId,
    pub room_id: RoomId,
    pub username: String,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewParticipant {
    pub connection_id: ConnectionId,
    pub room_id: RoomId,
    pub username: String,
    pub role: Role,
}

/// Partial update applied to a room's playback columns
#[derive(Debug, Default)]
pub struct UpdatedRoom {
    pub id: RoomId,
    pub video_id: Option<String>,
    pub position_seconds: Option<f64>,
    pub is_playing: Option<bool>,
}

/// What a room's members see of each other in membership broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantProfile {
    pub username: String,
    pub role: Role,
}

/// The complete membership of a room, connection id to profile. Every
/// membership-bearing broadcast carries one of these, never a delta.
pub type ParticipantMap = BTreeMap<ConnectionId, ParticipantProfile>;

/// Collapses participant rows into the broadcast mapping.
pub fn to_participant_map(participants: Vec<ParticipantData>) -> ParticipantMap {
    participants
        .into_iter()
        .map(|p| {
            (
                p.connection_id,
                ParticipantProfile {
                    username: p.username,
                    role: p.role,
                },
            )
        })
        .collect()
}
