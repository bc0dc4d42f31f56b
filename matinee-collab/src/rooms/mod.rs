mod playback;
mod registry;

use log::{debug, info};
use thiserror::Error;

pub use playback::*;
pub use registry::*;

use crate::{
    auth::Role, to_participant_map, Broadcast, BroadcastCoordinator, BoxedDatabase, DatabaseError,
    NewParticipant, ParticipantData, ParticipantMap, RoomEvent,
};

use std::sync::Arc;

/// The authoritative per-room coordinator.
///
/// Reconciles joins, leaves, role changes and playback control into a single
/// consistent view, persisting every mutation before broadcasting the result
/// to the room. All mutating operations for one room run under that room's
/// critical section (see [RoomRegistry::lock]).
pub struct RoomManager {
    database: BoxedDatabase,
    registry: RoomRegistry,
    playback: PlaybackStateMachine,
    broadcast: BroadcastCoordinator,
}

#[derive(Debug, Error)]
pub enum RoomError {
    /// The sender's role doesn't permit the attempted action, or the sender
    /// is acting on a room they are not in. Dropped silently at the edge.
    #[error("Sender is not allowed to perform this action")]
    Unauthorized,
    /// The connection has no participant record
    #[error("Connection has not joined a room")]
    UnknownConnection,
    /// The target of a role change or removal isn't in the room
    #[error("Target participant is not in this room")]
    TargetNotInRoom,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl RoomError {
    fn unknown_or(e: DatabaseError) -> Self {
        if e.is_not_found() {
            Self::UnknownConnection
        } else {
            Self::Database(e)
        }
    }
}

pub type RoomResult = Result<(), RoomError>;

impl RoomManager {
    pub fn new(database: BoxedDatabase, broadcast: Arc<dyn Broadcast>) -> Self {
        Self {
            registry: RoomRegistry::new(database.clone()),
            playback: PlaybackStateMachine::new(database.clone()),
            broadcast: BroadcastCoordinator::new(broadcast),
            database,
        }
    }

    /// Adds a connection to a room, creating the room if it doesn't exist.
    /// The first joiner of a room becomes its `Host`.
    ///
    /// Empty room ids and usernames make this a silent no-op, matching the
    /// permissive contract clients rely on.
    pub async fn join(&self, room_id: &str, connection_id: &str, username: &str) -> RoomResult {
        if room_id.is_empty() || username.is_empty() {
            debug!("Ignoring join from {connection_id} with missing fields");
            return Ok(());
        }

        let _guard = self.registry.lock(room_id).await;

        let (room, created) = self.registry.ensure_room(room_id).await?;
        let role = if created { Role::Host } else { Role::Participant };

        self.database
            .create_participant(NewParticipant {
                connection_id: connection_id.to_string(),
                room_id: room_id.to_string(),
                username: username.to_string(),
                role,
            })
            .await?;

        info!("{username} joined room {room_id} as {role:?}");

        let participants = self.mapping(room_id).await?;
        self.broadcast.to_room(
            &participants,
            RoomEvent::UserJoined {
                participants: participants.clone(),
            },
        );

        // Late joiners converge on the room's current playback state
        self.broadcast.to_connection(
            connection_id,
            RoomEvent::SyncState {
                video_id: room.video_id,
                current_time: room.position_seconds,
                play_state: room.is_playing.into(),
            },
        );

        Ok(())
    }

    /// Disconnect path. Deletes the participant, destroys the room if it
    /// became empty, and otherwise guarantees the room converges back to
    /// having exactly one host.
    ///
    /// A connection that never joined is a no-op.
    pub async fn leave(&self, connection_id: &str) -> RoomResult {
        let participant = match self.database.participant_by_connection(connection_id).await {
            Ok(participant) => participant,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let room_id = participant.room_id;
        let _guard = self.registry.lock(&room_id).await;

        // The row can be gone by the time we hold the lock, e.g. when the
        // host removed this participant while the socket was closing.
        match self.database.delete_participant(connection_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        info!("{} left room {room_id}", participant.username);
        self.reconcile_after_departure(&room_id).await
    }

    /// Reassigns a participant's role. Host-only.
    ///
    /// Assigning `Host` transfers hostship: the previous host steps down to
    /// `Participant`, keeping the one-host invariant intact.
    pub async fn assign_role(
        &self,
        room_id: &str,
        requester_connection_id: &str,
        target_connection_id: &str,
        new_role: Role,
    ) -> RoomResult {
        let _guard = self.registry.lock(room_id).await;

        let requester = self.require_host(room_id, requester_connection_id).await?;
        let target = self.require_in_room(room_id, target_connection_id).await?;

        if new_role.is_host() && target.connection_id != requester.connection_id {
            self.database
                .update_participant_role(&requester.connection_id, Role::Participant)
                .await?;
        }

        self.database
            .update_participant_role(&target.connection_id, new_role)
            .await?;

        info!(
            "{} is now {new_role:?} in room {room_id}",
            target.username
        );

        let participants = self.mapping(room_id).await?;
        self.broadcast.to_room(
            &participants,
            RoomEvent::RoleUpdated {
                participants: participants.clone(),
            },
        );

        Ok(())
    }

    /// Kicks a participant out of the room. Host-only.
    ///
    /// The removed connection is told directly before the room-wide
    /// membership broadcast goes out.
    pub async fn remove_participant(
        &self,
        room_id: &str,
        requester_connection_id: &str,
        target_connection_id: &str,
    ) -> RoomResult {
        let _guard = self.registry.lock(room_id).await;

        self.require_host(room_id, requester_connection_id).await?;
        let target = self.require_in_room(room_id, target_connection_id).await?;

        self.database
            .delete_participant(&target.connection_id)
            .await?;

        info!("{} was removed from room {room_id}", target.username);
        self.broadcast
            .to_connection(&target.connection_id, RoomEvent::Removed);

        self.reconcile_after_departure(room_id).await
    }

    pub async fn play(&self, room_id: &str, sender_connection_id: &str) -> RoomResult {
        let _guard = self.registry.lock(room_id).await;

        self.require_privileged(room_id, sender_connection_id).await?;
        self.playback.play(room_id).await?;
        self.broadcast_to_room(room_id, RoomEvent::Play).await
    }

    pub async fn pause(&self, room_id: &str, sender_connection_id: &str) -> RoomResult {
        let _guard = self.registry.lock(room_id).await;

        self.require_privileged(room_id, sender_connection_id).await?;
        self.playback.pause(room_id).await?;
        self.broadcast_to_room(room_id, RoomEvent::Pause).await
    }

    pub async fn seek(&self, room_id: &str, sender_connection_id: &str, time: f64) -> RoomResult {
        let _guard = self.registry.lock(room_id).await;

        self.require_privileged(room_id, sender_connection_id).await?;
        self.playback.seek(room_id, time).await?;
        self.broadcast_to_room(room_id, RoomEvent::Seek { time }).await
    }

    pub async fn change_video(
        &self,
        room_id: &str,
        sender_connection_id: &str,
        video_id: &str,
    ) -> RoomResult {
        let _guard = self.registry.lock(room_id).await;

        self.require_privileged(room_id, sender_connection_id).await?;
        self.playback.change_video(room_id, video_id).await?;
        self.broadcast_to_room(
            room_id,
            RoomEvent::ChangeVideo {
                video_id: video_id.to_string(),
                current_time: 0.,
            },
        )
        .await
    }

    /// Runs after any departure: tears the room down when empty, otherwise
    /// restores the host invariant and tells the room who is left.
    async fn reconcile_after_departure(&self, room_id: &str) -> RoomResult {
        if self.registry.destroy_if_empty(room_id).await? {
            return Ok(());
        }

        self.ensure_host(room_id).await?;

        let participants = self.mapping(room_id).await?;
        self.broadcast.to_room(
            &participants,
            RoomEvent::UserLeft {
                participants: participants.clone(),
            },
        );

        Ok(())
    }

    /// Host failover: when no host remains, the first participant in join
    /// order is promoted.
    async fn ensure_host(&self, room_id: &str) -> Result<(), DatabaseError> {
        let remaining = self.database.participants_in_room(room_id).await?;

        if remaining.iter().any(|p| p.role.is_host()) {
            return Ok(());
        }

        if let Some(next) = remaining.first() {
            self.database
                .update_participant_role(&next.connection_id, Role::Host)
                .await?;

            info!("{} is now hosting room {room_id}", next.username);
        }

        Ok(())
    }

    /// Resolves the sender's role at call time and requires playback
    /// privileges in the named room.
    async fn require_privileged(
        &self,
        room_id: &str,
        connection_id: &str,
    ) -> Result<ParticipantData, RoomError> {
        let participant = self
            .database
            .participant_by_connection(connection_id)
            .await
            .map_err(RoomError::unknown_or)?;

        if participant.room_id != room_id || !participant.role.is_privileged() {
            return Err(RoomError::Unauthorized);
        }

        Ok(participant)
    }

    /// Like [Self::require_privileged], but for host-only actions. Exact
    /// match: moderators do not qualify.
    async fn require_host(
        &self,
        room_id: &str,
        connection_id: &str,
    ) -> Result<ParticipantData, RoomError> {
        let participant = self
            .database
            .participant_by_connection(connection_id)
            .await
            .map_err(RoomError::unknown_or)?;

        if participant.room_id != room_id || !participant.role.is_host() {
            return Err(RoomError::Unauthorized);
        }

        Ok(participant)
    }

    async fn require_in_room(
        &self,
        room_id: &str,
        connection_id: &str,
    ) -> Result<ParticipantData, RoomError> {
        let participant = self
            .database
            .participant_by_connection(connection_id)
            .await
            .map_err(RoomError::unknown_or)?;

        if participant.room_id != room_id {
            return Err(RoomError::TargetNotInRoom);
        }

        Ok(participant)
    }

    async fn mapping(&self, room_id: &str) -> Result<ParticipantMap, DatabaseError> {
        let participants = self.database.participants_in_room(room_id).await?;
        Ok(to_participant_map(participants))
    }

    async fn broadcast_to_room(&self, room_id: &str, event: RoomEvent) -> RoomResult {
        let participants = self.mapping(room_id).await?;
        self.broadcast.to_room(&participants, event);
        Ok(())
    }
}
