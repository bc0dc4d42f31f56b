use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

use crate::auth::Role;

pub type Result<T> = std::result::Result<T, DatabaseError>;
pub type BoxedDatabase = Arc<dyn Database>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

impl DatabaseError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound { .. })
    }
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Represents a type that can store matinee rooms and participants
#[async_trait]
pub trait Database: Send + Sync + 'static {
    async fn room_by_id(&self, room_id: &str) -> Result<RoomData>;
    /// Creates a room with default playback state
    async fn create_room(&self, room_id: &str) -> Result<RoomData>;
    async fn update_room(&self, updated_room: UpdatedRoom) -> Result<RoomData>;
    /// Deletes a room, cascading to any participant rows left in it
    async fn delete_room(&self, room_id: &str) -> Result<()>;

    async fn participant_by_connection(&self, connection_id: &str) -> Result<ParticipantData>;
    /// Lists a room's participants in join order, ties broken by connection id
    async fn participants_in_room(&self, room_id: &str) -> Result<Vec<ParticipantData>>;
    async fn create_participant(&self, new_participant: NewParticipant) -> Result<ParticipantData>;
    async fn update_participant_role(&self, connection_id: &str, role: Role) -> Result<ParticipantData>;
    async fn delete_participant(&self, connection_id: &str) -> Result<()>;
}
