use std::sync::Arc;

use crate::{ParticipantMap, RoomEvent};

/// Delivery capability implemented by the transport layer.
///
/// Delivery is fire-and-forget: a connection that has gone away simply
/// doesn't receive the event.
pub trait Broadcast: Send + Sync + 'static {
    fn send(&self, connection_id: &str, event: RoomEvent);
}

/// Fans committed state changes out to room members.
///
/// Callers hand it the participant mapping they just read under the room
/// lock, which doubles as the recipient set; this keeps "who gets told"
/// consistent with "what they are told".
#[derive(Clone)]
pub struct BroadcastCoordinator {
    sink: Arc<dyn Broadcast>,
}

impl BroadcastCoordinator {
    pub fn new(sink: Arc<dyn Broadcast>) -> Self {
        Self { sink }
    }

    /// Delivers an event to every connection in the mapping.
    pub fn to_room(&self, participants: &ParticipantMap, event: RoomEvent) {
        for connection_id in participants.keys() {
            self.sink.send(connection_id, event.clone());
        }
    }

    /// Delivers an event to a single connection.
    pub fn to_connection(&self, connection_id: &str, event: RoomEvent) {
        self.sink.send(connection_id, event);
    }
}
