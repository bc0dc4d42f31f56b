mod auth;
mod broadcast;
mod db;
mod events;
mod rooms;

use std::sync::Arc;

pub use auth::*;
pub use broadcast::*;
pub use db::*;
pub use events::*;
pub use rooms::*;

/// The matinee collab system, coordinating rooms, membership, and shared
/// playback across connected clients.
///
/// Storage and delivery are injected capabilities: the server shell hands in
/// its database and its websocket fanout, and everything in between is owned
/// here.
pub struct Collab {
    pub rooms: RoomManager,
}

impl Collab {
    pub fn new(database: BoxedDatabase, broadcast: Arc<dyn Broadcast>) -> Self {
        Self {
            rooms: RoomManager::new(database, broadcast),
        }
    }
}
