use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info};
use matinee_collab::{Broadcast, ConnectionId, RoomError, RoomEvent};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use crate::{context::ServerContext, protocol::ClientEvent};

const CONNECTION_ID_LENGTH: usize = 20;

/// The connection session tracker.
///
/// Binds live sockets to their generated connection ids and hands events
/// back out to them; the collab core addresses connections only through the
/// [Broadcast] impl on this type.
pub struct Gateway {
    connections: DashMap<ConnectionId, UnboundedSender<Message>>,
}

impl Gateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connections: DashMap::new(),
        })
    }

    fn register(&self, connection_id: &str, sender: UnboundedSender<Message>) {
        self.connections.insert(connection_id.to_string(), sender);
    }

    fn unregister(&self, connection_id: &str) {
        self.connections.remove(connection_id);
    }
}

impl Broadcast for Gateway {
    fn send(&self, connection_id: &str, event: RoomEvent) {
        if let Some(sender) = self.connections.get(connection_id) {
            let payload = serde_json::to_string(&event).expect("event serializes");

            // A send failure means the socket task already wound down; the
            // disconnect path takes care of the rest.
            let _ = sender.send(Message::Text(payload));
        }
    }
}

pub async fn websocket_handler(
    State(context): State<ServerContext>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(context, socket))
}

async fn handle_socket(context: ServerContext, socket: WebSocket) {
    let connection_id = random_string(CONNECTION_ID_LENGTH);
    let (mut sink, mut stream) = socket.split();
    let (sender, mut receiver) = unbounded_channel();

    context.gateway.register(&connection_id, sender);
    info!("Connection {connection_id} established");

    let writer = tokio::spawn(async move {
        while let Some(message) = receiver.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => dispatch(&context, &connection_id, &text).await,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    // Stop delivering before membership changes so the closing socket never
    // sees its own departure.
    context.gateway.unregister(&connection_id);
    writer.abort();

    if let Err(err) = context.collab.rooms.leave(&connection_id).await {
        error!("Disconnect cleanup for {connection_id} failed: {err}");
    }

    info!("Connection {connection_id} closed");
}

/// Routes one inbound frame to the collab core. All failure modes degrade to
/// "nothing visibly happens": parse and authorization problems are logged at
/// debug, store problems at error, and the sender is never notified.
async fn dispatch(context: &ServerContext, connection_id: &str, text: &str) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(err) => {
            debug!("Dropping malformed frame from {connection_id}: {err}");
            return;
        }
    };

    let rooms = &context.collab.rooms;

    let result = match event {
        ClientEvent::JoinRoom { room_id, username } => {
            rooms.join(&room_id, connection_id, &username).await
        }
        ClientEvent::Play { room_id } => rooms.play(&room_id, connection_id).await,
        ClientEvent::Pause { room_id } => rooms.pause(&room_id, connection_id).await,
        ClientEvent::Seek { room_id, time } => rooms.seek(&room_id, connection_id, time).await,
        ClientEvent::ChangeVideo { room_id, video_id } => {
            rooms.change_video(&room_id, connection_id, &video_id).await
        }
        ClientEvent::AssignRole {
            room_id,
            user_id,
            role,
        } => rooms.assign_role(&room_id, connection_id, &user_id, role).await,
        ClientEvent::RemoveParticipant { room_id, user_id } => {
            rooms.remove_participant(&room_id, connection_id, &user_id).await
        }
    };

    match result {
        Ok(()) => {}
        Err(RoomError::Database(err)) => {
            error!("Store failure while handling event from {connection_id}: {err}");
        }
        Err(err) => {
            debug!("Dropping event from {connection_id}: {err}");
        }
    }
}

fn random_string(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .take(length)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_events_to_registered_connections_only() {
        let gateway = Gateway::new();
        let (sender, mut receiver) = unbounded_channel();

        gateway.register("c1", sender);
        gateway.send("c1", RoomEvent::Play);
        gateway.send("nobody", RoomEvent::Pause);

        let message = receiver.recv().await.unwrap();
        match message {
            Message::Text(text) => assert!(text.contains("\"play\"")),
            other => panic!("unexpected message: {other:?}"),
        }

        gateway.unregister("c1");
        gateway.send("c1", RoomEvent::Pause);
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn connection_ids_are_unique_enough() {
        let a = random_string(CONNECTION_ID_LENGTH);
        let b = random_string(CONNECTION_ID_LENGTH);

        assert_eq!(a.len(), CONNECTION_ID_LENGTH);
        assert_ne!(a, b);
    }
}
