use std::sync::Arc;

use matinee_collab::{
    Broadcast, Collab, Database, MemoryDatabase, PlayState, Role, RoomEvent, DEFAULT_VIDEO_ID,
};
use parking_lot::Mutex;

/// Captures everything the coordinator tries to deliver, in order.
#[derive(Default)]
struct RecordingBroadcast {
    sent: Mutex<Vec<(String, RoomEvent)>>,
}

impl Broadcast for RecordingBroadcast {
    fn send(&self, connection_id: &str, event: RoomEvent) {
        self.sent.lock().push((connection_id.to_string(), event));
    }
}

impl RecordingBroadcast {
    fn all(&self) -> Vec<(String, RoomEvent)> {
        self.sent.lock().clone()
    }

    fn for_connection(&self, connection_id: &str) -> Vec<RoomEvent> {
        self.sent
            .lock()
            .iter()
            .filter(|(id, _)| id == connection_id)
            .map(|(_, event)| event.clone())
            .collect()
    }

    fn clear(&self) {
        self.sent.lock().clear();
    }
}

fn setup() -> (Arc<MemoryDatabase>, Arc<RecordingBroadcast>, Collab) {
    let database = Arc::new(MemoryDatabase::new());
    let broadcast = Arc::new(RecordingBroadcast::default());
    let collab = Collab::new(database.clone(), broadcast.clone());

    (database, broadcast, collab)
}

async fn role_of(database: &MemoryDatabase, connection_id: &str) -> Role {
    database
        .participant_by_connection(connection_id)
        .await
        .unwrap()
        .role
}

async fn host_count(database: &MemoryDatabase, room_id: &str) -> usize {
    database
        .participants_in_room(room_id)
        .await
        .unwrap()
        .iter()
        .filter(|p| p.role.is_host())
        .count()
}

#[tokio::test]
async fn first_joiner_becomes_host_later_joiners_do_not() {
    let (database, broadcast, collab) = setup();

    collab.rooms.join("r1", "c1", "alice").await.unwrap();
    assert_eq!(role_of(&database, "c1").await, Role::Host);

    collab.rooms.join("r1", "c2", "bob").await.unwrap();
    assert_eq!(role_of(&database, "c2").await, Role::Participant);

    // Bob's join is announced to both members with the full mapping
    let announcement = broadcast
        .all()
        .into_iter()
        .filter(|(_, event)| matches!(event, RoomEvent::UserJoined { .. }))
        .last()
        .map(|(_, event)| event)
        .unwrap();

    match announcement {
        RoomEvent::UserJoined { participants } => {
            assert_eq!(participants.len(), 2);
            assert_eq!(participants["c1"].username, "alice");
            assert_eq!(participants["c1"].role, Role::Host);
            assert_eq!(participants["c2"].username, "bob");
            assert_eq!(participants["c2"].role, Role::Participant);
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn joining_connection_receives_sync_state() {
    let (_, broadcast, collab) = setup();

    collab.rooms.join("r1", "c1", "alice").await.unwrap();

    let events = broadcast.for_connection("c1");
    assert!(events.contains(&RoomEvent::SyncState {
        video_id: DEFAULT_VIDEO_ID.to_string(),
        current_time: 0.,
        play_state: PlayState::Paused,
    }));
}

#[tokio::test]
async fn late_joiner_sync_state_reflects_current_playback() {
    let (_, broadcast, collab) = setup();

    collab.rooms.join("r1", "c1", "alice").await.unwrap();
    collab.rooms.change_video("r1", "c1", "abc123").await.unwrap();
    collab.rooms.seek("r1", "c1", 120.5).await.unwrap();
    collab.rooms.play("r1", "c1").await.unwrap();

    collab.rooms.join("r1", "c2", "bob").await.unwrap();

    let events = broadcast.for_connection("c2");
    assert!(events.contains(&RoomEvent::SyncState {
        video_id: "abc123".to_string(),
        current_time: 120.5,
        play_state: PlayState::Playing,
    }));
}

#[tokio::test]
async fn join_with_missing_fields_is_a_silent_noop() {
    let (database, broadcast, collab) = setup();

    collab.rooms.join("", "c1", "alice").await.unwrap();
    collab.rooms.join("r1", "c1", "").await.unwrap();

    assert!(database.room_by_id("r1").await.is_err());
    assert!(broadcast.all().is_empty());
}

#[tokio::test]
async fn host_disconnect_promotes_the_next_participant() {
    let (database, broadcast, collab) = setup();

    collab.rooms.join("r1", "c1", "alice").await.unwrap();
    collab.rooms.join("r1", "c2", "bob").await.unwrap();
    broadcast.clear();

    collab.rooms.leave("c1").await.unwrap();

    assert_eq!(role_of(&database, "c2").await, Role::Host);
    assert_eq!(host_count(&database, "r1").await, 1);

    // The departure broadcast carries the post-failover mapping
    let events = broadcast.for_connection("c2");
    match &events[..] {
        [RoomEvent::UserLeft { participants }] => {
            assert_eq!(participants.len(), 1);
            assert_eq!(participants["c2"].role, Role::Host);
            assert_eq!(participants["c2"].username, "bob");
        }
        other => panic!("unexpected events: {other:?}"),
    }
}

#[tokio::test]
async fn failover_prefers_join_order() {
    let (database, _, collab) = setup();

    collab.rooms.join("r1", "c1", "alice").await.unwrap();
    collab.rooms.join("r1", "c2", "bob").await.unwrap();
    collab.rooms.join("r1", "c3", "carol").await.unwrap();

    collab.rooms.leave("c1").await.unwrap();

    assert_eq!(role_of(&database, "c2").await, Role::Host);
    assert_eq!(role_of(&database, "c3").await, Role::Participant);
}

#[tokio::test]
async fn non_host_disconnect_does_not_touch_roles() {
    let (database, _, collab) = setup();

    collab.rooms.join("r1", "c1", "alice").await.unwrap();
    collab.rooms.join("r1", "c2", "bob").await.unwrap();
    collab.rooms.join("r1", "c3", "carol").await.unwrap();

    collab.rooms.leave("c2").await.unwrap();

    assert_eq!(role_of(&database, "c1").await, Role::Host);
    assert_eq!(role_of(&database, "c3").await, Role::Participant);
}

#[tokio::test]
async fn last_disconnect_destroys_the_room() {
    let (database, _, collab) = setup();

    collab.rooms.join("r1", "c1", "alice").await.unwrap();
    collab.rooms.leave("c1").await.unwrap();

    assert!(database.room_by_id("r1").await.is_err());

    // Rejoining the same id is a brand-new room; the first joiner hosts
    collab.rooms.join("r1", "c2", "bob").await.unwrap();
    assert_eq!(role_of(&database, "c2").await, Role::Host);
}

#[tokio::test]
async fn leave_of_a_connection_that_never_joined_is_a_noop() {
    let (_, broadcast, collab) = setup();

    collab.rooms.leave("ghost").await.unwrap();
    assert!(broadcast.all().is_empty());
}

#[tokio::test]
async fn change_video_rewinds_and_pauses() {
    let (database, _, collab) = setup();

    collab.rooms.join("r1", "c1", "alice").await.unwrap();
    collab.rooms.seek("r1", "c1", 300.).await.unwrap();
    collab.rooms.play("r1", "c1").await.unwrap();

    collab.rooms.change_video("r1", "c1", "xyz").await.unwrap();

    let room = database.room_by_id("r1").await.unwrap();
    assert_eq!(room.video_id, "xyz");
    assert_eq!(room.position_seconds, 0.);
    assert!(!room.is_playing);
}

#[tokio::test]
async fn seek_accepts_out_of_range_values_verbatim() {
    let (database, _, collab) = setup();

    collab.rooms.join("r1", "c1", "alice").await.unwrap();
    collab.rooms.seek("r1", "c1", -15.).await.unwrap();

    let room = database.room_by_id("r1").await.unwrap();
    assert_eq!(room.position_seconds, -15.);
}

#[tokio::test]
async fn unprivileged_playback_attempts_never_mutate_state() {
    let (database, broadcast, collab) = setup();

    collab.rooms.join("r1", "c1", "alice").await.unwrap();
    collab.rooms.join("r1", "c2", "bob").await.unwrap();
    broadcast.clear();

    assert!(collab.rooms.play("r1", "c2").await.is_err());
    assert!(collab.rooms.seek("r1", "c2", 50.).await.is_err());
    assert!(collab.rooms.change_video("r1", "c2", "zzz").await.is_err());

    let room = database.room_by_id("r1").await.unwrap();
    assert_eq!(room.video_id, DEFAULT_VIDEO_ID);
    assert_eq!(room.position_seconds, 0.);
    assert!(!room.is_playing);
    assert!(broadcast.all().is_empty());
}

#[tokio::test]
async fn moderators_control_playback_but_not_membership() {
    let (database, _, collab) = setup();

    collab.rooms.join("r1", "c1", "alice").await.unwrap();
    collab.rooms.join("r1", "c2", "bob").await.unwrap();
    collab.rooms.join("r1", "c3", "carol").await.unwrap();
    collab
        .rooms
        .assign_role("r1", "c1", "c2", Role::Moderator)
        .await
        .unwrap();

    collab.rooms.play("r1", "c2").await.unwrap();
    assert!(database.room_by_id("r1").await.unwrap().is_playing);

    // Moderators cannot promote or remove
    assert!(collab
        .rooms
        .assign_role("r1", "c2", "c3", Role::Moderator)
        .await
        .is_err());
    assert!(collab.rooms.remove_participant("r1", "c2", "c3").await.is_err());
    assert_eq!(role_of(&database, "c3").await, Role::Participant);
}

#[tokio::test]
async fn playback_control_does_not_leak_across_rooms() {
    let (database, _, collab) = setup();

    collab.rooms.join("r1", "c1", "alice").await.unwrap();
    collab.rooms.join("r2", "c2", "bob").await.unwrap();

    // Alice hosts r1, not r2
    assert!(collab.rooms.play("r2", "c1").await.is_err());
    assert!(!database.room_by_id("r2").await.unwrap().is_playing);
}

#[tokio::test]
async fn assign_role_from_non_host_changes_nothing() {
    let (database, broadcast, collab) = setup();

    collab.rooms.join("r1", "c1", "alice").await.unwrap();
    collab.rooms.join("r1", "c2", "bob").await.unwrap();
    collab.rooms.join("r1", "c3", "carol").await.unwrap();
    broadcast.clear();

    assert!(collab
        .rooms
        .assign_role("r1", "c3", "c2", Role::Moderator)
        .await
        .is_err());

    assert_eq!(role_of(&database, "c2").await, Role::Participant);
    assert!(broadcast.all().is_empty());
}

#[tokio::test]
async fn assigning_host_transfers_hostship() {
    let (database, _, collab) = setup();

    collab.rooms.join("r1", "c1", "alice").await.unwrap();
    collab.rooms.join("r1", "c2", "bob").await.unwrap();

    collab
        .rooms
        .assign_role("r1", "c1", "c2", Role::Host)
        .await
        .unwrap();

    assert_eq!(role_of(&database, "c2").await, Role::Host);
    assert_eq!(role_of(&database, "c1").await, Role::Participant);
    assert_eq!(host_count(&database, "r1").await, 1);
}

#[tokio::test]
async fn removal_notifies_the_target_before_the_room() {
    let (database, broadcast, collab) = setup();

    collab.rooms.join("r1", "c1", "alice").await.unwrap();
    collab.rooms.join("r1", "c2", "bob").await.unwrap();
    broadcast.clear();

    collab.rooms.remove_participant("r1", "c1", "c2").await.unwrap();

    assert!(database.participant_by_connection("c2").await.is_err());

    let sent = broadcast.all();
    assert_eq!(sent[0], ("c2".to_string(), RoomEvent::Removed));
    match &sent[1] {
        (recipient, RoomEvent::UserLeft { participants }) => {
            assert_eq!(recipient, "c1");
            assert_eq!(participants.len(), 1);
            assert!(participants.contains_key("c1"));
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[tokio::test]
async fn remove_from_non_host_changes_nothing() {
    let (database, _, collab) = setup();

    collab.rooms.join("r1", "c1", "alice").await.unwrap();
    collab.rooms.join("r1", "c2", "bob").await.unwrap();

    assert!(collab.rooms.remove_participant("r1", "c2", "c1").await.is_err());
    assert!(database.participant_by_connection("c1").await.is_ok());
}

#[tokio::test]
async fn playback_broadcasts_reach_every_member() {
    let (_, broadcast, collab) = setup();

    collab.rooms.join("r1", "c1", "alice").await.unwrap();
    collab.rooms.join("r1", "c2", "bob").await.unwrap();
    broadcast.clear();

    collab.rooms.seek("r1", "c1", 33.).await.unwrap();

    assert!(broadcast
        .for_connection("c1")
        .contains(&RoomEvent::Seek { time: 33. }));
    assert!(broadcast
        .for_connection("c2")
        .contains(&RoomEvent::Seek { time: 33. }));
}

#[tokio::test]
async fn concurrent_first_joins_produce_a_single_host() {
    let database = Arc::new(MemoryDatabase::new());
    let broadcast = Arc::new(RecordingBroadcast::default());
    let collab = Arc::new(Collab::new(
        database.clone() as Arc<dyn Database>,
        broadcast.clone(),
    ));

    let mut handles = Vec::new();
    for i in 0..8 {
        let collab = collab.clone();
        handles.push(tokio::spawn(async move {
            collab
                .rooms
                .join("fresh", &format!("c{i}"), &format!("user{i}"))
                .await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(host_count(&database, "fresh").await, 1);
    assert_eq!(database.participants_in_room("fresh").await.unwrap().len(), 8);
}
