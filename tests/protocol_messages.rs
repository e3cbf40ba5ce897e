use listenalong::protocol::messages::{
    ClientsUpdated, CreateRoom, JoinRoom, Message, NewHost, PingSync, PongSync, RequestSync,
    SyncPlayback, SyncSeek,
};

// =============================================================================
// Sync Message Tests
// =============================================================================

#[test]
fn test_sync_playback_serialization() {
    let message = Message::SyncPlayback(SyncPlayback {
        room_id: Some("a1b2c3d4".to_string()),
        position: 42.5,
        is_playing: true,
        timestamp: 1_700_000_000_000.0,
        duration: Some(180.0),
    });

    let json = serde_json::to_string(&message).unwrap();

    assert!(json.contains("\"type\":\"sync_playback\""));
    assert!(json.contains("\"room_id\":\"a1b2c3d4\""));
    assert!(json.contains("\"position\":42.5"));
    assert!(json.contains("\"is_playing\":true"));
    assert!(json.contains("\"duration\":180.0"));
}

#[test]
fn test_sync_playback_deserialization_without_optionals() {
    let json = r#"{
        "type": "sync_playback",
        "payload": {
            "position": 10.25,
            "is_playing": false,
            "timestamp": 1700000000000.0
        }
    }"#;

    let message: Message = serde_json::from_str(json).unwrap();

    match message {
        Message::SyncPlayback(sync) => {
            assert_eq!(sync.position, 10.25);
            assert!(!sync.is_playing);
            assert_eq!(sync.room_id, None);
            assert_eq!(sync.duration, None);
        }
        _ => panic!("Expected SyncPlayback"),
    }
}

#[test]
fn test_sync_playback_snapshot_conversion() {
    let sync = SyncPlayback {
        room_id: None,
        position: 12.0,
        is_playing: true,
        timestamp: 5_000.0,
        duration: Some(90.0),
    };

    let snapshot = sync.snapshot();
    assert_eq!(snapshot.position, 12.0);
    assert!(snapshot.is_playing);
    assert_eq!(snapshot.reference_timestamp_ms, 5_000.0);
    assert_eq!(snapshot.duration, Some(90.0));
}

#[test]
fn test_sync_seek_round_trip() {
    let message = Message::SyncSeek(SyncSeek {
        room_id: None,
        position: 95.0,
        timestamp: 1_700_000_000_500.0,
    });

    let json = serde_json::to_string(&message).unwrap();
    assert!(json.contains("\"type\":\"sync_seek\""));
    // room_id is omitted entirely when absent
    assert!(!json.contains("room_id"));

    let parsed: Message = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, message);
}

#[test]
fn test_request_sync_has_empty_payload() {
    let json = serde_json::to_string(&Message::RequestSync(RequestSync {})).unwrap();
    assert_eq!(json, r#"{"type":"request_sync","payload":{}}"#);

    let parsed: Message = serde_json::from_str(r#"{"type":"request_sync","payload":{}}"#).unwrap();
    assert!(matches!(parsed, Message::RequestSync(_)));
}

// =============================================================================
// Clock Probe Tests
// =============================================================================

#[test]
fn test_ping_sync_serialization() {
    let json = serde_json::to_string(&Message::PingSync(PingSync {})).unwrap();
    assert_eq!(json, r#"{"type":"ping_sync","payload":{}}"#);
}

#[test]
fn test_pong_sync_deserialization() {
    let json = r#"{
        "type": "pong_sync",
        "payload": { "server_time": 1700000000123.5 }
    }"#;

    let message: Message = serde_json::from_str(json).unwrap();

    match message {
        Message::PongSync(pong) => assert_eq!(pong.server_time, 1_700_000_000_123.5),
        _ => panic!("Expected PongSync"),
    }
}

// =============================================================================
// Room Lifecycle Tests
// =============================================================================

#[test]
fn test_create_room_serialization() {
    let message = Message::CreateRoom(CreateRoom {
        password: Some("secret".to_string()),
    });
    let json = serde_json::to_string(&message).unwrap();

    assert!(json.contains("\"type\":\"create_room\""));
    assert!(json.contains("\"password\":\"secret\""));
}

#[test]
fn test_join_room_without_password() {
    let message = Message::JoinRoom(JoinRoom {
        room_id: "a1b2c3d4".to_string(),
        password: None,
    });
    let json = serde_json::to_string(&message).unwrap();

    assert!(json.contains("\"type\":\"join_room\""));
    assert!(!json.contains("password"));
}

#[test]
fn test_room_joined_deserialization() {
    let json = r#"{
        "type": "room_joined",
        "payload": {
            "room_id": "a1b2c3d4",
            "is_host": false,
            "media": "1700000000_track.mp3",
            "position": 33.5,
            "is_playing": true,
            "timestamp": 1700000000000.0
        }
    }"#;

    let message: Message = serde_json::from_str(json).unwrap();

    match message {
        Message::RoomJoined(joined) => {
            assert_eq!(joined.room_id, "a1b2c3d4");
            assert!(!joined.is_host);
            assert_eq!(joined.media, Some("1700000000_track.mp3".to_string()));
            assert_eq!(joined.position, 33.5);
            assert!(joined.is_playing);
        }
        _ => panic!("Expected RoomJoined"),
    }
}

#[test]
fn test_room_joined_defaults_for_empty_room() {
    let json = r#"{
        "type": "room_joined",
        "payload": { "room_id": "a1b2c3d4", "is_host": true }
    }"#;

    let message: Message = serde_json::from_str(json).unwrap();

    match message {
        Message::RoomJoined(joined) => {
            assert!(joined.is_host);
            assert_eq!(joined.media, None);
            assert_eq!(joined.position, 0.0);
            assert!(!joined.is_playing);
            assert_eq!(joined.timestamp, None);
        }
        _ => panic!("Expected RoomJoined"),
    }
}

#[test]
fn test_join_error_deserialization() {
    let json = r#"{
        "type": "join_error",
        "payload": { "message": "Incorrect password" }
    }"#;

    let message: Message = serde_json::from_str(json).unwrap();

    match message {
        Message::JoinError(refusal) => assert_eq!(refusal.message, "Incorrect password"),
        _ => panic!("Expected JoinError"),
    }
}

#[test]
fn test_new_host_deserialization() {
    let json = r#"{ "type": "new_host", "payload": { "is_host": true } }"#;

    let message: Message = serde_json::from_str(json).unwrap();
    assert_eq!(message, Message::NewHost(NewHost { is_host: true }));
}

#[test]
fn test_media_changed_deserialization() {
    let json = r#"{
        "type": "media_changed",
        "payload": { "media": "1700000001_next.mp3", "position": 0.0, "is_playing": false }
    }"#;

    let message: Message = serde_json::from_str(json).unwrap();

    match message {
        Message::MediaChanged(change) => {
            assert_eq!(change.media, "1700000001_next.mp3");
            assert_eq!(change.position, 0.0);
            assert!(!change.is_playing);
        }
        _ => panic!("Expected MediaChanged"),
    }
}

#[test]
fn test_clients_updated_deserialization() {
    let json = r#"{ "type": "clients_updated", "payload": { "clients": 4 } }"#;

    let message: Message = serde_json::from_str(json).unwrap();
    assert_eq!(
        message,
        Message::ClientsUpdated(ClientsUpdated { clients: 4 })
    );
}
