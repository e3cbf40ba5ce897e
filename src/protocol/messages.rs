// ABOUTME: Wire message definitions for the room relay channel
// ABOUTME: JSON envelopes tagged as {"type": ..., "payload": ...}

use serde::{Deserialize, Serialize};

use crate::playback::types::PlaybackSnapshot;

/// All messages exchanged over the relay channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Message {
    /// Ask the relay to create a room (sender becomes host).
    CreateRoom(CreateRoom),
    /// Ask the relay to join an existing room.
    JoinRoom(JoinRoom),
    /// Re-join a room after a transport reconnect.
    RejoinRoom(RejoinRoom),
    /// Leave the current room.
    LeaveRoom(LeaveRoom),
    /// Relay response: the room was created and the sender is its host.
    RoomCreated(RoomAssignment),
    /// Relay response: joined, with the room's current playback state.
    RoomJoined(RoomJoined),
    /// Relay response: the join was refused.
    JoinError(JoinError),
    /// The room's media changed; playback restarts from the given state.
    MediaChanged(MediaChanged),
    /// Periodic authoritative playback snapshot from the host.
    SyncPlayback(SyncPlayback),
    /// Explicit seek notification from the host.
    SyncSeek(SyncSeek),
    /// Follower request for an immediate snapshot.
    RequestSync(RequestSync),
    /// Clock probe request.
    PingSync(PingSync),
    /// Clock probe response carrying the relay's reference time.
    PongSync(PongSync),
    /// Host migration notice from the relay.
    NewHost(NewHost),
    /// Room roster size change.
    ClientsUpdated(ClientsUpdated),
}

/// Payload of [`Message::CreateRoom`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateRoom {
    /// Optional room password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Payload of [`Message::JoinRoom`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JoinRoom {
    /// Identifier of the room to join.
    pub room_id: String,
    /// Password, when the room has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Payload of [`Message::RejoinRoom`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RejoinRoom {
    /// Identifier of the room to re-enter.
    pub room_id: String,
}

/// Payload of [`Message::LeaveRoom`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaveRoom {
    /// Identifier of the room being left.
    pub room_id: String,
}

/// Payload of [`Message::RoomCreated`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomAssignment {
    /// Identifier of the new room.
    pub room_id: String,
    /// Whether the recipient is the room's host.
    pub is_host: bool,
}

/// Payload of [`Message::RoomJoined`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomJoined {
    /// Identifier of the joined room.
    pub room_id: String,
    /// Whether the recipient is the room's host.
    pub is_host: bool,
    /// Media currently loaded in the room, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    /// Playback position at join time, in seconds.
    #[serde(default)]
    pub position: f64,
    /// Whether the room's timeline is advancing.
    #[serde(default)]
    pub is_playing: bool,
    /// Reference time the state was captured, when the relay knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

/// Payload of [`Message::JoinError`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JoinError {
    /// Human-readable refusal reason.
    pub message: String,
}

/// Payload of [`Message::MediaChanged`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaChanged {
    /// Identifier of the newly loaded media.
    pub media: String,
    /// Position playback restarts from, in seconds.
    #[serde(default)]
    pub position: f64,
    /// Whether playback starts running immediately.
    #[serde(default)]
    pub is_playing: bool,
}

/// Payload of [`Message::SyncPlayback`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncPlayback {
    /// Room the snapshot belongs to (host → relay direction only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    /// Host playback position in seconds.
    pub position: f64,
    /// Whether the host timeline is advancing.
    pub is_playing: bool,
    /// Reference time the snapshot was produced, in milliseconds.
    pub timestamp: f64,
    /// Media duration in seconds, when the host knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl SyncPlayback {
    /// View this wire payload as a core snapshot value.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            position: self.position,
            is_playing: self.is_playing,
            reference_timestamp_ms: self.timestamp,
            duration: self.duration,
        }
    }
}

/// Payload of [`Message::SyncSeek`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncSeek {
    /// Room the seek belongs to (host → relay direction only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    /// Position the host seeked to, in seconds.
    pub position: f64,
    /// Reference time of the seek, in milliseconds.
    pub timestamp: f64,
}

/// Payload of [`Message::RequestSync`]. Empty; the relay knows the room.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RequestSync {}

/// Payload of [`Message::PingSync`]. Empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PingSync {}

/// Payload of [`Message::PongSync`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PongSync {
    /// The relay's reference time, in milliseconds.
    pub server_time: f64,
}

/// Payload of [`Message::NewHost`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewHost {
    /// Whether the recipient is now the host.
    pub is_host: bool,
}

/// Payload of [`Message::ClientsUpdated`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientsUpdated {
    /// Number of clients currently in the room.
    pub clients: u32,
}
