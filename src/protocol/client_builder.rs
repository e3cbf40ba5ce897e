// ABOUTME: Builder exposed for public usage of the library
// ABOUTME: Finalizes into a connected ProtocolClient with the join handshake sent

use typed_builder::TypedBuilder;

use crate::error::Error;
use crate::protocol::messages::{CreateRoom, JoinRoom, Message};
use crate::protocol::ProtocolClient;

/// Intermediate builder fields before finalization.
#[derive(TypedBuilder, Clone, Debug)]
#[builder(build_method(into = RoomClient))]
pub struct RoomClientFields {
    /// Room to join; omit to create a new room instead.
    #[builder(default = None, setter(transform = |r: String| Some(r)))]
    room_id: Option<String>,
    /// Room password, when required.
    #[builder(default = None, setter(transform = |p: String| Some(p)))]
    password: Option<String>,
}

/// Entry point for connecting to a relay and entering a room.
///
/// With a `room_id` the connection joins that room; without one it asks the
/// relay to create a fresh room with the caller as host.
#[derive(Clone, Debug)]
pub struct RoomClient {
    room_id: Option<String>,
    password: Option<String>,
}

impl From<RoomClientFields> for RoomClient {
    fn from(fields: RoomClientFields) -> Self {
        Self {
            room_id: fields.room_id,
            password: fields.password,
        }
    }
}

impl RoomClient {
    /// Create a new builder.
    pub fn builder() -> RoomClientFieldsBuilder {
        RoomClientFields::builder()
    }

    /// The room this client will join, if any.
    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    /// Whether a password will be presented.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Connect to the relay and send the join (or create) request.
    pub async fn connect(self, url: &str) -> crate::Result<ProtocolClient> {
        let client = ProtocolClient::connect(url).await?;
        let request = match self.room_id {
            Some(room_id) => Message::JoinRoom(JoinRoom {
                room_id,
                password: self.password,
            }),
            None => Message::CreateRoom(CreateRoom {
                password: self.password,
            }),
        };
        client
            .sender()
            .send(request)
            .map_err(|_| Error::Connection("connection closed during handshake".to_string()))?;
        Ok(client)
    }
}
