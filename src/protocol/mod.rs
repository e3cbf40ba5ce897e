// ABOUTME: Protocol implementation for the listenalong relay channel
// ABOUTME: Message types, serialization, and WebSocket client

/// WebSocket client implementation
pub mod client;
/// Builder for easy construction of a room client
pub mod client_builder;
/// Protocol message type definitions and serialization
pub mod messages;

pub use client::ProtocolClient;
pub use client_builder::RoomClient;
pub use messages::Message;
