// ABOUTME: Main library entry point for listenalong
// ABOUTME: Exports the playback sync core, session scheduler, and relay protocol client

//! # listenalong
//!
//! Client core for shared listening rooms: one **host** drives the playback
//! timeline, any number of **followers** track it within perceptual tolerance
//! despite drifting local clocks and variable latency to the relay.
//!
//! The crate is organized around a small set of pieces:
//!
//! - [`sync::ClockOffsetEstimator`]: offset between the local clock and the
//!   relay's reference clock, from repeated round-trip probes
//! - [`playback::projector`]: pure projection of a host snapshot to "where
//!   playback should be right now"
//! - [`playback::DriftCorrector`]: pure policy choosing between leaving
//!   playback alone, nudging the rate, or hard-seeking
//! - [`scheduler::SyncScheduler`]: cancellable timers that drive the session
//! - [`playback::PlaybackSyncController`]: the session state machine wiring
//!   everything to a [`playback::PlaybackDevice`] and the relay channel
//!
//! ## Example: joining a room as a follower
//!
//! ```no_run
//! use listenalong::playback::{PlaybackSyncController, SimulatedDevice, SyncConfig};
//! use listenalong::protocol::RoomClient;
//!
//! #[tokio::main]
//! async fn main() -> listenalong::Result<()> {
//!     let client = RoomClient::builder()
//!         .room_id("a1b2c3d4".to_string())
//!         .build()
//!         .connect("ws://localhost:10000/rooms")
//!         .await?;
//!     let (mut inbound, outbound) = client.split();
//!
//!     let mut controller = PlaybackSyncController::new(outbound, SyncConfig::default());
//!     controller.attach(Box::new(SimulatedDevice::new(None)));
//!     controller.begin_join();
//!     controller.run(&mut inbound).await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Playback projection, drift correction, device abstraction, and controller
pub mod playback;
/// Protocol message types and WebSocket relay client
pub mod protocol;
/// Cancellable session timers feeding the controller event loop
pub mod scheduler;
/// Clock offset estimation against the relay's reference clock
pub mod sync;

pub use playback::{
    CorrectionDecision, DriftCorrector, PlaybackDevice, PlaybackSnapshot,
    PlaybackSyncController, Role, SyncConfig,
};
pub use protocol::{Message, ProtocolClient, RoomClient};
pub use scheduler::SyncScheduler;
pub use sync::ClockOffsetEstimator;

/// Result type for listenalong operations
pub type Result<T> = std::result::Result<T, error::Error>;

/// Error types for listenalong
pub mod error {
    use thiserror::Error;

    /// Error types for listenalong operations
    #[derive(Error, Debug)]
    pub enum Error {
        /// WebSocket-related error
        #[error("WebSocket error: {0}")]
        WebSocket(String),

        /// Protocol violation or parsing error
        #[error("Protocol error: {0}")]
        Protocol(String),

        /// Invalid message format received
        #[error("Invalid message format")]
        InvalidMessage,

        /// Connection-related error
        #[error("Connection error: {0}")]
        Connection(String),

        /// The playback device refused an operation
        #[error("Playback error: {0}")]
        Playback(String),
    }
}
