// ABOUTME: Playback-side sync core for listenalong
// ABOUTME: Pure projection/correction functions plus the session controller

/// Sync session state machine and controller
pub mod controller;
/// Drift correction policy
pub mod corrector;
/// Playback device abstraction and a simulated implementation
pub mod device;
/// Snapshot projection
pub mod projector;
/// Core playback value types
pub mod types;

pub use controller::{PlaybackSyncController, Role, SyncConfig};
pub use corrector::{CorrectionDecision, DriftCorrector};
pub use device::{PlaybackDevice, SimulatedDevice};
pub use projector::{project, Confidence, ProjectedTarget, END_GUARD_SECS};
pub use types::PlaybackSnapshot;
