// ABOUTME: Core playback snapshot value shared by projection and correction
// ABOUTME: Validation guards against corrupt or far-future host reports

/// Tolerance for snapshot timestamps ahead of the local reference clock,
/// in milliseconds. Covers residual offset-estimate error.
const FUTURE_TOLERANCE_MS: f64 = 2_000.0;

/// The host's authoritative playback state at the instant it was produced.
///
/// Immutable; a newer snapshot supersedes the previous one entirely.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSnapshot {
    /// Playback position in seconds.
    pub position: f64,
    /// Whether the host timeline is advancing.
    pub is_playing: bool,
    /// Reference time the snapshot was produced, in milliseconds.
    pub reference_timestamp_ms: f64,
    /// Media duration in seconds, when the host knows it.
    pub duration: Option<f64>,
}

impl PlaybackSnapshot {
    /// Whether this snapshot is safe to act on at the given reference time.
    ///
    /// Rejects non-finite or negative positions and timestamps further than
    /// the tolerance into the future.
    pub fn is_valid(&self, now_ref_ms: f64) -> bool {
        self.position.is_finite()
            && self.position >= 0.0
            && self.reference_timestamp_ms.is_finite()
            && self.reference_timestamp_ms <= now_ref_ms + FUTURE_TOLERANCE_MS
    }
}
