// ABOUTME: Pure projection of a host snapshot to a target position "now"
// ABOUTME: Clamps into [0, duration - END_GUARD_SECS] when duration is known

use crate::playback::types::PlaybackSnapshot;

/// Guard kept between a projected target and end-of-media, in seconds.
pub const END_GUARD_SECS: f64 = 0.1;

/// How a projected target was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// The snapshot was paused; its position is the target as-is.
    Exact,
    /// The target extrapolates a playing snapshot forward in time.
    Projected,
}

/// Where playback should be right now, derived from a snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedTarget {
    /// Target playback position in seconds.
    pub position: f64,
    /// How the target was obtained.
    pub confidence: Confidence,
}

/// Project `snapshot` to the position it implies at `now_ref_ms`.
///
/// A paused snapshot's position is returned unchanged. A playing snapshot is
/// advanced by the reference time elapsed since it was produced; a snapshot
/// stamped in the future contributes no elapsed time. The result is clamped
/// to `[0, duration - END_GUARD_SECS]` when a duration is known (the hint
/// argument wins over the snapshot's own), and to `[0, ∞)` otherwise.
///
/// Deterministic given its inputs; no clock access, no side effects.
pub fn project(
    snapshot: &PlaybackSnapshot,
    now_ref_ms: f64,
    duration_hint: Option<f64>,
) -> ProjectedTarget {
    let (raw, confidence) = if snapshot.is_playing {
        let elapsed_secs = ((now_ref_ms - snapshot.reference_timestamp_ms) / 1000.0).max(0.0);
        (snapshot.position + elapsed_secs, Confidence::Projected)
    } else {
        (snapshot.position, Confidence::Exact)
    };

    let mut position = raw.max(0.0);
    if let Some(duration) = duration_hint.or(snapshot.duration) {
        position = position.min((duration - END_GUARD_SECS).max(0.0));
    }

    ProjectedTarget {
        position,
        confidence,
    }
}
