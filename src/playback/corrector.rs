// ABOUTME: Tiered drift correction policy (leave alone / rate nudge / hard seek)
// ABOUTME: Hysteresis via a correction cooldown; invalid inputs decide nothing

use std::time::Duration;

use crate::playback::projector::ProjectedTarget;

/// What to do about the gap between actual and target position.
///
/// Decisions are chosen per evaluation and never queued; a superseded
/// decision is simply dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CorrectionDecision {
    /// Leave playback alone.
    NoOp,
    /// Run at `rate` for `duration`, then revert to 1.0.
    SoftNudge {
        /// Temporary playback rate multiplier.
        rate: f64,
        /// How long the nudge stays active before the rate reverts.
        duration: Duration,
    },
    /// Set the playback position directly.
    HardSeek {
        /// Position to seek to, in seconds.
        position: f64,
    },
}

/// Policy that turns a position gap into a [`CorrectionDecision`].
///
/// Gap tiers, with `d` the absolute actual-vs-target gap in seconds:
/// `d <= small_threshold` is left alone; `small_threshold < d <=
/// large_threshold` nudges the rate while playing (and seeks while paused,
/// where a rate change cannot act and a seek cannot be heard); `d >
/// large_threshold` hard-seeks. Both boundaries are closed on the gentler
/// side.
#[derive(Debug, Clone, Copy)]
pub struct DriftCorrector {
    small_threshold_secs: f64,
    large_threshold_secs: f64,
    cooldown: Duration,
    min_rate_delta: f64,
    max_rate_delta: f64,
    min_nudge: Duration,
    max_nudge: Duration,
}

impl DriftCorrector {
    /// Create a corrector with default thresholds.
    pub fn new() -> Self {
        Self {
            small_threshold_secs: 0.1,
            large_threshold_secs: 1.0,
            cooldown: Duration::from_millis(200),
            min_rate_delta: 0.02,
            max_rate_delta: 0.15,
            min_nudge: Duration::from_millis(200),
            max_nudge: Duration::from_millis(1_000),
        }
    }

    /// Override the gap thresholds, in seconds.
    pub fn with_thresholds(mut self, small: f64, large: f64) -> Self {
        self.small_threshold_secs = small;
        self.large_threshold_secs = large.max(small);
        self
    }

    /// Override the correction cooldown.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// The window after a correction during which further ones are suppressed.
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Decide what to do about the gap between `actual_position` and `target`.
    ///
    /// Returns [`CorrectionDecision::NoOp`] when either position is invalid,
    /// when the device is still settling a seek, or when a correction was
    /// applied within the cooldown window of `last_correction_at_ms`; the
    /// caller re-evaluates the newest snapshot once the cooldown elapses.
    pub fn decide(
        &self,
        actual_position: f64,
        target: &ProjectedTarget,
        is_playing: bool,
        device_seeking: bool,
        last_correction_at_ms: Option<f64>,
        now_local_ms: f64,
    ) -> CorrectionDecision {
        if !actual_position.is_finite()
            || actual_position < 0.0
            || !target.position.is_finite()
            || target.position < 0.0
        {
            log::warn!(
                "refusing correction over invalid positions (actual={}, target={})",
                actual_position,
                target.position
            );
            return CorrectionDecision::NoOp;
        }

        // A position mid-seek has not settled; deciding on it would correct
        // toward a value the device is about to discard.
        if device_seeking {
            return CorrectionDecision::NoOp;
        }

        if let Some(last) = last_correction_at_ms {
            if now_local_ms - last < self.cooldown.as_secs_f64() * 1000.0 {
                return CorrectionDecision::NoOp;
            }
        }

        let gap = target.position - actual_position;
        let d = gap.abs();

        if d <= self.small_threshold_secs {
            return CorrectionDecision::NoOp;
        }

        if d > self.large_threshold_secs || !is_playing {
            return CorrectionDecision::HardSeek {
                position: target.position,
            };
        }

        let delta = (d / self.large_threshold_secs * self.max_rate_delta)
            .clamp(self.min_rate_delta, self.max_rate_delta);
        let rate = if gap > 0.0 {
            1.0 + delta
        } else {
            1.0 / (1.0 + delta)
        };
        let millis = (d * 1000.0).clamp(
            self.min_nudge.as_millis() as f64,
            self.max_nudge.as_millis() as f64,
        );
        CorrectionDecision::SoftNudge {
            rate,
            duration: Duration::from_millis(millis.round() as u64),
        }
    }
}

impl Default for DriftCorrector {
    fn default() -> Self {
        Self::new()
    }
}
