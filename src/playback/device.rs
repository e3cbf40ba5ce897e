// ABOUTME: Abstraction over the local playback surface
// ABOUTME: Includes a wall-clock simulated device for demos and tests

use std::time::Instant;

/// The playback surface the sync core drives.
///
/// Implementations wrap whatever actually renders media (a media element, a
/// pipeline, a decoder loop). All methods are called from the controller's
/// event loop only, so implementations need interior consistency but no
/// locking of their own.
pub trait PlaybackDevice: Send {
    /// Current playback position in seconds.
    fn position(&self) -> f64;

    /// Set the playback position in seconds.
    fn set_position(&mut self, seconds: f64);

    /// Current playback rate multiplier.
    fn rate(&self) -> f64;

    /// Set the playback rate multiplier.
    fn set_rate(&mut self, rate: f64);

    /// Start playback. May refuse (for example under an autoplay policy).
    fn play(&mut self) -> crate::Result<()>;

    /// Pause playback.
    fn pause(&mut self);

    /// Whether playback is currently paused.
    fn is_paused(&self) -> bool;

    /// Media duration in seconds, once known.
    fn duration(&self) -> Option<f64>;

    /// Whether the device can accept a position (metadata loaded).
    fn is_ready(&self) -> bool;

    /// Whether a seek issued earlier is still settling.
    fn is_seeking(&self) -> bool {
        false
    }

    /// Drain a fault raised by the device since the last call, if any.
    fn take_fault(&mut self) -> Option<String> {
        None
    }
}

/// A playback device simulated against the wall clock.
///
/// Position advances with real time scaled by the rate while playing. Used
/// by the demos and tests; also a reference for implementing the trait.
#[derive(Debug)]
pub struct SimulatedDevice {
    duration: Option<f64>,
    base_position: f64,
    rate: f64,
    playing: bool,
    anchored_at: Instant,
    ready: bool,
}

impl SimulatedDevice {
    /// Create a ready, paused device at position zero.
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            duration,
            base_position: 0.0,
            rate: 1.0,
            playing: false,
            anchored_at: Instant::now(),
            ready: true,
        }
    }

    /// Mark the device ready or not ready to accept positions.
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    fn clamp(&self, seconds: f64) -> f64 {
        let upper = self.duration.unwrap_or(f64::INFINITY);
        seconds.clamp(0.0, upper)
    }
}

impl PlaybackDevice for SimulatedDevice {
    fn position(&self) -> f64 {
        if self.playing {
            self.clamp(self.base_position + self.anchored_at.elapsed().as_secs_f64() * self.rate)
        } else {
            self.base_position
        }
    }

    fn set_position(&mut self, seconds: f64) {
        self.base_position = self.clamp(seconds);
        self.anchored_at = Instant::now();
    }

    fn rate(&self) -> f64 {
        self.rate
    }

    fn set_rate(&mut self, rate: f64) {
        // Re-anchor first so the elapsed-so-far segment keeps its old rate.
        self.base_position = self.position();
        self.anchored_at = Instant::now();
        self.rate = rate;
    }

    fn play(&mut self) -> crate::Result<()> {
        if !self.ready {
            return Err(crate::error::Error::Playback(
                "device not ready".to_string(),
            ));
        }
        if !self.playing {
            self.anchored_at = Instant::now();
            self.playing = true;
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.base_position = self.position();
        self.playing = false;
    }

    fn is_paused(&self) -> bool {
        !self.playing
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}
