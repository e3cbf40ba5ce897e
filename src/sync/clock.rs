// ABOUTME: Clock offset estimation from round-trip probes
// ABOUTME: Median-filtered offset with an adaptive RTT ceiling and probe bookkeeping

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

/// Number of samples retained; oldest is evicted first.
const SAMPLE_CAPACITY: usize = 8;

/// Round trips above this are unreliable regardless of network conditions.
const HARD_RTT_CEILING_MS: f64 = 100.0;

/// Below-ceiling samples required before an over-ceiling sample may be
/// rejected outright. With fewer, the sample is kept so the estimate is
/// never starved on a bad link.
const MIN_VALID_BEFORE_REJECT: usize = 3;

/// Floor for the adaptive filter ceiling, in milliseconds.
const ADAPTIVE_CEILING_FLOOR_MS: f64 = 20.0;

/// The adaptive filter ceiling is this multiple of the best buffered RTT.
const ADAPTIVE_CEILING_FACTOR: f64 = 2.0;

/// Probes unanswered for longer than this mark the estimate stale.
const STALE_AFTER_MS: f64 = 15_000.0;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn unix_time_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

/// One completed probe/response round trip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockSample {
    /// Local time the probe was sent, in Unix milliseconds.
    pub sent_at_ms: f64,
    /// Reference time reported by the relay, in milliseconds.
    pub reference_time_ms: f64,
    /// Full round-trip duration, in milliseconds.
    pub round_trip_ms: f64,
}

impl ClockSample {
    /// Offset implied by this sample: reference time minus the local time at
    /// the round-trip midpoint.
    pub fn offset_ms(&self) -> f64 {
        self.reference_time_ms - (self.sent_at_ms + self.round_trip_ms / 2.0)
    }
}

/// Clock synchronization quality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncQuality {
    /// Good synchronization (RTT < 50ms)
    Good,
    /// Degraded synchronization (RTT 50-100ms)
    Degraded,
    /// Lost synchronization (RTT > 100ms or no sync)
    Lost,
}

/// Estimated offset between the local clock and the relay's reference clock.
///
/// Samples live in a bounded FIFO buffer. The offset is recomputed from the
/// buffer on every read: the median of the round-trip-filtered samples'
/// offsets with at least three of them, the mean with fewer, and `0.0`
/// before any probe has succeeded. A failed probe never disturbs the
/// previous estimate.
#[derive(Debug)]
pub struct ClockOffsetEstimator {
    samples: VecDeque<ClockSample>,
    capacity: usize,
    /// Local send time of the outstanding probe, if any.
    pending_sent_at_ms: Option<f64>,
    abandoned_probes: u32,
    last_success_ms: Option<f64>,
}

impl ClockOffsetEstimator {
    /// Create an estimator with the default sample capacity.
    pub fn new() -> Self {
        Self::with_capacity(SAMPLE_CAPACITY)
    }

    /// Create an estimator retaining at most `capacity` samples.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            pending_sent_at_ms: None,
            abandoned_probes: 0,
            last_success_ms: None,
        }
    }

    /// Note that a probe was sent at `now_local_ms`.
    ///
    /// An earlier probe still outstanding is abandoned; its response, should
    /// it ever arrive, will be matched against the new probe's send time and
    /// produce an inflated round trip that the ceiling filter absorbs.
    pub fn mark_probe_sent(&mut self, now_local_ms: f64) {
        if self.pending_sent_at_ms.is_some() {
            self.abandoned_probes += 1;
            log::debug!(
                "clock probe unanswered, superseding (total abandoned: {})",
                self.abandoned_probes
            );
        }
        self.pending_sent_at_ms = Some(now_local_ms);
    }

    /// Complete the outstanding probe with the relay's reported time.
    ///
    /// Returns the recorded sample, or `None` when no probe was outstanding
    /// (a stray response is ignored).
    pub fn complete_probe(&mut self, reference_time_ms: f64, now_local_ms: f64) -> Option<ClockSample> {
        let sent_at_ms = match self.pending_sent_at_ms.take() {
            Some(t) => t,
            None => {
                log::debug!("ignoring probe response with no probe outstanding");
                return None;
            }
        };
        let sample = ClockSample {
            sent_at_ms,
            reference_time_ms,
            round_trip_ms: now_local_ms - sent_at_ms,
        };
        self.record(sample);
        self.last_success_ms = Some(now_local_ms);
        Some(sample)
    }

    /// Abandon the outstanding probe after a transport failure.
    ///
    /// The previous offset estimate is retained untouched.
    pub fn abandon_probe(&mut self) {
        if self.pending_sent_at_ms.take().is_some() {
            self.abandoned_probes += 1;
            log::debug!(
                "clock probe failed (total abandoned: {})",
                self.abandoned_probes
            );
        }
    }

    /// Record a completed sample directly.
    pub fn record(&mut self, sample: ClockSample) {
        if !sample.round_trip_ms.is_finite()
            || !sample.reference_time_ms.is_finite()
            || !sample.sent_at_ms.is_finite()
            || sample.round_trip_ms < 0.0
        {
            log::warn!("discarding malformed clock sample: {:?}", sample);
            return;
        }
        // High-RTT samples are only rejected once the buffer holds enough
        // reliable ones; a congested link must still converge eventually.
        if sample.round_trip_ms > HARD_RTT_CEILING_MS
            && self.below_hard_ceiling() >= MIN_VALID_BEFORE_REJECT
        {
            log::debug!(
                "discarding clock sample with high round trip ({:.1} ms)",
                sample.round_trip_ms
            );
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Current offset estimate in milliseconds (reference minus local).
    pub fn offset_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let best_rtt = self
            .samples
            .iter()
            .map(|s| s.round_trip_ms)
            .fold(f64::INFINITY, f64::min);
        let ceiling = (best_rtt * ADAPTIVE_CEILING_FACTOR).max(ADAPTIVE_CEILING_FLOOR_MS);
        let mut offsets: Vec<f64> = self
            .samples
            .iter()
            .filter(|s| s.round_trip_ms <= ceiling)
            .map(ClockSample::offset_ms)
            .collect();
        // The best sample always passes its own ceiling, so offsets is
        // non-empty here.
        if offsets.len() >= 3 {
            median(&mut offsets)
        } else {
            offsets.iter().sum::<f64>() / offsets.len() as f64
        }
    }

    /// Translate a local timestamp into reference time.
    pub fn to_reference_ms(&self, local_ms: f64) -> f64 {
        local_ms + self.offset_ms()
    }

    /// Current reference time, from the local wall clock plus the offset.
    pub fn reference_now_ms(&self) -> f64 {
        self.to_reference_ms(unix_time_ms())
    }

    /// Number of buffered samples.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Probes sent but never answered.
    pub fn abandoned_probes(&self) -> u32 {
        self.abandoned_probes
    }

    /// Get sync quality based on the most recent round trip
    pub fn quality(&self) -> SyncQuality {
        match self.samples.back().map(|s| s.round_trip_ms) {
            Some(rtt) if rtt < 50.0 => SyncQuality::Good,
            Some(rtt) if rtt < 100.0 => SyncQuality::Degraded,
            _ => SyncQuality::Lost,
        }
    }

    /// Whether no probe has succeeded within the staleness window.
    pub fn is_stale(&self, now_local_ms: f64) -> bool {
        match self.last_success_ms {
            Some(last) => now_local_ms - last > STALE_AFTER_MS,
            None => true,
        }
    }

    fn below_hard_ceiling(&self) -> usize {
        self.samples
            .iter()
            .filter(|s| s.round_trip_ms <= HARD_RTT_CEILING_MS)
            .count()
    }
}

impl Default for ClockOffsetEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Median of `values`; the mean of the two middle values for even counts.
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}
