// ABOUTME: Clock synchronization against the relay reference clock
// ABOUTME: Round-trip probe sampling and filtered offset estimation

/// Clock offset estimation implementation
pub mod clock;

pub use clock::{unix_time_ms, ClockOffsetEstimator, ClockSample, SyncQuality};
