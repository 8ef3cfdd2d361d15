// Audio clock - Sample counter advanced by the output callback
//
// The clock only moves when the output produces frames, so a target time
// expressed in clock seconds maps to an exact sample index.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Shared audio clock for sample-accurate click scheduling
#[derive(Clone, Debug)]
pub struct AudioTiming {
    /// Current sample position (incremented by audio callback)
    sample_position: Arc<AtomicU64>,
    sample_rate: u32,
}

impl AudioTiming {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_position: Arc::new(AtomicU64::new(0)),
            sample_rate: sample_rate.max(1),
        }
    }

    /// Get current sample position (called from the scheduler thread)
    pub fn current_sample(&self) -> u64 {
        self.sample_position.load(Ordering::Acquire)
    }

    /// Advance sample position (called from audio callback)
    pub fn advance(&self, frames: usize) {
        self.sample_position
            .fetch_add(frames as u64, Ordering::AcqRel);
    }

    /// Current clock reading in seconds
    pub fn now(&self) -> f64 {
        self.samples_to_seconds(self.current_sample())
    }

    /// Absolute sample index of an absolute clock time, rounded to the nearest frame
    pub fn seconds_to_samples(&self, seconds: f64) -> u64 {
        if seconds <= 0.0 {
            return 0;
        }
        (seconds * self.sample_rate as f64).round() as u64
    }

    pub fn samples_to_seconds(&self, samples: u64) -> f64 {
        samples as f64 / self.sample_rate as f64
    }

    /// Wall-clock delay until `target` is reached, floored at zero
    ///
    /// Used to time beat notifications so they fire when the click sounds
    /// rather than when it was scheduled.
    pub fn delay_until(&self, target: f64) -> Duration {
        let delta = target - self.now();
        if delta.is_finite() && delta > 0.0 {
            Duration::from_secs_f64(delta)
        } else {
            Duration::ZERO
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
