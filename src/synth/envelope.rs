// Decay envelope - One-shot exponential gain ramp for percussive clicks
//
// Starts at full level and falls exponentially to SILENCE_FLOOR over the
// decay time, after which the envelope reports itself finished.

/// Level at which a decaying click is considered silent (-60 dB)
pub const SILENCE_FLOOR: f32 = 0.001;

/// Exponential decay envelope
#[derive(Debug, Clone, Copy)]
pub struct DecayEnvelope {
    value: f32,
    multiplier: f32,
    remaining: u32,
    decay_seconds: f32,
}

impl DecayEnvelope {
    /// Create an envelope decaying from 1.0 to SILENCE_FLOOR in `decay_seconds`
    pub fn new(decay_seconds: f32, sample_rate: f32) -> Self {
        let decay_seconds = decay_seconds.max(0.001);
        let decay_samples = (decay_seconds * sample_rate).round().max(1.0) as u32;

        Self {
            value: 1.0,
            multiplier: SILENCE_FLOOR.powf(1.0 / decay_samples as f32),
            remaining: decay_samples,
            decay_seconds,
        }
    }

    /// Next gain value; returns 0.0 once finished
    #[inline]
    pub fn next_value(&mut self) -> f32 {
        if self.remaining == 0 {
            return 0.0;
        }
        let current = self.value;
        self.value *= self.multiplier;
        self.remaining -= 1;
        current
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    pub fn decay_seconds(&self) -> f32 {
        self.decay_seconds
    }

    /// Number of samples left before the envelope finishes
    pub fn remaining_samples(&self) -> u32 {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_full_level() {
        let mut env = DecayEnvelope::new(0.08, 48000.0);
        assert_eq!(env.next_value(), 1.0);
    }

    #[test]
    fn test_length_matches_decay_time() {
        let mut env = DecayEnvelope::new(0.08, 48000.0);
        assert_eq!(env.remaining_samples(), 3840);

        let mut count = 0;
        while !env.is_finished() {
            env.next_value();
            count += 1;
        }
        assert_eq!(count, 3840);
        assert_eq!(env.next_value(), 0.0);
    }

    #[test]
    fn test_reaches_floor() {
        let mut env = DecayEnvelope::new(0.05, 44100.0);
        let mut last = 1.0;
        while !env.is_finished() {
            last = env.next_value();
        }
        // Last emitted value sits one step above the floor
        assert!(last < SILENCE_FLOOR * 1.01, "last value {}", last);
    }

    #[test]
    fn test_strictly_decreasing() {
        let mut env = DecayEnvelope::new(0.02, 44100.0);
        let mut previous = f32::INFINITY;
        while !env.is_finished() {
            let value = env.next_value();
            assert!(value < previous);
            previous = value;
        }
    }

    #[test]
    fn test_longer_decay_lasts_longer() {
        let short = DecayEnvelope::new(0.15, 48000.0);
        let long = DecayEnvelope::new(0.6, 48000.0);
        assert!(long.remaining_samples() > short.remaining_samples());
        assert_eq!(long.decay_seconds(), 0.6);
    }
}
