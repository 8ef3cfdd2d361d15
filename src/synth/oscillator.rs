// Oscillators - Waveform generators with optional exponential pitch sweep

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

pub trait Oscillator {
    fn next_sample(&mut self) -> f32;
    fn set_frequency(&mut self, freq: f32);
    fn reset(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveformType {
    Sine,
    Square,
    Saw,
    Triangle,
}

impl WaveformType {
    /// Waveform value at a normalized phase in [0, 1)
    #[inline]
    pub fn value_at(self, phase: f32) -> f32 {
        match self {
            WaveformType::Sine => (phase * 2.0 * PI).sin(),
            WaveformType::Square => {
                if phase < 0.5 { 1.0 } else { -1.0 }
            }
            WaveformType::Saw => (phase * 2.0) - 1.0,
            WaveformType::Triangle => {
                if phase < 0.5 {
                    (phase * 4.0) - 1.0
                } else {
                    3.0 - (phase * 4.0)
                }
            }
        }
    }
}

/// Oscillator whose frequency glides exponentially from a start value to an
/// end value over a fixed number of samples, then holds.
///
/// With `end == start` it behaves as a plain fixed-pitch oscillator.
#[derive(Clone, Copy, Debug)]
pub struct SweepOscillator {
    waveform: WaveformType,
    phase: f32,
    frequency: f32,
    start_frequency: f32,
    sweep_multiplier: f32,
    sweep_remaining: u32,
    sample_rate: f32,
}

impl SweepOscillator {
    pub fn new(waveform: WaveformType, frequency: f32, sample_rate: f32) -> Self {
        Self {
            waveform,
            phase: 0.0,
            frequency,
            start_frequency: frequency,
            sweep_multiplier: 1.0,
            sweep_remaining: 0,
            sample_rate,
        }
    }

    /// Glide to `end_frequency` over `sweep_seconds`
    pub fn with_sweep(mut self, end_frequency: f32, sweep_seconds: f32) -> Self {
        let sweep_samples = (sweep_seconds * self.sample_rate).round().max(0.0) as u32;
        if sweep_samples == 0 || end_frequency <= 0.0 || self.start_frequency <= 0.0 {
            return self;
        }
        let ratio = end_frequency / self.start_frequency;
        self.sweep_multiplier = ratio.powf(1.0 / sweep_samples as f32);
        self.sweep_remaining = sweep_samples;
        self
    }

    pub fn start_frequency(&self) -> f32 {
        self.start_frequency
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }
}

impl Oscillator for SweepOscillator {
    fn next_sample(&mut self) -> f32 {
        let sample = self.waveform.value_at(self.phase);

        self.phase += self.frequency / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }

        if self.sweep_remaining > 0 {
            self.frequency *= self.sweep_multiplier;
            self.sweep_remaining -= 1;
        }

        sample
    }

    fn set_frequency(&mut self, freq: f32) {
        self.frequency = freq;
        self.start_frequency = freq;
        self.sweep_remaining = 0;
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}
