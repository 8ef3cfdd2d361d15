// Filter - State Variable Filter (Chamberlin)
//
// Digital implementation of a 2-pole State Variable Filter. Used to shape the
// noise burst of percussive clicks, so parameters are fixed for the lifetime
// of a voice and no smoothing is applied.
//
// References:
// - Hal Chamberlin's "Musical Applications of Microprocessors" (1985)
// - https://www.earlevel.com/main/2003/03/02/the-digital-state-variable-filter/
//
// Stable up to ~Fs/6 (8kHz @ 48kHz sample rate); cutoff is clamped below that.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Filter type/mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    /// Low-pass filter (12dB/octave)
    LowPass,
    /// High-pass filter (12dB/octave)
    HighPass,
    /// Band-pass filter (6dB/octave on each side)
    #[default]
    BandPass,
}

/// Filter parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    /// Cutoff (or center) frequency in Hz
    pub cutoff: f32,
    /// Resonance (Q factor: 0.5 - 20.0)
    pub resonance: f32,
    pub filter_type: FilterType,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            cutoff: 2500.0,
            resonance: 1.5,
            filter_type: FilterType::BandPass,
        }
    }
}

/// State Variable Filter (Chamberlin) implementation
#[derive(Debug, Clone, Copy)]
pub struct StateVariableFilter {
    filter_type: FilterType,

    // State variables
    low: f32,
    band: f32,

    // Coefficients
    f: f32,
    q: f32,
}

impl StateVariableFilter {
    pub fn new(params: FilterParams, sample_rate: f32) -> Self {
        let max_cutoff = sample_rate / 6.0;
        let cutoff = params.cutoff.clamp(20.0, max_cutoff);
        let resonance = params.resonance.clamp(0.5, 20.0);

        Self {
            filter_type: params.filter_type,
            low: 0.0,
            band: 0.0,
            f: 2.0 * (PI * cutoff / sample_rate).sin(),
            q: 1.0 / resonance,
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.low += self.f * self.band;
        let high = input - self.low - self.q * self.band;
        self.band += self.f * high;

        match self.filter_type {
            FilterType::LowPass => self.low,
            FilterType::HighPass => high,
            FilterType::BandPass => self.band,
        }
    }

    pub fn reset(&mut self) {
        self.low = 0.0;
        self.band = 0.0;
    }
}
