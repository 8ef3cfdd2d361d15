// Digital click - Single tone with a sharp exponential decay

use serde::{Deserialize, Serialize};

use super::BeatSound;
use crate::synth::envelope::DecayEnvelope;
use crate::synth::oscillator::{SweepOscillator, WaveformType};
use crate::synth::{ClickVoice, Partial, SynthVoice};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigitalParams {
    pub waveform: WaveformType,
    /// Tone frequency on accented beats (Hz)
    pub accent_frequency: f32,
    /// Tone frequency on regular beats (Hz)
    pub regular_frequency: f32,
    /// Time to fall to silence (seconds)
    pub decay: f32,
    pub accent_gain: f32,
    pub regular_gain: f32,
}

impl Default for DigitalParams {
    fn default() -> Self {
        Self {
            waveform: WaveformType::Square,
            accent_frequency: 1000.0,
            regular_frequency: 800.0,
            decay: 0.08,
            accent_gain: 0.35,
            regular_gain: 0.3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DigitalClick {
    params: DigitalParams,
}

impl DigitalClick {
    pub fn new(params: DigitalParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DigitalParams {
        &self.params
    }
}

impl BeatSound for DigitalClick {
    fn voice(&self, accent: bool, sample_rate: f32) -> ClickVoice {
        let p = &self.params;
        let (frequency, gain) = if accent {
            (p.accent_frequency, p.accent_gain)
        } else {
            (p.regular_frequency, p.regular_gain)
        };

        let tone = Partial::new(
            SweepOscillator::new(p.waveform, frequency, sample_rate),
            DecayEnvelope::new(p.decay, sample_rate),
            gain,
        );
        SynthVoice::new().with_partial(tone).into()
    }
}
