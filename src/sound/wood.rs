// Woodblock - Fast downward pitch sweep plus a short band-passed noise strike

use serde::{Deserialize, Serialize};

use super::BeatSound;
use crate::synth::envelope::DecayEnvelope;
use crate::synth::filter::{FilterParams, StateVariableFilter};
use crate::synth::oscillator::{SweepOscillator, WaveformType};
use crate::synth::{ClickVoice, NoiseBurst, Partial, SynthVoice};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WoodParams {
    pub waveform: WaveformType,
    /// Base pitch of the strike on accented beats (Hz)
    pub accent_frequency: f32,
    /// Base pitch of the strike on regular beats (Hz)
    pub regular_frequency: f32,
    /// End pitch as a fraction of the base pitch
    pub sweep_ratio: f32,
    /// Duration of the pitch sweep (seconds)
    pub sweep_time: f32,
    pub tone_decay: f32,
    pub tone_gain: f32,
    pub noise_filter: FilterParams,
    pub noise_decay: f32,
    pub noise_gain: f32,
}

impl Default for WoodParams {
    fn default() -> Self {
        Self {
            waveform: WaveformType::Sine,
            accent_frequency: 1200.0,
            regular_frequency: 900.0,
            sweep_ratio: 0.45,
            sweep_time: 0.03,
            tone_decay: 0.06,
            tone_gain: 0.7,
            noise_filter: FilterParams::default(),
            noise_decay: 0.02,
            noise_gain: 0.35,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WoodBlock {
    params: WoodParams,
}

impl WoodBlock {
    pub fn new(params: WoodParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &WoodParams {
        &self.params
    }
}

impl BeatSound for WoodBlock {
    fn voice(&self, accent: bool, sample_rate: f32) -> ClickVoice {
        let p = &self.params;
        let base = if accent {
            p.accent_frequency
        } else {
            p.regular_frequency
        };

        let oscillator = SweepOscillator::new(p.waveform, base, sample_rate)
            .with_sweep(base * p.sweep_ratio, p.sweep_time);
        let tone = Partial::new(
            oscillator,
            DecayEnvelope::new(p.tone_decay, sample_rate),
            p.tone_gain,
        );

        let strike = NoiseBurst::new(
            StateVariableFilter::new(p.noise_filter, sample_rate),
            DecayEnvelope::new(p.noise_decay, sample_rate),
            p.noise_gain,
        );

        SynthVoice::new().with_partial(tone).with_noise(strike).into()
    }
}
