// Metallic bell - Two inharmonic sine partials, longer ring on the accent

use serde::{Deserialize, Serialize};

use super::BeatSound;
use crate::synth::envelope::DecayEnvelope;
use crate::synth::oscillator::{SweepOscillator, WaveformType};
use crate::synth::{ClickVoice, Partial, SynthVoice};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetallicParams {
    pub accent_frequency: f32,
    pub regular_frequency: f32,
    /// Frequency ratio of the upper partial to the fundamental
    pub partial_ratio: f32,
    /// Upper partial level relative to the fundamental
    pub partial_level: f32,
    pub accent_decay: f32,
    pub regular_decay: f32,
    pub gain: f32,
}

impl Default for MetallicParams {
    fn default() -> Self {
        Self {
            accent_frequency: 1000.0,
            regular_frequency: 800.0,
            partial_ratio: 2.76,
            partial_level: 0.5,
            accent_decay: 0.6,
            regular_decay: 0.3,
            gain: 0.3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetallicBell {
    params: MetallicParams,
}

impl MetallicBell {
    pub fn new(params: MetallicParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &MetallicParams {
        &self.params
    }
}

impl BeatSound for MetallicBell {
    fn voice(&self, accent: bool, sample_rate: f32) -> ClickVoice {
        let p = &self.params;
        let (frequency, decay) = if accent {
            (p.accent_frequency, p.accent_decay)
        } else {
            (p.regular_frequency, p.regular_decay)
        };

        let fundamental = Partial::new(
            SweepOscillator::new(WaveformType::Sine, frequency, sample_rate),
            DecayEnvelope::new(decay, sample_rate),
            p.gain,
        );
        let overtone = Partial::new(
            SweepOscillator::new(WaveformType::Sine, frequency * p.partial_ratio, sample_rate),
            DecayEnvelope::new(decay, sample_rate),
            p.gain * p.partial_level,
        );

        SynthVoice::new()
            .with_partial(fundamental)
            .with_partial(overtone)
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_inharmonic_partials() {
        let voice = MetallicBell::default().voice(false, 48000.0);
        let partials: Vec<_> = voice.as_synth().unwrap().partials().collect();

        assert_eq!(partials.len(), 2);
        let ratio = partials[1].start_frequency() / partials[0].start_frequency();
        assert!((ratio - 2.76).abs() < 1e-4);
        // Not an integer multiple
        assert!((ratio - ratio.round()).abs() > 0.1);
    }

    #[test]
    fn test_accent_rings_longer() {
        let bell = MetallicBell::default();
        let accent = bell.voice(true, 48000.0).render_to_end(480_000);
        let regular = bell.voice(false, 48000.0).render_to_end(480_000);

        assert_eq!(accent.len(), 28800);
        assert_eq!(regular.len(), 14400);
    }
}
