// Custom sounds - User-supplied decoded buffers with per-beat Digital fallback

use super::BeatSound;
use super::digital::DigitalClick;
use crate::sampler::DecodedSound;
use crate::synth::{ClickVoice, SampleVoice};

/// Plays the accent or regular buffer; a missing or unplayable buffer falls
/// back to the Digital click for that beat rather than silence.
#[derive(Debug, Clone, Default)]
pub struct CustomSample {
    accent: Option<DecodedSound>,
    regular: Option<DecodedSound>,
    gain: f32,
    fallback: DigitalClick,
}

impl CustomSample {
    pub const DEFAULT_GAIN: f32 = 1.0;

    pub fn new(fallback: DigitalClick) -> Self {
        Self {
            accent: None,
            regular: None,
            gain: Self::DEFAULT_GAIN,
            fallback,
        }
    }

    /// Replace both buffers; `None` clears a slot
    pub fn set_sounds(&mut self, accent: Option<DecodedSound>, regular: Option<DecodedSound>) {
        self.accent = accent;
        self.regular = regular;
    }

    pub fn accent(&self) -> Option<&DecodedSound> {
        self.accent.as_ref()
    }

    pub fn regular(&self) -> Option<&DecodedSound> {
        self.regular.as_ref()
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.max(0.0);
    }
}

impl BeatSound for CustomSample {
    fn voice(&self, accent: bool, sample_rate: f32) -> ClickVoice {
        let buffer = if accent {
            self.accent.as_ref()
        } else {
            self.regular.as_ref()
        };

        match buffer {
            Some(sound) if !sound.is_empty() && sound.sample_rate() > 0 => SampleVoice::new(
                sound.samples().clone(),
                sound.sample_rate(),
                sample_rate,
                self.gain,
            )
            .into(),
            _ => self.fallback.voice(accent, sample_rate),
        }
    }
}
