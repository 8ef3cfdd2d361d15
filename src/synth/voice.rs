// Click voices - Self-contained one-shot sounds handed to the audio callback
//
// A voice owns everything it needs to play (oscillators, envelopes, noise,
// or a decoded buffer) so the mixer can start it on an exact sample and drop
// it once it has decayed. Synth voices are Copy-sized: no allocation happens
// when they are moved through the command ring buffer.

use std::sync::Arc;

use super::envelope::DecayEnvelope;
use super::filter::StateVariableFilter;
use super::noise::WhiteNoise;
use super::oscillator::{Oscillator, SweepOscillator};

/// Maximum number of tonal partials in one synth voice
pub const MAX_PARTIALS: usize = 2;

/// One enveloped oscillator
#[derive(Debug, Clone, Copy)]
pub struct Partial {
    oscillator: SweepOscillator,
    envelope: DecayEnvelope,
    gain: f32,
}

impl Partial {
    pub fn new(oscillator: SweepOscillator, envelope: DecayEnvelope, gain: f32) -> Self {
        Self {
            oscillator,
            envelope,
            gain,
        }
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        if self.envelope.is_finished() {
            return 0.0;
        }
        self.oscillator.next_sample() * self.envelope.next_value() * self.gain
    }

    pub fn is_finished(&self) -> bool {
        self.envelope.is_finished()
    }

    pub fn start_frequency(&self) -> f32 {
        self.oscillator.start_frequency()
    }

    pub fn decay_seconds(&self) -> f32 {
        self.envelope.decay_seconds()
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }
}

/// Filtered, enveloped noise transient
#[derive(Debug, Clone, Copy)]
pub struct NoiseBurst {
    noise: WhiteNoise,
    filter: StateVariableFilter,
    envelope: DecayEnvelope,
    gain: f32,
}

impl NoiseBurst {
    pub fn new(filter: StateVariableFilter, envelope: DecayEnvelope, gain: f32) -> Self {
        Self {
            noise: WhiteNoise::default(),
            filter,
            envelope,
            gain,
        }
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        if self.envelope.is_finished() {
            return 0.0;
        }
        let filtered = self.filter.process(self.noise.next_sample());
        filtered * self.envelope.next_value() * self.gain
    }

    pub fn is_finished(&self) -> bool {
        self.envelope.is_finished()
    }

    pub fn decay_seconds(&self) -> f32 {
        self.envelope.decay_seconds()
    }
}

/// Synthesized click: up to MAX_PARTIALS partials plus an optional noise burst
#[derive(Debug, Clone, Copy, Default)]
pub struct SynthVoice {
    partials: [Option<Partial>; MAX_PARTIALS],
    noise: Option<NoiseBurst>,
}

impl SynthVoice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a partial in the first free slot; extra partials are ignored
    pub fn with_partial(mut self, partial: Partial) -> Self {
        match self.partials.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => *slot = Some(partial),
            None => debug_assert!(false, "synth voice holds at most {MAX_PARTIALS} partials"),
        }
        self
    }

    pub fn with_noise(mut self, noise: NoiseBurst) -> Self {
        self.noise = Some(noise);
        self
    }

    pub fn partials(&self) -> impl Iterator<Item = &Partial> {
        self.partials.iter().flatten()
    }

    pub fn noise(&self) -> Option<&NoiseBurst> {
        self.noise.as_ref()
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let mut out = 0.0;
        for partial in self.partials.iter_mut().flatten() {
            out += partial.next_sample();
        }
        if let Some(noise) = self.noise.as_mut() {
            out += noise.next_sample();
        }
        out
    }

    pub fn is_finished(&self) -> bool {
        self.partials().all(Partial::is_finished)
            && self.noise.as_ref().is_none_or(NoiseBurst::is_finished)
    }
}

/// Playback of a decoded mono buffer at a fixed rate ratio
///
/// `step` = source rate / output rate, so a 44.1kHz sample plays at the
/// right pitch on a 48kHz stream (linear interpolation between frames).
#[derive(Debug, Clone)]
pub struct SampleVoice {
    data: Arc<[f32]>,
    position: f64,
    step: f64,
    gain: f32,
}

impl SampleVoice {
    pub fn new(data: Arc<[f32]>, source_rate: u32, output_rate: f32, gain: f32) -> Self {
        // A zero step would never reach the end of the buffer
        let step = source_rate as f64 / output_rate as f64;
        let step = if step.is_finite() && step > 0.0 { step } else { 1.0 };
        Self {
            data,
            position: 0.0,
            step,
            gain,
        }
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        if self.is_finished() {
            return 0.0;
        }

        let pos_integer = self.position as usize;
        let pos_fractional = self.position.fract() as f32;

        let sample1 = self.data.get(pos_integer).copied().unwrap_or(0.0);
        let sample2 = self.data.get(pos_integer + 1).copied().unwrap_or(0.0);

        self.position += self.step;
        (sample1 + (sample2 - sample1) * pos_fractional) * self.gain
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.data.len() as f64
    }

    pub fn step(&self) -> f64 {
        self.step
    }
}

/// A single scheduled click, ready to be mixed
#[derive(Debug, Clone)]
pub enum ClickVoice {
    Synth(SynthVoice),
    Sample(SampleVoice),
}

impl ClickVoice {
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        match self {
            ClickVoice::Synth(voice) => voice.next_sample(),
            ClickVoice::Sample(voice) => voice.next_sample(),
        }
    }

    pub fn is_finished(&self) -> bool {
        match self {
            ClickVoice::Synth(voice) => voice.is_finished(),
            ClickVoice::Sample(voice) => voice.is_finished(),
        }
    }

    /// Starting frequency of the first partial, if this is a synth voice
    pub fn fundamental_hz(&self) -> Option<f32> {
        match self {
            ClickVoice::Synth(voice) => voice.partials().next().map(Partial::start_frequency),
            ClickVoice::Sample(_) => None,
        }
    }

    pub fn as_synth(&self) -> Option<&SynthVoice> {
        match self {
            ClickVoice::Synth(voice) => Some(voice),
            ClickVoice::Sample(_) => None,
        }
    }

    pub fn is_sample(&self) -> bool {
        matches!(self, ClickVoice::Sample(_))
    }

    /// Render the whole voice into a new buffer (offline use only)
    pub fn render_to_end(mut self, max_samples: usize) -> Vec<f32> {
        let mut out = Vec::new();
        while !self.is_finished() && out.len() < max_samples {
            out.push(self.next_sample());
        }
        out
    }
}

impl From<SynthVoice> for ClickVoice {
    fn from(voice: SynthVoice) -> Self {
        ClickVoice::Synth(voice)
    }
}

impl From<SampleVoice> for ClickVoice {
    fn from(voice: SampleVoice) -> Self {
        ClickVoice::Sample(voice)
    }
}
