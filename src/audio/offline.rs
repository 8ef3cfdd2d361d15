// Offline output - Same click path as the device, clock moved by render()
//
// Used for WAV export and for deterministic tests: nothing plays in real
// time, the clock only advances by the frames the caller renders.

use std::sync::{Arc, Mutex, PoisonError};

use super::dsp_utils::master_sample;
use super::handle::AudioHandle;
use super::mixer::ClickMixer;
use super::timing::AudioTiming;
use super::{AudioOutput, AudioResult};
use crate::messaging::create_command_channel;

/// Default command queue size, same as the device engine
pub const DEFAULT_COMMAND_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct OfflineEngine {
    handle: AudioHandle,
    mixer: Arc<Mutex<ClickMixer>>,
    gain: f32,
}

impl OfflineEngine {
    pub fn new(sample_rate: u32) -> Self {
        Self::with_capacity(sample_rate, DEFAULT_COMMAND_CAPACITY)
    }

    pub fn with_capacity(sample_rate: u32, command_capacity: usize) -> Self {
        let (producer, consumer) = create_command_channel(command_capacity);
        Self {
            handle: AudioHandle::new(AudioTiming::new(sample_rate), producer),
            mixer: Arc::new(Mutex::new(ClickMixer::new(consumer))),
            gain: 1.0,
        }
    }

    /// Output gain applied before the soft clip
    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain.clamp(0.0, 1.0);
        self
    }

    pub fn timing(&self) -> &AudioTiming {
        self.handle.timing()
    }

    pub fn sample_rate(&self) -> u32 {
        self.handle.sample_rate()
    }

    /// Render `frames` mono samples and advance the clock by as much
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        self.render_into(&mut out);
        out
    }

    pub fn render_into(&self, out: &mut [f32]) {
        let mut mixer = self.mixer.lock().unwrap_or_else(PoisonError::into_inner);
        mixer.drain_commands();
        for sample in out.iter_mut() {
            *sample = master_sample(mixer.next_sample(), self.gain);
        }
        self.handle.timing().advance(out.len());
    }

    /// Render in blocks until the clock reaches `seconds`
    pub fn render_until(&self, seconds: f64, block: usize) -> Vec<f32> {
        let target = self.timing().seconds_to_samples(seconds);
        let mut out = Vec::new();
        let mut buffer = vec![0.0; block.max(1)];
        while self.timing().current_sample() < target {
            let remaining = (target - self.timing().current_sample()) as usize;
            let frames = remaining.min(buffer.len());
            self.render_into(&mut buffer[..frames]);
            out.extend_from_slice(&buffer[..frames]);
        }
        out
    }

    /// Clicks lost to mixer overflow so far
    pub fn dropped_clicks(&self) -> u64 {
        self.mixer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .dropped_clicks()
    }
}

impl AudioOutput for OfflineEngine {
    fn handle(&self) -> AudioHandle {
        self.handle.clone()
    }

    fn resume(&self) -> AudioResult<()> {
        Ok(())
    }
}
