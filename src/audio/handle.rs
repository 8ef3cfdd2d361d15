// Audio handle - What the scheduler thread holds of the output
//
// The cpal stream itself is not Send on every platform, so the scheduler
// never touches it: it gets the shared clock and the producer end of the
// command ring buffer instead.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use ringbuf::traits::{Observer, Producer};

use super::timing::AudioTiming;
use super::{AudioError, AudioResult};
use crate::messaging::{Command, CommandProducer, ScheduledClick};
use crate::synth::ClickVoice;

#[derive(Clone)]
pub struct AudioHandle {
    timing: AudioTiming,
    commands: Arc<Mutex<CommandProducer>>,
}

impl AudioHandle {
    pub fn new(timing: AudioTiming, commands: CommandProducer) -> Self {
        Self {
            timing,
            commands: Arc::new(Mutex::new(commands)),
        }
    }

    pub fn timing(&self) -> &AudioTiming {
        &self.timing
    }

    /// Current output clock (seconds)
    pub fn now(&self) -> f64 {
        self.timing.now()
    }

    pub fn sample_rate(&self) -> u32 {
        self.timing.sample_rate()
    }

    /// Submit a click to start exactly at `time` (absolute clock seconds)
    pub fn schedule(&self, time: f64, beat: u64, voice: ClickVoice) -> AudioResult<()> {
        let click = ScheduledClick {
            start_sample: self.timing.seconds_to_samples(time),
            beat,
            voice,
        };
        self.push(Command::Schedule(click))
    }

    /// Drop every click that has been submitted but has not started yet
    pub fn cancel_pending(&self) -> AudioResult<()> {
        self.push(Command::CancelPending)
    }

    /// Commands waiting for the audio callback
    pub fn queued(&self) -> usize {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .occupied_len()
    }

    fn push(&self, command: Command) -> AudioResult<()> {
        let mut producer = self.commands.lock().unwrap_or_else(PoisonError::into_inner);
        producer.try_push(command).map_err(|_| AudioError::QueueFull)
    }
}

impl fmt::Debug for AudioHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioHandle")
            .field("timing", &self.timing)
            .field("queued", &self.queued())
            .finish()
    }
}
