// Click mixer - Sample-accurate click starts inside the audio callback
//
// Runs in the SACRED ZONE: no allocations after construction, no I/O, no
// blocking. Pending and active storage is preallocated; overflow drops the
// click and bumps a counter instead of growing.

use std::collections::VecDeque;

use ringbuf::traits::Consumer;

use crate::messaging::{Command, CommandConsumer, ScheduledClick};
use crate::synth::ClickVoice;

/// Clicks submitted but not yet started
pub const MAX_PENDING: usize = 64;
/// Clicks sounding at the same time
pub const MAX_ACTIVE: usize = 16;

pub struct ClickMixer {
    commands: CommandConsumer,
    /// Ordered by start sample
    pending: VecDeque<ScheduledClick>,
    active: Vec<ClickVoice>,
    position: u64,
    dropped: u64,
}

impl ClickMixer {
    pub fn new(commands: CommandConsumer) -> Self {
        Self {
            commands,
            pending: VecDeque::with_capacity(MAX_PENDING),
            active: Vec::with_capacity(MAX_ACTIVE),
            position: 0,
            dropped: 0,
        }
    }

    /// Pull every queued command from the ring buffer
    pub fn drain_commands(&mut self) {
        while let Some(command) = self.commands.try_pop() {
            self.handle_command(command);
        }
    }

    pub fn handle_command(&mut self, command: Command) {
        match command {
            Command::Schedule(click) => {
                if self.pending.len() >= MAX_PENDING {
                    self.dropped += 1;
                    return;
                }
                let index = self
                    .pending
                    .partition_point(|queued| queued.start_sample <= click.start_sample);
                self.pending.insert(index, click);
            }
            Command::CancelPending => self.pending.clear(),
        }
    }

    /// Mix one output sample and advance the mixer position
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        // Clicks whose start sample has passed start now
        while self
            .pending
            .front()
            .is_some_and(|click| click.start_sample <= self.position)
        {
            if let Some(click) = self.pending.pop_front() {
                if self.active.len() < MAX_ACTIVE {
                    self.active.push(click.voice);
                } else {
                    self.dropped += 1;
                }
            }
        }

        let mut out = 0.0;
        for voice in self.active.iter_mut() {
            out += voice.next_sample();
        }
        self.active.retain(|voice| !voice.is_finished());

        self.position += 1;
        out
    }

    /// Absolute sample index of the next sample to be mixed
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Clicks lost to a full pending or active list
    pub fn dropped_clicks(&self) -> u64 {
        self.dropped
    }
}
