// Command types - Scheduler → audio callback

use crate::synth::ClickVoice;

/// A click to be started on an exact output sample
#[derive(Debug, Clone)]
pub struct ScheduledClick {
    /// Absolute sample index (on the output clock) at which the click starts
    pub start_sample: u64,
    pub beat: u64,
    pub voice: ClickVoice,
}

#[derive(Debug, Clone)]
pub enum Command {
    Schedule(ScheduledClick),
    /// Drop every click that has not started yet
    CancelPending,
}
