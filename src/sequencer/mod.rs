// Sequencer module - Beat timeline, look-ahead scheduling and the metronome owner

pub mod metronome;
pub mod notifier;
pub mod params;
pub mod renderer;
pub mod scheduler;
pub mod timeline;

pub use metronome::{
    CustomSoundsOutcome, CustomSoundsTask, Metronome, MetronomeError, SlotOutcome, StopPolicy,
};
pub use notifier::{BeatNotifier, NotifierHandle};
pub use params::{BeatCallback, BeatParams, ParamStore};
pub use renderer::BeatRenderer;
pub use scheduler::{LookaheadScheduler, ScheduledNote, SchedulerConfig};
pub use timeline::{ACCENTS_DISABLED_THRESHOLD, AccentPattern, Tempo, TimeSignature, TimelineError};
