// Beatkeeper - Look-ahead metronome engine, library exports for the CLI, tests and benchmarks

pub mod audio;
pub mod config;
pub mod messaging;
pub mod sampler;
pub mod sequencer;
pub mod sound;
pub mod synth;

// Re-export commonly used types for convenience
pub use audio::{AudioEngine, AudioError, AudioHandle, AudioOutput, AudioTiming, OfflineEngine};
pub use config::{ConfigError, MetronomeConfig};
pub use sampler::{DecodeError, DecodedSound, decode_bytes, load_sound};
pub use sequencer::{
    AccentPattern, BeatParams, LookaheadScheduler, Metronome, MetronomeError, ScheduledNote,
    SchedulerConfig, StopPolicy, Tempo, TimeSignature,
};
pub use sound::{BeatSound, SoundBank, SoundProfile, SoundTuning};
pub use synth::ClickVoice;
