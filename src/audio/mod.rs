// Module audio - Output clock, click mixer and cpal backend

pub mod device;
pub mod dsp_utils;
pub mod engine;
pub mod export;
pub mod format_conversion;
pub mod handle;
pub mod mixer;
pub mod offline;
pub mod parameters;
pub mod status;
pub mod timing;

pub use engine::AudioEngine;
pub use handle::AudioHandle;
pub use mixer::ClickMixer;
pub use offline::OfflineEngine;
pub use timing::AudioTiming;

/// Audio subsystem errors
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoDevice,

    #[error("output device '{0}' not found")]
    DeviceNotFound(String),

    #[error("cannot enumerate output devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("cannot query output configuration: {0}")]
    StreamConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("unsupported sample format {0} (supported: f32, i16, u16)")]
    UnsupportedFormat(String),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("click queue full")]
    QueueFull,

    #[error("invalid export settings: {0}")]
    InvalidExport(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AudioResult<T> = Result<T, AudioError>;

/// An output the metronome can schedule clicks on
///
/// Implemented by the cpal [`AudioEngine`] and by [`OfflineEngine`], whose
/// clock only moves when it is rendered.
pub trait AudioOutput {
    /// Clock + click submission handle, safe to move to the scheduler thread
    fn handle(&self) -> AudioHandle;

    /// Make sure the clock is running (a paused device stream is started)
    fn resume(&self) -> AudioResult<()>;
}
