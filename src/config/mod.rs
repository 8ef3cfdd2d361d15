// Configuration - RON file with scheduler, output, default beat and sound tuning

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::audio::offline::DEFAULT_COMMAND_CAPACITY;
use crate::sequencer::metronome::StopPolicy;
use crate::sequencer::params::BeatParams;
use crate::sequencer::scheduler::SchedulerConfig;
use crate::sequencer::timeline::{AccentPattern, Tempo};
use crate::sound::{SoundProfile, SoundTuning};

pub const CONFIG_DIR_NAME: &str = "beatkeeper";
pub const CONFIG_FILE_NAME: &str = "config.ron";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config syntax: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] ron::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Output device settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Device name; None picks the host default
    pub device: Option<String>,
    /// Master volume, 0..=1
    pub volume: f32,
    /// Scheduler → callback command queue size
    pub command_capacity: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            device: None,
            volume: 0.8,
            command_capacity: DEFAULT_COMMAND_CAPACITY,
        }
    }
}

/// Beat parameters the metronome starts with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatDefaults {
    pub tempo: Tempo,
    /// Accent divisor; 0 disables accents
    pub beats_per_measure: u32,
    pub profile: SoundProfile,
}

impl Default for BeatDefaults {
    fn default() -> Self {
        Self {
            tempo: Tempo::default(),
            beats_per_measure: 4,
            profile: SoundProfile::Digital,
        }
    }
}

impl BeatDefaults {
    pub fn to_params(&self) -> BeatParams {
        BeatParams::new(
            self.tempo,
            AccentPattern::from_beats_per_measure(self.beats_per_measure),
            self.profile,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetronomeConfig {
    pub scheduler: SchedulerConfig,
    pub output: OutputConfig,
    pub stop_policy: StopPolicy,
    pub defaults: BeatDefaults,
    pub sounds: SoundTuning,
}

impl MetronomeConfig {
    /// `<config dir>/beatkeeper/config.ron`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron(&text)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// The file at default_path() if there is one, built-in defaults otherwise
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            Some(path) => {
                debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scheduler;
        if s.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be > 0".into()));
        }
        if s.schedule_ahead_ms <= s.poll_interval_ms {
            return Err(ConfigError::Invalid(format!(
                "schedule_ahead_ms ({}) must exceed poll_interval_ms ({})",
                s.schedule_ahead_ms, s.poll_interval_ms
            )));
        }
        if s.schedule_ahead_ms <= s.safety_margin_ms {
            return Err(ConfigError::Invalid(format!(
                "schedule_ahead_ms ({}) must exceed safety_margin_ms ({})",
                s.schedule_ahead_ms, s.safety_margin_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.output.volume) {
            return Err(ConfigError::Invalid(format!(
                "volume {} outside 0..=1",
                self.output.volume
            )));
        }
        if self.output.command_capacity == 0 {
            return Err(ConfigError::Invalid("command_capacity must be > 0".into()));
        }
        Ok(())
    }
}
