// Timeline - Tempo, time signature and accent placement

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Beats-per-measure values at or above this never produce an accent
///
/// Callers that disable accents pass a huge divisor; no realistic run
/// reaches a million beats, so anything this large is treated as "off"
/// (beat 0 included) instead of accenting the first beat only.
pub const ACCENTS_DISABLED_THRESHOLD: u32 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimelineError {
    #[error("tempo {0} BPM out of range ({min}..={max})", min = Tempo::MIN_BPM, max = Tempo::MAX_BPM)]
    TempoOutOfRange(u32),

    #[error("invalid time signature '{0}' (expected e.g. 4/4, 6/8)")]
    InvalidTimeSignature(String),
}

/// Tempo in BPM (Beats Per Minute), 1..=240
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Tempo {
    bpm: u16,
}

impl Tempo {
    pub const MIN_BPM: u16 = 1;
    pub const MAX_BPM: u16 = 240;

    pub fn new(bpm: u32) -> Result<Self, TimelineError> {
        if (Self::MIN_BPM as u32..=Self::MAX_BPM as u32).contains(&bpm) {
            Ok(Self { bpm: bpm as u16 })
        } else {
            Err(TimelineError::TempoOutOfRange(bpm))
        }
    }

    /// Nearest valid tempo
    pub fn clamped(bpm: u32) -> Self {
        Self {
            bpm: bpm.clamp(Self::MIN_BPM as u32, Self::MAX_BPM as u32) as u16,
        }
    }

    pub fn bpm(&self) -> u16 {
        self.bpm
    }

    /// Duration of one beat in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm as f64
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: 120 }
    }
}

impl TryFrom<u32> for Tempo {
    type Error = TimelineError;

    fn try_from(bpm: u32) -> Result<Self, Self::Error> {
        Self::new(bpm)
    }
}

impl From<Tempo> for u32 {
    fn from(tempo: Tempo) -> Self {
        tempo.bpm as u32
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.bpm)
    }
}

/// Which beat indices are accented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccentPattern {
    /// Accent every n-th beat, starting with beat 0
    Every(NonZeroU32),
    Disabled,
}

impl AccentPattern {
    /// 0 and values from ACCENTS_DISABLED_THRESHOLD up disable accents
    pub fn from_beats_per_measure(beats_per_measure: u32) -> Self {
        match NonZeroU32::new(beats_per_measure) {
            Some(n) if beats_per_measure < ACCENTS_DISABLED_THRESHOLD => AccentPattern::Every(n),
            _ => AccentPattern::Disabled,
        }
    }

    #[inline]
    pub fn is_accent(&self, beat: u64) -> bool {
        match self {
            AccentPattern::Every(n) => beat % n.get() as u64 == 0,
            AccentPattern::Disabled => false,
        }
    }

    /// Beats per measure, or None when disabled
    pub fn beats_per_measure(&self) -> Option<u32> {
        match self {
            AccentPattern::Every(n) => Some(n.get()),
            AccentPattern::Disabled => None,
        }
    }
}

impl Default for AccentPattern {
    fn default() -> Self {
        AccentPattern::from_beats_per_measure(4)
    }
}

impl fmt::Display for AccentPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccentPattern::Every(n) => write!(f, "accent every {} beats", n),
            AccentPattern::Disabled => f.write_str("no accents"),
        }
    }
}

/// Time signature (numerator/denominator)
/// Only the numerator matters to the click: it is the accent divisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u8,
}

impl TimeSignature {
    pub fn new(numerator: u8, denominator: u8) -> Result<Self, TimelineError> {
        if numerator == 0 || !denominator.is_power_of_two() {
            return Err(TimelineError::InvalidTimeSignature(format!(
                "{}/{}",
                numerator, denominator
            )));
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    pub fn four_four() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }

    pub fn accent_pattern(&self) -> AccentPattern {
        AccentPattern::from_beats_per_measure(self.numerator as u32)
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for TimeSignature {
    type Err = TimelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TimelineError::InvalidTimeSignature(s.to_string());
        let (num, den) = s.trim().split_once('/').ok_or_else(invalid)?;
        let numerator = num.trim().parse::<u8>().map_err(|_| invalid())?;
        let denominator = den.trim().parse::<u8>().map_err(|_| invalid())?;
        Self::new(numerator, denominator).map_err(|_| invalid())
    }
}
