// Sound profiles - Timbre strategies that turn a beat into a click voice

pub mod custom;
pub mod digital;
pub mod metallic;
pub mod wood;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::sampler::DecodedSound;
use crate::synth::ClickVoice;

pub use custom::CustomSample;
pub use digital::{DigitalClick, DigitalParams};
pub use metallic::{MetallicBell, MetallicParams};
pub use wood::{WoodBlock, WoodParams};

/// Selectable timbre
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundProfile {
    #[default]
    Digital,
    Wood,
    Metallic,
    Custom,
}

impl SoundProfile {
    pub const ALL: [SoundProfile; 4] = [
        SoundProfile::Digital,
        SoundProfile::Wood,
        SoundProfile::Metallic,
        SoundProfile::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SoundProfile::Digital => "digital",
            SoundProfile::Wood => "wood",
            SoundProfile::Metallic => "metallic",
            SoundProfile::Custom => "custom",
        }
    }
}

impl fmt::Display for SoundProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sound profile '{0}' (expected digital, wood, metallic or custom)")]
pub struct UnknownProfile(pub String);

impl FromStr for SoundProfile {
    type Err = UnknownProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        SoundProfile::ALL
            .into_iter()
            .find(|profile| profile.as_str() == lowered)
            .ok_or_else(|| UnknownProfile(s.to_string()))
    }
}

/// One way of sounding a beat
///
/// Implementations build a fully self-contained voice: the mixer only has to
/// start it on the right sample and drop it once it reports finished.
pub trait BeatSound: Send + Sync {
    fn voice(&self, accent: bool, sample_rate: f32) -> ClickVoice;
}

/// Per-profile tuning, loaded from the `sounds` config section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundTuning {
    pub digital: DigitalParams,
    pub wood: WoodParams,
    pub metallic: MetallicParams,
    pub custom_gain: f32,
}

impl Default for SoundTuning {
    fn default() -> Self {
        Self {
            digital: DigitalParams::default(),
            wood: WoodParams::default(),
            metallic: MetallicParams::default(),
            custom_gain: CustomSample::DEFAULT_GAIN,
        }
    }
}

/// One instance of every profile
#[derive(Debug, Clone)]
pub struct SoundBank {
    digital: DigitalClick,
    wood: WoodBlock,
    metallic: MetallicBell,
    custom: CustomSample,
}

impl SoundBank {
    pub fn new(tuning: &SoundTuning) -> Self {
        let digital = DigitalClick::new(tuning.digital);
        let mut custom = CustomSample::new(digital.clone());
        custom.set_gain(tuning.custom_gain);

        Self {
            digital,
            wood: WoodBlock::new(tuning.wood),
            metallic: MetallicBell::new(tuning.metallic),
            custom,
        }
    }

    pub fn get(&self, profile: SoundProfile) -> &dyn BeatSound {
        match profile {
            SoundProfile::Digital => &self.digital,
            SoundProfile::Wood => &self.wood,
            SoundProfile::Metallic => &self.metallic,
            SoundProfile::Custom => &self.custom,
        }
    }

    pub fn set_custom_sounds(&mut self, accent: Option<DecodedSound>, regular: Option<DecodedSound>) {
        self.custom.set_sounds(accent, regular);
    }

    pub fn custom(&self) -> &CustomSample {
        &self.custom
    }
}

impl Default for SoundBank {
    fn default() -> Self {
        Self::new(&SoundTuning::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_parse_and_display() {
        assert_eq!("Wood".parse::<SoundProfile>(), Ok(SoundProfile::Wood));
        assert_eq!(" metallic ".parse::<SoundProfile>(), Ok(SoundProfile::Metallic));
        assert!("cowbell".parse::<SoundProfile>().is_err());

        for profile in SoundProfile::ALL {
            assert_eq!(profile.to_string().parse::<SoundProfile>(), Ok(profile));
        }
    }

    #[test]
    fn test_bank_dispatches_by_profile() {
        let bank = SoundBank::default();

        let metallic = bank.get(SoundProfile::Metallic).voice(false, 48000.0);
        assert_eq!(metallic.as_synth().unwrap().partials().count(), 2);

        let wood = bank.get(SoundProfile::Wood).voice(false, 48000.0);
        assert!(wood.as_synth().unwrap().noise().is_some());

        let digital = bank.get(SoundProfile::Digital).voice(true, 48000.0);
        assert_eq!(digital.fundamental_hz(), Some(1000.0));
    }

    #[test]
    fn test_custom_fallback_uses_tuned_digital() {
        let tuning = SoundTuning {
            digital: DigitalParams {
                regular_frequency: 700.0,
                ..DigitalParams::default()
            },
            ..SoundTuning::default()
        };
        let bank = SoundBank::new(&tuning);
        let voice = bank.get(SoundProfile::Custom).voice(false, 48000.0);
        assert_eq!(voice.fundamental_hz(), Some(700.0));
    }

    #[test]
    fn test_tuning_deserializes_with_defaults() {
        let tuning: SoundTuning = ron::from_str("(digital: (accent_frequency: 1200.0))").unwrap();
        assert_eq!(tuning.digital.accent_frequency, 1200.0);
        assert_eq!(tuning.digital.regular_frequency, 800.0);
        assert_eq!(tuning.metallic, MetallicParams::default());
    }
}
