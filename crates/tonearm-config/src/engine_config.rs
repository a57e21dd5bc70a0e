//! Engine configuration file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::presets::{EffectPreset, find_effect_preset};
use crate::rooms::{RoomPreset, find_room};
use crate::validation::validate_config;

/// Engine configuration.
///
/// Every table and field is optional; missing values take their defaults.
///
/// # TOML Format
///
/// ```toml
/// [audio]
/// sample_rate = 48000
/// buffer_size = 512
/// # device = "USB"
///
/// [playback]
/// crossfade_secs = 3.0
/// gap_ms = 50.0
/// seek_declick_ms = 10.0
/// initial_volume = 80.0
/// modulation = "chorus"
///
/// [automation]
/// debounce_ms = 25.0
/// [automation.ramps]
/// fast_ms = 30.0
/// medium_ms = 80.0
/// slow_ms = 200.0
///
/// [loudness]
/// enabled = true
/// target_dbfs = -16.0
///
/// [reverb]
/// room = "hall"
/// seed = 1337
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Output stream settings.
    pub audio: AudioConfig,
    /// Transport and crossfade settings.
    pub playback: PlaybackConfig,
    /// Ramp and debounce timing.
    pub automation: AutomationConfig,
    /// Loudness normalisation.
    pub loudness: LoudnessConfig,
    /// Reverb kernel synthesis.
    pub reverb: ReverbConfig,
    /// User presets, checked before the factory presets.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub presets: Vec<EffectPreset>,
}

/// Output stream settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Requested output sample rate in Hz.
    pub sample_rate: u32,
    /// Preferred buffer size in frames.
    pub buffer_size: u32,
    /// Output device name filter; system default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 512,
            device: None,
        }
    }
}

/// Which effect the modulation send runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModulationMode {
    /// Two-voice chorus.
    #[default]
    Chorus,
    /// Short-delay flanger.
    Flanger,
    /// Six-stage phaser.
    Phaser,
}

impl ModulationMode {
    /// Lowercase name as used in config files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chorus => "chorus",
            Self::Flanger => "flanger",
            Self::Phaser => "phaser",
        }
    }
}

impl std::str::FromStr for ModulationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chorus" => Ok(Self::Chorus),
            "flanger" => Ok(Self::Flanger),
            "phaser" => Ok(Self::Phaser),
            other => Err(format!("unknown modulation mode '{other}'")),
        }
    }
}

/// Transport and crossfade settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Crossfade window in seconds; 0 disables crossfading.
    pub crossfade_secs: f32,
    /// Silence between tracks when not crossfading, in ms.
    pub gap_ms: f32,
    /// Fade-out/fade-in around a seek jump, in ms.
    pub seek_declick_ms: f32,
    /// Volume knob value at startup, 0–100.
    pub initial_volume: f32,
    /// Effect on the modulation send.
    pub modulation: ModulationMode,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            crossfade_secs: 3.0,
            gap_ms: 50.0,
            seek_declick_ms: 10.0,
            initial_volume: 80.0,
            modulation: ModulationMode::Chorus,
        }
    }
}

/// Ramp windows, in ms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RampConfig {
    /// Continuous sliders: volume, pan, spatial, EQ, bass, compressor, distortion.
    pub fast_ms: f32,
    /// Speed, pitch, delay and chorus.
    pub medium_ms: f32,
    /// Reverb mix.
    pub slow_ms: f32,
}

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            fast_ms: 30.0,
            medium_ms: 80.0,
            slow_ms: 200.0,
        }
    }
}

/// Parameter automation timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Window in which repeated targets for one knob are coalesced, in ms.
    pub debounce_ms: f32,
    /// Ramp windows.
    pub ramps: RampConfig,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 25.0,
            ramps: RampConfig::default(),
        }
    }
}

/// Loudness normalisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoudnessConfig {
    /// Apply normalisation gain at the graph input.
    pub enabled: bool,
    /// Target gated RMS level in dBFS.
    pub target_dbfs: f32,
    /// Most attenuation applied, in dB (negative).
    pub min_gain_db: f32,
    /// Most boost applied, in dB.
    pub max_gain_db: f32,
    /// Peak level the gain may push a track to, in dBFS.
    pub peak_ceiling_dbfs: f32,
}

impl Default for LoudnessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_dbfs: -16.0,
            min_gain_db: -24.0,
            max_gain_db: 12.0,
            peak_ceiling_dbfs: -1.0,
        }
    }
}

/// Reverb kernel synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbConfig {
    /// Room preset name.
    pub room: String,
    /// RNG seed; the same seed always yields the same kernel.
    pub seed: u64,
}

impl Default for ReverbConfig {
    fn default() -> Self {
        Self {
            room: "hall".to_string(),
            seed: 1337,
        }
    }
}

impl EngineConfig {
    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load the file at `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Save as TOML, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every field against its range and every name against its table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_config(self)?;
        Ok(())
    }

    /// The configured reverb room.
    pub fn room(&self) -> Result<RoomPreset, ConfigError> {
        find_room(&self.reverb.room).ok_or_else(|| ConfigError::UnknownRoom(self.reverb.room.clone()))
    }

    /// Resolve a preset name: user presets first, then factory presets.
    pub fn find_preset(&self, name: &str) -> Result<EffectPreset, ConfigError> {
        self.presets
            .iter()
            .find(|p| p.matches(name))
            .cloned()
            .or_else(|| find_effect_preset(name))
            .ok_or_else(|| ConfigError::PresetNotFound(name.to_string()))
    }

    /// Every preset name available, user presets first.
    pub fn preset_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.presets.iter().map(|p| p.name.clone()).collect();
        for name in crate::presets::FACTORY_PRESET_NAMES {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                names.push((*name).to_string());
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.playback.crossfade_secs, 3.0);
        assert_eq!(config.automation.ramps.slow_ms, 200.0);
        assert_eq!(config.loudness.target_dbfs, -16.0);
        assert_eq!(config.reverb.room, "hall");
    }

    #[test]
    fn test_partial_table_keeps_other_defaults() {
        let config = EngineConfig::from_toml("[automation.ramps]\nfast_ms = 12.0\n").unwrap();
        assert_eq!(config.automation.ramps.fast_ms, 12.0);
        assert_eq!(config.automation.ramps.medium_ms, 80.0);
        assert_eq!(config.automation.debounce_ms, 25.0);
    }

    #[test]
    fn test_modulation_mode_parses_lowercase() {
        let config = EngineConfig::from_toml("[playback]\nmodulation = \"phaser\"\n").unwrap();
        assert_eq!(config.playback.modulation, ModulationMode::Phaser);
        assert_eq!("Flanger".parse::<ModulationMode>(), Ok(ModulationMode::Flanger));
        assert!("wah".parse::<ModulationMode>().is_err());
    }

    #[test]
    fn test_unknown_room_rejected() {
        let err = EngineConfig::from_toml("[reverb]\nroom = \"closet\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)), "got {err}");
    }

    #[test]
    fn test_user_preset_shadows_factory() {
        let config = EngineConfig::from_toml(
            "[[presets]]\nname = \"Radio\"\nreverb = 0.0\nspeed = 1.1\n",
        )
        .unwrap();
        assert_eq!(config.find_preset("radio").unwrap().speed, 1.1);
        assert_eq!(config.find_preset("studio").unwrap().reverb, 15.0);
        assert!(matches!(
            config.find_preset("lofi"),
            Err(ConfigError::PresetNotFound(_))
        ));
        let names = config.preset_names();
        assert_eq!(names.iter().filter(|n| n.eq_ignore_ascii_case("radio")).count(), 1);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = EngineConfig::default();
        config.audio.device = Some("USB DAC".to_string());
        config.reverb.seed = 99;
        let text = config.to_toml().unwrap();
        assert_eq!(EngineConfig::from_toml(&text).unwrap(), config);
    }
}
