//! Configuration and presets for the tonearm player engine.
//!
//! # Features
//!
//! - **Engine config**: [`EngineConfig`], a TOML file with a default for every field
//! - **Effect presets**: the named one-knob-per-effect [`EffectPreset`]s (`concert`,
//!   `nightcore`, ...) plus user presets declared in the config file
//! - **Room presets**: the [`RoomPreset`] shapes the reverb kernel is synthesized from
//! - **Validation**: range checks over every numeric field
//! - **Paths**: platform config directory
//!
//! # Example
//!
//! ```rust
//! use tonearm_config::{EngineConfig, find_effect_preset};
//!
//! let config = EngineConfig::from_toml(r#"
//!     [playback]
//!     crossfade_secs = 5.0
//! "#).unwrap();
//! assert_eq!(config.playback.crossfade_secs, 5.0);
//! assert_eq!(config.automation.debounce_ms, 25.0);
//!
//! let preset = find_effect_preset("NightCore").unwrap();
//! assert_eq!(preset.speed, 1.25);
//! ```

mod engine_config;
mod error;
mod presets;
mod rooms;

/// Platform-specific configuration paths.
pub mod paths;

/// Range validation for engine configuration.
pub mod validation;

pub use engine_config::{
    AudioConfig, AutomationConfig, EngineConfig, LoudnessConfig, ModulationMode, PlaybackConfig,
    RampConfig, ReverbConfig,
};
pub use error::ConfigError;
pub use paths::{engine_config_path, ensure_user_config_dir, user_config_dir};
pub use presets::{
    EffectPreset, FACTORY_PRESET_NAMES, factory_presets, find_effect_preset, is_factory_preset,
};
pub use rooms::{ROOM_PRESETS, RoomPreset, find_room};
pub use validation::{ValidationError, validate_config};
