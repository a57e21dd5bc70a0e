//! Range validation for engine configuration.

use thiserror::Error;

use crate::engine_config::EngineConfig;
use crate::rooms::find_room;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A numeric field outside its range.
    #[error("'{field}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Dotted field path, e.g. `playback.crossfade_secs`.
        field: String,
        /// The offending value.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// `reverb.room` names no room preset.
    #[error("unknown reverb room '{0}'")]
    UnknownRoom(String),

    /// A user preset without a name.
    #[error("preset #{0} has an empty name")]
    EmptyPresetName(usize),
}

fn check(field: &str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        })
    }
}

/// Validate a whole configuration, stopping at the first problem.
pub fn validate_config(config: &EngineConfig) -> Result<(), ValidationError> {
    let audio = &config.audio;
    check("audio.sample_rate", f64::from(audio.sample_rate), 8000.0, 192000.0)?;
    check("audio.buffer_size", f64::from(audio.buffer_size), 32.0, 8192.0)?;

    let playback = &config.playback;
    check("playback.crossfade_secs", f64::from(playback.crossfade_secs), 0.0, 12.0)?;
    check("playback.gap_ms", f64::from(playback.gap_ms), 0.0, 2000.0)?;
    check("playback.seek_declick_ms", f64::from(playback.seek_declick_ms), 0.0, 100.0)?;
    check("playback.initial_volume", f64::from(playback.initial_volume), 0.0, 100.0)?;

    let automation = &config.automation;
    check("automation.debounce_ms", f64::from(automation.debounce_ms), 0.0, 500.0)?;
    check("automation.ramps.fast_ms", f64::from(automation.ramps.fast_ms), 0.0, 1000.0)?;
    check("automation.ramps.medium_ms", f64::from(automation.ramps.medium_ms), 0.0, 1000.0)?;
    check("automation.ramps.slow_ms", f64::from(automation.ramps.slow_ms), 0.0, 2000.0)?;

    let loudness = &config.loudness;
    check("loudness.target_dbfs", f64::from(loudness.target_dbfs), -40.0, 0.0)?;
    check("loudness.min_gain_db", f64::from(loudness.min_gain_db), -60.0, 0.0)?;
    check("loudness.max_gain_db", f64::from(loudness.max_gain_db), 0.0, 30.0)?;
    check("loudness.peak_ceiling_dbfs", f64::from(loudness.peak_ceiling_dbfs), -20.0, 0.0)?;

    if find_room(&config.reverb.room).is_none() {
        return Err(ValidationError::UnknownRoom(config.reverb.room.clone()));
    }

    for (i, preset) in config.presets.iter().enumerate() {
        if preset.name.trim().is_empty() {
            return Err(ValidationError::EmptyPresetName(i));
        }
        let field = |knob: &str| format!("presets.{}.{}", preset.name, knob);
        check(&field("reverb"), f64::from(preset.reverb), 0.0, 100.0)?;
        check(&field("pitch"), f64::from(preset.pitch), -12.0, 12.0)?;
        check(&field("speed"), f64::from(preset.speed), 0.25, 2.0)?;
        check(&field("delay"), f64::from(preset.delay), 0.0, 100.0)?;
        check(&field("chorus"), f64::from(preset.chorus), 0.0, 100.0)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EffectPreset;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&EngineConfig::default()), Ok(()));
    }

    #[test]
    fn test_negative_crossfade_rejected() {
        let mut config = EngineConfig::default();
        config.playback.crossfade_secs = -1.0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { ref field, .. } if field == "playback.crossfade_secs"));
    }

    #[test]
    fn test_nan_rejected() {
        let mut config = EngineConfig::default();
        config.automation.debounce_ms = f32::NAN;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_preset_speed_out_of_range() {
        let mut config = EngineConfig::default();
        let mut preset = EffectPreset::neutral("warp");
        preset.speed = 4.0;
        config.presets.push(preset);
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("presets.warp.speed"), "got {err}");
    }

    #[test]
    fn test_empty_preset_name_rejected() {
        let mut config = EngineConfig::default();
        config.presets.push(EffectPreset::neutral("  "));
        assert_eq!(validate_config(&config), Err(ValidationError::EmptyPresetName(0)));
    }
}
