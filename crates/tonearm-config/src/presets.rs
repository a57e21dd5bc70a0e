//! Named effect presets.
//!
//! A preset resolves to five knob values: reverb mix, pitch, speed, delay mix
//! and chorus mix. Factory presets are compiled in; user presets come from the
//! `[[presets]]` tables of the engine config and shadow factory presets of the
//! same name.

use serde::{Deserialize, Serialize};

/// One named preset.
///
/// ```toml
/// [[presets]]
/// name = "lofi"
/// reverb = 30.0
/// pitch = -1.0
/// speed = 0.9
/// delay = 20.0
/// chorus = 10.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectPreset {
    /// Lookup name, matched case-insensitively.
    pub name: String,
    /// Reverb mix, 0–100.
    #[serde(default)]
    pub reverb: f32,
    /// Pitch shift in semitones, -12–12.
    #[serde(default)]
    pub pitch: f32,
    /// Playback speed, 0.25–2.0.
    #[serde(default = "unit_speed")]
    pub speed: f32,
    /// Delay mix, 0–100.
    #[serde(default)]
    pub delay: f32,
    /// Chorus mix, 0–100.
    #[serde(default)]
    pub chorus: f32,
}

fn unit_speed() -> f32 {
    1.0
}

impl EffectPreset {
    /// Preset with every knob neutral.
    pub fn neutral(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reverb: 0.0,
            pitch: 0.0,
            speed: 1.0,
            delay: 0.0,
            chorus: 0.0,
        }
    }

    /// Case-insensitive name match.
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }
}

/// Factory preset names, in display order.
pub static FACTORY_PRESET_NAMES: &[&str] =
    &["default", "concert", "studio", "radio", "nightcore", "slowed"];

/// `(name, reverb, pitch, speed, delay, chorus)`
static FACTORY_TABLE: &[(&str, f32, f32, f32, f32, f32)] = &[
    ("default", 0.0, 0.0, 1.0, 0.0, 0.0),
    ("concert", 40.0, 0.0, 1.0, 25.0, 12.0),
    ("studio", 15.0, 0.0, 1.0, 10.0, 8.0),
    ("radio", 5.0, 1.0, 1.0, 0.0, 0.0),
    ("nightcore", 10.0, 4.0, 1.25, 8.0, 30.0),
    ("slowed", 60.0, -2.0, 0.75, 45.0, 16.0),
];

/// All factory presets.
pub fn factory_presets() -> Vec<EffectPreset> {
    FACTORY_TABLE
        .iter()
        .map(|&(name, reverb, pitch, speed, delay, chorus)| EffectPreset {
            name: name.to_string(),
            reverb,
            pitch,
            speed,
            delay,
            chorus,
        })
        .collect()
}

/// Look up a factory preset by name, ignoring case.
pub fn find_effect_preset(name: &str) -> Option<EffectPreset> {
    factory_presets().into_iter().find(|p| p.matches(name))
}

/// Whether `name` is a factory preset.
pub fn is_factory_preset(name: &str) -> bool {
    FACTORY_PRESET_NAMES
        .iter()
        .any(|n| n.eq_ignore_ascii_case(name.trim()))
}
