//! Shared CLI helpers used across multiple commands.

use std::path::Path;

use anyhow::Context;
use clap::Args;
use tonearm_config::{EngineConfig, ModulationMode, engine_config_path};
use tonearm_engine::{Engine, Knob};

/// Parse a `key=value` string for clap's `value_parser`.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 {
        return Err(format!(
            "Invalid parameter format: '{}' (expected key=value)",
            s
        ));
    }
    Ok((parts[0].trim().to_string(), parts[1].trim().to_string()))
}

/// Load the engine config.
///
/// An explicit path must exist; the default path falls back to built-in
/// defaults when there is no file yet.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => {
            let path = engine_config_path();
            let config = EngineConfig::load_or_default(&path)
                .with_context(|| format!("loading config {}", path.display()))?;
            tracing::debug!(path = %path.display(), "config loaded");
            Ok(config)
        }
    }
}

/// Effect settings shared by `play` and `export`.
#[derive(Args, Debug, Default)]
pub struct EffectArgs {
    /// Preset name (see `tonearm presets list`)
    #[arg(short, long)]
    pub preset: Option<String>,

    /// Knob value, applied after the preset (e.g. "reverb=40", "eq3=-6")
    #[arg(long = "set", value_parser = parse_key_val, number_of_values = 1)]
    pub set: Vec<(String, String)>,

    /// Reverb room: small, room, hall, cathedral
    #[arg(long)]
    pub room: Option<String>,

    /// Modulation send flavour: chorus, flanger, phaser
    #[arg(long)]
    pub modulation: Option<ModulationMode>,
}

impl EffectArgs {
    /// Fold room and modulation overrides into `config`.
    pub fn apply_to_config(&self, config: &mut EngineConfig) {
        if let Some(room) = &self.room {
            config.reverb.room.clone_from(room);
        }
        if let Some(mode) = self.modulation {
            config.playback.modulation = mode;
        }
    }

    /// Apply the preset, then each `--set`, to a running engine.
    pub fn apply_to_engine(&self, engine: &mut Engine) -> anyhow::Result<()> {
        if let Some(name) = &self.preset {
            let resolved = engine.apply_preset(name)?;
            println!(
                "Preset {name}: speed {:.2}x, pitch {:+.0} st, reverb {:.0}, delay {:.0}, chorus {:.0}",
                resolved.speed, resolved.pitch, resolved.reverb, resolved.delay, resolved.chorus
            );
        }
        for (key, value) in &self.set {
            let knob: Knob = key.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let value: f32 = value
                .parse()
                .with_context(|| format!("'{value}' is not a number for {knob}"))?;
            let applied = engine.set_param(knob, value);
            if (applied - value).abs() > f32::EPSILON {
                tracing::warn!(%knob, requested = value, applied, "value clamped");
            }
        }
        Ok(())
    }
}

/// Format seconds as `m:ss`.
pub fn format_time(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
