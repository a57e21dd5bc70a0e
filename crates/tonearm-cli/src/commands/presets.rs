//! Preset management commands.
//!
//! Factory presets are built in; user presets live in the `[[presets]]`
//! tables of the engine config file and shadow factory presets of the same
//! name.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use tonearm_config::{
    EffectPreset, EngineConfig, ROOM_PRESETS, engine_config_path, ensure_user_config_dir,
    is_factory_preset,
};

use super::common::load_config;

#[derive(Args)]
pub struct PresetsArgs {
    #[command(subcommand)]
    command: Option<PresetsCommand>,
}

#[derive(Subcommand)]
enum PresetsCommand {
    /// List available presets (factory and user)
    List {
        /// Show only factory presets
        #[arg(long)]
        factory: bool,

        /// Show only user presets
        #[arg(long)]
        user: bool,
    },

    /// Show the knob values of a preset
    Show {
        /// Preset name
        name: String,
    },

    /// Save a user preset to the config file
    Save {
        /// Name for the new preset
        name: String,

        /// Reverb mix 0-100
        #[arg(long, default_value_t = 0.0)]
        reverb: f32,

        /// Pitch shift in semitones
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        pitch: f32,

        /// Playback speed 0.25-2.0
        #[arg(long, default_value_t = 1.0)]
        speed: f32,

        /// Delay mix 0-100
        #[arg(long, default_value_t = 0.0)]
        delay: f32,

        /// Chorus mix 0-100
        #[arg(long, default_value_t = 0.0)]
        chorus: f32,

        /// Overwrite if the preset already exists
        #[arg(long)]
        force: bool,
    },

    /// Delete a user preset
    Delete {
        /// Preset name to delete
        name: String,
    },

    /// List reverb rooms
    Rooms,
}

pub fn run(args: PresetsArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let command = args.command.unwrap_or(PresetsCommand::List {
        factory: false,
        user: false,
    });

    match command {
        PresetsCommand::List { factory, user } => {
            let config = load_config(config_path)?;
            list(&config, factory, user);
        }
        PresetsCommand::Show { name } => {
            let config = load_config(config_path)?;
            let preset = config.find_preset(&name)?;
            let source = if config.presets.iter().any(|p| p.matches(&name)) {
                "user"
            } else {
                "factory"
            };
            println!("Preset: {} ({source})", preset.name);
            print_preset(&preset);
        }
        PresetsCommand::Save {
            name,
            reverb,
            pitch,
            speed,
            delay,
            chorus,
            force,
        } => {
            let (path, mut config) = writable_config(config_path)?;
            if !force && config.presets.iter().any(|p| p.matches(&name)) {
                anyhow::bail!("User preset '{name}' already exists (use --force to overwrite)");
            }
            config.presets.retain(|p| !p.matches(&name));
            let preset = EffectPreset {
                name: name.clone(),
                reverb,
                pitch,
                speed,
                delay,
                chorus,
            };
            config.presets.push(preset);
            config.validate()?;
            config.save(&path)?;
            if is_factory_preset(&name) {
                println!("Note: '{name}' now shadows the factory preset of the same name.");
            }
            println!("Saved preset '{name}' to {}", path.display());
        }
        PresetsCommand::Delete { name } => {
            let (path, mut config) = writable_config(config_path)?;
            let before = config.presets.len();
            config.presets.retain(|p| !p.matches(&name));
            if config.presets.len() == before {
                anyhow::bail!("No user preset named '{name}'");
            }
            config.save(&path)?;
            println!("Deleted preset '{name}'");
        }
        PresetsCommand::Rooms => {
            println!("Reverb Rooms");
            println!("============\n");
            for room in ROOM_PRESETS {
                println!(
                    "  {:<10} {:.1}s kernel, {:.1}s decay",
                    room.name, room.size_secs, room.decay_secs
                );
            }
        }
    }

    Ok(())
}

fn list(config: &EngineConfig, factory_only: bool, user_only: bool) {
    if !user_only {
        println!("Factory Presets");
        println!("===============\n");
        for preset in tonearm_config::factory_presets() {
            let shadowed = config.presets.iter().any(|p| p.matches(&preset.name));
            println!(
                "  {:<10} {}{}",
                preset.name,
                summary(&preset),
                if shadowed { "  (shadowed)" } else { "" }
            );
        }
        println!();
    }

    if !factory_only {
        println!("User Presets");
        println!("============\n");
        if config.presets.is_empty() {
            println!("  (none)");
        }
        for preset in &config.presets {
            println!("  {:<10} {}", preset.name, summary(preset));
        }
        println!();
    }
}

fn summary(preset: &EffectPreset) -> String {
    format!(
        "speed {:.2}x  pitch {:+.0}  reverb {:.0}  delay {:.0}  chorus {:.0}",
        preset.speed, preset.pitch, preset.reverb, preset.delay, preset.chorus
    )
}

fn print_preset(preset: &EffectPreset) {
    println!("  Speed:   {:.2}x", preset.speed);
    println!("  Pitch:   {:+.1} semitones", preset.pitch);
    println!("  Reverb:  {:.0}", preset.reverb);
    println!("  Delay:   {:.0}", preset.delay);
    println!("  Chorus:  {:.0}", preset.chorus);
}

/// Config path to write to, and its current contents.
fn writable_config(config_path: Option<&Path>) -> anyhow::Result<(PathBuf, EngineConfig)> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => {
            ensure_user_config_dir()?;
            engine_config_path()
        }
    };
    let config = EngineConfig::load_or_default(&path)?;
    Ok((path, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_mentions_every_knob() {
        let preset = tonearm_config::find_effect_preset("slowed").unwrap();
        let text = summary(&preset);
        assert!(text.contains("0.75x"));
        assert!(text.contains("pitch -2"));
        assert!(text.contains("reverb 60"));
    }

    #[test]
    fn test_writable_config_uses_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        let (resolved, config) = writable_config(Some(&path)).unwrap();
        assert_eq!(resolved, path);
        assert!(config.presets.is_empty());
    }
}
