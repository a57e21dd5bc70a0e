//! Engine config file commands.

use std::path::Path;

use clap::{Args, Subcommand};
use tonearm_config::{EngineConfig, engine_config_path, ensure_user_config_dir};

use super::common::load_config;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,

    /// Print the config file location
    Path,

    /// Write a config file with every default spelled out
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check a config file without starting the engine
    Check,
}

pub fn run(args: ConfigArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let path = config_path.map_or_else(engine_config_path, Path::to_path_buf);

    match args.command.unwrap_or(ConfigCommand::Show) {
        ConfigCommand::Show => {
            let config = load_config(config_path)?;
            print!("{}", config.to_toml()?);
        }
        ConfigCommand::Path => {
            let status = if path.is_file() { "" } else { " (not created yet)" };
            println!("{}{status}", path.display());
        }
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            if config_path.is_none() {
                ensure_user_config_dir()?;
            }
            EngineConfig::default().save(&path)?;
            println!("Wrote {}", path.display());
        }
        ConfigCommand::Check => {
            let config = EngineConfig::load(&path)?;
            println!(
                "{} is valid ({} user preset(s), room {})",
                path.display(),
                config.presets.len(),
                config.reverb.room
            );
        }
    }

    Ok(())
}
