//! tonearm CLI - play and export audio through the tonearm engine.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tonearm")]
#[command(author, version, about = "tonearm music player engine CLI", long_about = None)]
struct Cli {
    /// Engine config file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one or more files with effects and crossfades
    Play(commands::play::PlayArgs),

    /// Render a file through the effect graph to a 16-bit WAV
    Export(commands::export::ExportArgs),

    /// List and inspect effect presets
    Presets(commands::presets::PresetsArgs),

    /// Show decode and loudness information for a file
    Info(commands::info::InfoArgs),

    /// List audio output devices
    Devices(commands::devices::DevicesArgs),

    /// Show or write the engine config file
    Config(commands::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Play(args) => commands::play::run(args, config),
        Commands::Export(args) => commands::export::run(args, config),
        Commands::Presets(args) => commands::presets::run(args, config),
        Commands::Info(args) => commands::info::run(args, config),
        Commands::Devices(args) => commands::devices::run(args),
        Commands::Config(args) => commands::config::run(args, config),
    }
}
