//! Display decode and loudness information for an audio file.

use std::path::{Path, PathBuf};

use clap::Args;
use tonearm_engine::analyze;

use super::common::{format_time, load_config};

/// Display audio file information.
#[derive(Args)]
pub struct InfoArgs {
    /// Path to the audio file
    pub file: PathBuf,
}

/// Run the info command.
pub fn run(args: InfoArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let audio = tonearm_io::decode_file(&args.file)?;
    let loudness = analyze(&audio, &config.loudness);

    println!("File:        {}", args.file.display());
    println!("Channels:    {}", audio.channel_count());
    println!("Sample Rate: {} Hz", audio.sample_rate());
    println!(
        "Duration:    {} ({:.3}s, {} frames)",
        format_time(audio.duration_secs()),
        audio.duration_secs(),
        audio.frames()
    );
    println!("Peak:        {:.1} dBFS", linear_to_dbfs(audio.peak()));
    match loudness.measured_dbfs {
        Some(level) => println!("Loudness:    {level:.1} dBFS (gated RMS)"),
        None => println!("Loudness:    silent"),
    }
    println!(
        "Norm Gain:   {:+.1} dB (target {:.1} dBFS)",
        loudness.gain_db, config.loudness.target_dbfs
    );

    let file_size = std::fs::metadata(&args.file)?.len();
    println!("File Size:   {}", format_bytes(file_size));

    Ok(())
}

fn linear_to_dbfs(value: f32) -> f32 {
    if value > 0.0 {
        20.0 * value.log10()
    } else {
        f32::NEG_INFINITY
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
