//! Offline render to a 16-bit PCM WAV file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tonearm_engine::{Engine, SystemClock};
use tonearm_io::read_wav_info;

use super::common::{EffectArgs, load_config};

/// Progress bar resolution.
const PROGRESS_STEPS: u64 = 1000;

#[derive(Args)]
pub struct ExportArgs {
    /// Input audio file (mp3, wav, ogg, flac)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    #[command(flatten)]
    effects: EffectArgs,

    /// Overwrite the output file if it exists
    #[arg(short, long)]
    force: bool,
}

pub fn run(args: ExportArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    if args.output.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            args.output.display()
        );
    }

    let mut config = load_config(config_path)?;
    args.effects.apply_to_config(&mut config);

    let mut engine = Engine::headless(config, Arc::new(SystemClock::new()))?;
    println!("Loading {}...", args.input.display());
    engine
        .load_file(&args.input)
        .with_context(|| format!("decoding {}", args.input.display()))?;
    args.effects.apply_to_engine(&mut engine)?;

    let pb = ProgressBar::new(PROGRESS_STEPS);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% ({eta})")
            .map_err(|e| anyhow::anyhow!(e))?
            .progress_chars("##-"),
    );

    let bytes = engine.export_processed_audio(|fraction| {
        pb.set_position((f64::from(fraction) * PROGRESS_STEPS as f64) as u64);
    })?;
    pb.finish_and_clear();

    std::fs::write(&args.output, &bytes)
        .with_context(|| format!("writing {}", args.output.display()))?;

    let info = read_wav_info(&bytes)?;
    println!(
        "Wrote {} ({} ch, {} Hz, {:.2}s, {} bytes)",
        args.output.display(),
        info.channels,
        info.sample_rate,
        f64::from(info.frames) / f64::from(info.sample_rate),
        bytes.len()
    );
    engine.shutdown();
    Ok(())
}
