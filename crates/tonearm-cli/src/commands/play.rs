//! Queue playback with effects, crossfades and Ctrl+C handling.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::{Args, ValueEnum};
use tonearm_engine::{Engine, EngineEvent, PlaybackState, RepeatMode, TrackQueue};

use super::common::{EffectArgs, format_time, load_config};

/// How often the control loop pumps the engine.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Repeat {
    Off,
    All,
    One,
}

impl From<Repeat> for RepeatMode {
    fn from(r: Repeat) -> Self {
        match r {
            Repeat::Off => RepeatMode::Off,
            Repeat::All => RepeatMode::All,
            Repeat::One => RepeatMode::One,
        }
    }
}

#[derive(Args)]
pub struct PlayArgs {
    /// Files to play, in order
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    #[command(flatten)]
    effects: EffectArgs,

    /// Crossfade length in seconds (0 = gapless)
    #[arg(long)]
    crossfade: Option<f32>,

    /// Master volume 0-100
    #[arg(long)]
    volume: Option<f32>,

    /// Shuffle the queue
    #[arg(long)]
    shuffle: bool,

    /// Repeat mode
    #[arg(long, value_enum, default_value = "off")]
    repeat: Repeat,

    /// Shuffle seed
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Start position of the first track, in seconds
    #[arg(long)]
    start: Option<f64>,

    /// Output device (partial name)
    #[arg(short, long)]
    output: Option<String>,
}

pub fn run(args: PlayArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    args.effects.apply_to_config(&mut config);
    if let Some(device) = &args.output {
        config.audio.device = Some(device.clone());
    }
    if let Some(volume) = args.volume {
        config.playback.initial_volume = volume.clamp(0.0, 100.0);
    }
    if let Some(secs) = args.crossfade {
        config.playback.crossfade_secs = secs;
    }

    let mut queue = TrackQueue::from_tracks(args.files.clone(), args.seed);
    queue.set_repeat(args.repeat.into());
    queue.set_shuffle(args.shuffle);

    let mut engine = Engine::start(config)?;
    println!(
        "Output: {} @ {} Hz, room {}, crossfade {:.1}s",
        engine.backend_name(),
        engine.output_sample_rate(),
        engine.reverb_room().name,
        engine.crossfade_secs()
    );
    args.effects.apply_to_engine(&mut engine)?;

    let Some(first) = queue.next_track().cloned() else {
        anyhow::bail!("nothing to play");
    };
    engine.load_file(&first)?;
    announce(&first, engine.duration());
    if let Some(start) = args.start {
        engine.seek(start);
    }
    preload_upcoming(&mut engine, &mut queue);

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    println!("Playing... Press Ctrl+C to stop.\n");
    engine.play();

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(POLL_INTERVAL);
        for event in engine.poll() {
            match event {
                EngineEvent::CrossfadeStarted { .. } => {
                    print!("\r\x1b[K");
                    println!("Crossfading...");
                }
                EngineEvent::TrackChanged { duration } => {
                    if let Some(path) = queue.on_track_end().cloned() {
                        print!("\r\x1b[K");
                        announce(&path, Some(duration));
                    }
                    preload_upcoming(&mut engine, &mut queue);
                }
                EngineEvent::LoadFailed(err) => tracing::warn!(error = %err, "load failed"),
                EngineEvent::PreloadFailed(err) => {
                    tracing::warn!(error = %err, "could not preload next track");
                }
                _ => {}
            }
        }
        if engine.state() == PlaybackState::Idle {
            break;
        }
        print_status(&engine);
    }

    engine.stop();
    engine.shutdown();
    println!("\nStopped.");
    Ok(())
}

/// Start decoding whatever the queue will play after the current track.
///
/// The decode runs on the engine's worker thread; the control loop keeps
/// polling meanwhile and the track is queued when it finishes.
fn preload_upcoming(engine: &mut Engine, queue: &mut TrackQueue<PathBuf>) {
    let upcoming = if queue.repeat() == RepeatMode::One {
        queue.current().cloned()
    } else {
        queue.peek_next().cloned()
    };
    let Some(path) = upcoming else {
        engine.clear_next();
        return;
    };
    tracing::debug!(path = %path.display(), "preloading next track");
    engine.preload_next_file_async(path);
}

fn announce(path: &Path, duration: Option<f64>) {
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    println!("Now playing: {name} ({})", format_time(duration.unwrap_or(0.0)));
}

fn print_status(engine: &Engine) {
    let duration = engine.duration().unwrap_or(0.0);
    print!(
        "\r\x1b[K  [{}] {} / {}",
        engine.state(),
        format_time(engine.position()),
        format_time(duration)
    );
    let _ = std::io::stdout().flush();
}
