//! Playback engine for the tonearm music player.
//!
//! The engine turns decoded tracks into processed output: a clock-driven
//! transport, debounced parameter automation, a per-voice DSP graph with
//! reverb, delay and modulation sends, loudness normalisation, gapless and
//! crossfaded track changes, and offline export to 16-bit WAV.
//!
//! ## Architecture
//!
//! - **Control side** ([`Engine`]): every public call runs on the caller's
//!   thread, updates the state machine and the [`AutomationLane`]s, and
//!   returns immediately. Timed work (debounced commits, crossfades, track
//!   ends) is queued in a [`Scheduler`] and fired from [`Engine::poll`].
//! - **Audio side** ([`RenderCore`]): runs inside the output callback,
//!   owns every [`Voice`] and reads knob targets from the lock-free
//!   [`ParamBridge`].
//! - **Worker thread**: background decodes and exports, tagged with a
//!   generation so superseded requests never surface.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tonearm_config::EngineConfig;
//! use tonearm_engine::Engine;
//!
//! let mut engine = Engine::start(EngineConfig::default())?;
//! engine.load_file("track.flac")?;
//! engine.apply_preset("nightcore")?;
//! engine.play();
//! loop {
//!     for event in engine.poll() {
//!         println!("{event:?}");
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(20));
//! }
//! ```

pub mod automation;
pub mod bridge;
pub mod clock;
pub mod crossfade;
pub mod engine;
pub mod error;
pub mod graph;
pub mod impulse;
pub mod loudness;
pub mod offline;
pub mod params;
pub mod queue;
pub mod render;
pub mod scheduler;
pub mod topology;
pub mod voice;
mod worker;

pub use automation::{AutomationLane, Ramp};
pub use bridge::{AtomicParam, ParamBridge};
pub use clock::{Clock, ManualClock, SystemClock, Transport};
pub use crossfade::{CrossfadeSession, crossfade_start};
pub use engine::{Engine, EngineEvent, PlaybackState, PreparedTrack, ResolvedPreset};
pub use error::{EngineError, Result};
pub use graph::{BoxedEffect, CONTROL_BLOCK, GraphContext, SignalGraph, modulation_effect};
pub use impulse::{ImpulseResponse, KernelCache};
pub use loudness::{LoudnessAnalysis, analyze, gated_rms_dbfs};
pub use offline::{
    OfflineJob, RENDER_BLOCK, export_wav, output_frames, render_offline, source_channels,
};
pub use params::{EffectParameterSet, KNOB_COUNT, Knob, ParamFrame, RampSpeed};
pub use queue::{RepeatMode, TrackQueue};
pub use render::{AudioCommand, MIX_BLOCK, RenderCore, Retired};
pub use scheduler::{ScheduledTask, Scheduler, TaskId, TaskKind};
pub use topology::{GraphTopology, SendReturn, Stage};
pub use voice::{Voice, VoiceId};

pub use tonearm_config::{EngineConfig, ModulationMode};
