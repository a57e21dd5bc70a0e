//! The engine session.
//!
//! [`Engine`] is the one value a player front end talks to. It owns the
//! output stream, the clock, the knob automation lanes, the reverb kernel
//! cache and the playback state machine:
//!
//! ```text
//! Idle ──load──▶ Loaded ──play──▶ Playing ◀──play/pause──▶ Paused
//!                                   │  ▲
//!                     crossfade due │  │ fade complete
//!                                   ▼  │
//!                                Crossfading
//! ```
//!
//! Every call runs synchronously on the caller's thread and returns at once.
//! Sample processing happens in the [`RenderCore`] on the audio thread,
//! reached only through [`AudioCommand`]s and the atomic [`ParamBridge`].
//! Anything time-based (debounced knob commits, crossfades, natural track
//! ends) is driven by [`Engine::poll`], which compares scheduled tasks
//! against the engine's [`Clock`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use tonearm_config::{ConfigError, EngineConfig, LoudnessConfig, ModulationMode, RoomPreset, find_room};
use tonearm_effects::Convolver;
use tonearm_io::{
    AudioBackend, BackendStreamConfig, CpalBackend, DecodedAudio, NullBackend, StreamHandle,
};

use crate::automation::AutomationLane;
use crate::bridge::ParamBridge;
use crate::clock::{Clock, SystemClock, Transport};
use crate::crossfade::{CrossfadeSession, crossfade_start};
use crate::error::{EngineError, Result};
use crate::graph::{GraphContext, SignalGraph, modulation_effect};
use crate::impulse::KernelCache;
use crate::loudness::{LoudnessAnalysis, analyze};
use crate::offline::{OfflineJob, export_wav};
use crate::params::{EffectParameterSet, Knob};
use crate::render::{AudioCommand, RenderCore, Retired};
use crate::scheduler::{ScheduledTask, Scheduler, TaskKind};
use crate::topology::{GraphTopology, SendReturn};
use crate::voice::{Voice, VoiceId};
use crate::worker::{DecodeSource, DecodeTarget, Job, JobResult, Worker};

/// Output channel count requested from the backend.
const OUTPUT_CHANNELS: u16 = 2;

/// Where the engine is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing playing. A stopped track may still be retained.
    Idle,
    /// A track is decoded and ready at its start or seek position.
    Loaded,
    /// The current voice is audible and the transport is running.
    Playing,
    /// Position frozen.
    Paused,
    /// Two voices overlap while one fades into the other.
    Crossfading,
}

impl PlaybackState {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loaded => "loaded",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Crossfading => "crossfading",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Things that happened since the last [`Engine::poll`].
#[derive(Debug)]
pub enum EngineEvent {
    /// The state machine moved.
    StateChanged(PlaybackState),
    /// A track became current via `load*`.
    TrackLoaded {
        /// Length in seconds.
        duration: f64,
    },
    /// A background decode failed. The previous track is untouched.
    LoadFailed(EngineError),
    /// A background preload finished and is queued as the next track.
    NextTrackReady {
        /// Length in seconds.
        duration: f64,
    },
    /// A background preload failed. Nothing is queued.
    PreloadFailed(EngineError),
    /// The next track started fading in.
    CrossfadeStarted {
        /// Voice fading out.
        outgoing: VoiceId,
        /// Voice fading in.
        incoming: VoiceId,
    },
    /// The preloaded next track became current.
    TrackChanged {
        /// Length in seconds.
        duration: f64,
    },
    /// The current track played to its end.
    TrackEnded,
    /// A background export completed.
    ExportFinished(Result<Vec<u8>>),
}

/// A decoded track with its loudness analysis.
#[derive(Debug, Clone)]
pub struct PreparedTrack {
    audio: Arc<DecodedAudio>,
    loudness: LoudnessAnalysis,
}

impl PreparedTrack {
    /// Analyse `audio` for normalisation.
    pub fn new(audio: Arc<DecodedAudio>, loudness: &LoudnessConfig) -> Self {
        let analysis = analyze(&audio, loudness);
        Self {
            audio,
            loudness: analysis,
        }
    }

    /// Decoded samples.
    pub fn audio(&self) -> &Arc<DecodedAudio> {
        &self.audio
    }

    /// Normalisation analysis.
    pub fn loudness(&self) -> &LoudnessAnalysis {
        &self.loudness
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.audio.duration_secs()
    }
}

/// Knob values a preset resolved to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPreset {
    /// Playback rate.
    pub speed: f32,
    /// Pitch shift in semitones.
    pub pitch: f32,
    /// Reverb mix, 0–100.
    pub reverb: f32,
    /// Delay mix, 0–100.
    pub delay: f32,
    /// Chorus mix, 0–100.
    pub chorus: f32,
}

#[derive(Debug)]
struct TrackSession {
    track: PreparedTrack,
    transport: Transport,
    voice: Option<VoiceId>,
}

/// A playback session.
pub struct Engine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    backend: Box<dyn AudioBackend>,
    null: Option<NullBackend>,
    stream: Option<StreamHandle>,
    output_rate: u32,
    commands: Sender<AudioCommand>,
    retired: Receiver<Retired>,
    bridge: Arc<ParamBridge>,
    params: EffectParameterSet,
    lanes: Vec<AutomationLane>,
    topology: Arc<GraphTopology>,
    kernels: KernelCache,
    room: RoomPreset,
    state: PlaybackState,
    current: Option<TrackSession>,
    incoming: Option<TrackSession>,
    crossfade: Option<CrossfadeSession>,
    next: Option<PreparedTrack>,
    scheduler: Scheduler,
    next_voice_id: VoiceId,
    worker: Worker,
    load_generation: u64,
    awaiting_load: Option<u64>,
    preload_generation: u64,
    awaiting_preload: Option<u64>,
    export_generation: u64,
    awaiting_export: Option<u64>,
    events: Vec<EngineEvent>,
    shut_down: bool,
}

impl Engine {
    /// Open the default cpal output with a system clock.
    ///
    /// Fails with [`EngineError::GraphInit`] if no output stream can be
    /// opened; [`Engine::headless`] is the fallback.
    pub fn start(config: EngineConfig) -> Result<Self> {
        Self::with_backend(config, Arc::new(SystemClock::new()), Box::new(CpalBackend::new()))
    }

    /// Engine without an audio device.
    ///
    /// Output is only rendered when [`pull_output`](Self::pull_output) asks
    /// for it, and time only moves as `clock` does.
    pub fn headless(config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let null = NullBackend::new();
        let mut engine = Self::with_backend(config, clock, Box::new(null.clone()))?;
        engine.null = Some(null);
        Ok(engine)
    }

    /// Engine on an explicit backend and clock.
    pub fn with_backend(
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        backend: Box<dyn AudioBackend>,
    ) -> Result<Self> {
        config.validate()?;
        let room = config.room()?;

        let requested = BackendStreamConfig {
            sample_rate: config.audio.sample_rate,
            buffer_size: config.audio.buffer_size,
            channels: OUTPUT_CHANNELS,
            device_name: config.audio.device.clone(),
        };
        let output_rate = backend.actual_sample_rate(&requested);
        let stream_config = BackendStreamConfig {
            sample_rate: output_rate,
            ..requested
        };

        let params = EffectParameterSet::with_volume(config.playback.initial_volume);
        let bridge = Arc::new(ParamBridge::new(params.values()));
        let (command_tx, command_rx) = unbounded();
        let (retired_tx, retired_rx) = unbounded();
        let mut core = RenderCore::new(
            command_rx,
            retired_tx,
            Arc::clone(&bridge),
            stream_config.channels,
        );

        let stream = backend
            .build_output_stream(
                &stream_config,
                Box::new(move |data: &mut [f32]| core.render(data)),
                Box::new(|err: &str| tracing::error!(error = err, "output stream error")),
            )
            .map_err(|e| EngineError::GraphInit(e.to_string()))?;

        let ramps = &config.automation.ramps;
        let lanes = Knob::ALL
            .iter()
            .map(|&knob| {
                AutomationLane::new(
                    params.get(knob),
                    knob.ramp().window_ms(ramps),
                    config.automation.debounce_ms,
                )
            })
            .collect();

        let mut kernels = KernelCache::new(config.reverb.seed);
        kernels.get(&room, output_rate);
        let topology = Arc::new(GraphTopology::standard(config.playback.modulation));
        let worker = Worker::spawn()?;

        tracing::info!(
            backend = backend.name(),
            sample_rate = output_rate,
            room = room.name,
            topology = %topology,
            "engine started"
        );

        Ok(Self {
            config,
            clock,
            backend,
            null: None,
            stream: Some(stream),
            output_rate,
            commands: command_tx,
            retired: retired_rx,
            bridge,
            params,
            lanes,
            topology,
            kernels,
            room,
            state: PlaybackState::Idle,
            current: None,
            incoming: None,
            crossfade: None,
            next: None,
            scheduler: Scheduler::new(),
            next_voice_id: 1,
            worker,
            load_generation: 0,
            awaiting_load: None,
            preload_generation: 0,
            awaiting_preload: None,
            export_generation: 0,
            awaiting_export: None,
            events: Vec::new(),
            shut_down: false,
        })
    }

    // ── Loading ──────────────────────────────────────────────────────────

    /// Decode `bytes` and make the result the current track.
    ///
    /// On failure the engine keeps its previous state.
    pub fn load(&mut self, bytes: &[u8], extension: Option<&str>) -> Result<()> {
        let audio = tonearm_io::decode(bytes, extension).map_err(EngineError::Decode)?;
        self.load_audio(audio);
        Ok(())
    }

    /// Decode a file and make it the current track.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let audio = tonearm_io::decode_file(path).map_err(EngineError::Decode)?;
        self.load_audio(audio);
        Ok(())
    }

    /// Make already-decoded audio the current track.
    pub fn load_audio(&mut self, audio: DecodedAudio) {
        self.awaiting_load = None;
        let track = PreparedTrack::new(audio.into_shared(), &self.config.loudness);
        let now = self.now();
        self.pump(now);
        self.install(track, now);
    }

    /// Decode on the worker thread.
    ///
    /// The result is applied by a later [`poll`](Self::poll). A newer
    /// `load*` call discards this one's result.
    pub fn load_async(&mut self, bytes: Vec<u8>, extension: Option<&str>) {
        self.load_generation += 1;
        self.awaiting_load = Some(self.load_generation);
        self.worker.submit(Job::Decode {
            target: DecodeTarget::Current,
            generation: self.load_generation,
            source: DecodeSource::Bytes {
                bytes,
                extension: extension.map(str::to_string),
            },
            loudness: self.config.loudness.clone(),
        });
        tracing::debug!(generation = self.load_generation, "async load requested");
    }

    /// Queue the track that follows the current one.
    ///
    /// Supersedes any background preload still in flight.
    pub fn preload_next(&mut self, audio: DecodedAudio) {
        self.awaiting_preload = None;
        let track = PreparedTrack::new(audio.into_shared(), &self.config.loudness);
        tracing::debug!(duration = track.duration(), "next track preloaded");
        self.next = Some(track);
        let now = self.now();
        self.pump(now);
        self.reschedule(now);
    }

    /// Decode a file and queue it as the next track.
    pub fn preload_next_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let audio = tonearm_io::decode_file(path).map_err(EngineError::Decode)?;
        self.preload_next(audio);
        Ok(())
    }

    /// Decode `bytes` on the worker thread and queue the result as the next
    /// track.
    ///
    /// A later [`poll`](Self::poll) applies it and reports
    /// [`EngineEvent::NextTrackReady`] or [`EngineEvent::PreloadFailed`].
    /// Only the newest preload request is kept; whatever is queued stays
    /// queued until the result arrives.
    pub fn preload_next_async(&mut self, bytes: Vec<u8>, extension: Option<&str>) {
        self.submit_preload(DecodeSource::Bytes {
            bytes,
            extension: extension.map(str::to_string),
        });
    }

    /// Read and decode a file on the worker thread, then queue it as the
    /// next track. See [`preload_next_async`](Self::preload_next_async).
    pub fn preload_next_file_async(&mut self, path: impl Into<PathBuf>) {
        self.submit_preload(DecodeSource::File(path.into()));
    }

    /// Whether a background preload is still running.
    pub fn is_preloading(&self) -> bool {
        self.awaiting_preload.is_some()
    }

    fn submit_preload(&mut self, source: DecodeSource) {
        self.preload_generation += 1;
        self.awaiting_preload = Some(self.preload_generation);
        self.worker.submit(Job::Decode {
            target: DecodeTarget::Next,
            generation: self.preload_generation,
            source,
            loudness: self.config.loudness.clone(),
        });
        tracing::debug!(generation = self.preload_generation, "async preload requested");
    }

    /// Forget the queued next track and any preload in flight.
    pub fn clear_next(&mut self) {
        self.awaiting_preload = None;
        self.next = None;
        let now = self.now();
        self.reschedule(now);
    }

    /// Whether a next track is queued.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    // ── Transport ────────────────────────────────────────────────────────

    /// Start or resume playback. No-op when already playing or nothing is
    /// loaded.
    pub fn play(&mut self) {
        let now = self.now();
        self.pump(now);
        self.play_at(now);
    }

    /// Pause. A running crossfade is completed first.
    pub fn pause(&mut self) {
        let now = self.now();
        self.pump(now);
        if self.state == PlaybackState::Crossfading {
            self.complete_crossfade(now);
        }
        if self.state != PlaybackState::Playing {
            return;
        }
        if let Some(session) = self.current.as_mut() {
            session.transport.pause(now);
            if let Some(voice) = session.voice {
                self.scheduler.cancel_voice(voice);
                self.send(AudioCommand::Pause(voice));
            }
        }
        self.set_state(PlaybackState::Paused);
    }

    /// Move to `secs`, clamped to the track. Keeps the play state.
    ///
    /// Returns the position actually set, which [`position`](Self::position)
    /// reads back immediately.
    pub fn seek(&mut self, secs: f64) -> f64 {
        let now = self.now();
        self.pump(now);
        if self.state == PlaybackState::Crossfading {
            self.complete_crossfade(now);
        }
        let Some(session) = self.current.as_mut() else {
            return 0.0;
        };
        let position = session.transport.seek(secs, now);
        if let Some(voice) = session.voice {
            self.send(AudioCommand::Seek {
                voice,
                secs: position,
            });
        }
        self.reschedule(now);
        tracing::debug!(position, "seek");
        position
    }

    /// Stop and tear down every voice. Safe to call repeatedly.
    ///
    /// The current track is kept; a later [`play`](Self::play) starts it
    /// from the beginning.
    pub fn stop(&mut self) {
        let now = self.now();
        self.pump(now);
        self.teardown_voices();
        if let Some(session) = self.current.as_mut() {
            session.transport.stop();
            session.voice = None;
        }
        self.snap_params(now);
        self.set_state(PlaybackState::Idle);
    }

    /// Current state.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Whether the transport is running.
    pub fn is_playing(&self) -> bool {
        matches!(
            self.state,
            PlaybackState::Playing | PlaybackState::Crossfading
        )
    }

    /// Position of the current track in seconds; 0 with nothing loaded.
    pub fn position(&self) -> f64 {
        let now = self.now();
        self.current
            .as_ref()
            .map_or(0.0, |s| s.transport.position(now))
    }

    /// Length of the current track in seconds.
    pub fn duration(&self) -> Option<f64> {
        self.current.as_ref().map(|s| s.transport.duration())
    }

    /// Loudness analysis of the current track.
    pub fn loudness(&self) -> Option<&LoudnessAnalysis> {
        self.current.as_ref().map(|s| s.track.loudness())
    }

    /// The running crossfade, if any.
    pub fn crossfade(&self) -> Option<&CrossfadeSession> {
        self.crossfade.as_ref()
    }

    /// Configured crossfade window in seconds.
    pub fn crossfade_secs(&self) -> f64 {
        f64::from(self.config.playback.crossfade_secs)
    }

    /// Set the crossfade window; 0 disables crossfading.
    pub fn set_crossfade(&mut self, secs: f32) {
        let secs = if secs.is_finite() { secs.clamp(0.0, 12.0) } else { 0.0 };
        self.config.playback.crossfade_secs = secs;
        let now = self.now();
        self.pump(now);
        self.reschedule(now);
    }

    // ── Knobs ────────────────────────────────────────────────────────────

    /// Request a new value for `knob`. Returns the clamped target.
    ///
    /// The value ramps from wherever the knob currently stands. Requests
    /// arriving inside the debounce window replace each other; only the
    /// last is committed.
    pub fn set_param(&mut self, knob: Knob, value: f32) -> f32 {
        let now = self.now();
        self.pump(now);
        let value = self.params.set(knob, value);
        if self.lanes[knob.index()].request(value, now) {
            self.bridge.set_target(knob, value);
        }
        if knob == Knob::Speed {
            self.apply_rate(value, now);
        }
        tracing::trace!(%knob, value, "knob requested");
        value
    }

    /// Master volume, 0–100.
    pub fn set_volume(&mut self, volume: f32) -> f32 {
        self.set_param(Knob::Volume, volume)
    }

    /// Playback rate, 0.25–2.
    pub fn set_playback_rate(&mut self, rate: f32) -> f32 {
        self.set_param(Knob::Speed, rate)
    }

    /// Pitch shift in semitones, ±12.
    pub fn set_pitch_shift(&mut self, semitones: f32) -> f32 {
        self.set_param(Knob::PitchSemitones, semitones)
    }

    /// Reverb return level, 0–100.
    pub fn set_reverb_mix(&mut self, mix: f32) -> f32 {
        self.set_param(Knob::ReverbMix, mix)
    }

    /// Bass shelf amount, 0–100.
    pub fn set_bass_boost(&mut self, amount: f32) -> f32 {
        self.set_param(Knob::BassBoost, amount)
    }

    /// Compression amount, 0–100.
    pub fn set_compressor(&mut self, amount: f32) -> f32 {
        self.set_param(Knob::Compressor, amount)
    }

    /// Delay return level, 0–100.
    pub fn set_delay_mix(&mut self, mix: f32) -> f32 {
        self.set_param(Knob::DelayMix, mix)
    }

    /// Modulation return level, 0–100.
    pub fn set_chorus_mix(&mut self, mix: f32) -> f32 {
        self.set_param(Knob::ChorusMix, mix)
    }

    /// Distortion amount, 0–100.
    pub fn set_distortion(&mut self, amount: f32) -> f32 {
        self.set_param(Knob::Distortion, amount)
    }

    /// Stereo balance, −1–1.
    pub fn set_stereo_pan(&mut self, pan: f32) -> f32 {
        self.set_param(Knob::StereoPan, pan)
    }

    /// Spatial azimuth in degrees, ±180.
    pub fn set_spatial_position(&mut self, degrees: f32) -> f32 {
        self.set_param(Knob::SpatialPosition, degrees)
    }

    /// Gain of EQ band `band` (0–9) in dB.
    pub fn set_eq_band(&mut self, band: usize, gain_db: f32) -> Result<f32> {
        let knob = Knob::eq_band(band).ok_or(EngineError::InvalidBand(band))?;
        Ok(self.set_param(knob, gain_db))
    }

    /// Current (possibly ramping) gain of EQ band `band`.
    pub fn eq_band(&self, band: usize) -> Result<f32> {
        let knob = Knob::eq_band(band).ok_or(EngineError::InvalidBand(band))?;
        Ok(self.param_value(knob))
    }

    /// Where `knob` stands right now, ramps included.
    pub fn param_value(&self, knob: Knob) -> f32 {
        self.lanes[knob.index()].value_at(self.now())
    }

    /// Latest value requested for `knob`.
    pub fn param_target(&self, knob: Knob) -> f32 {
        self.lanes[knob.index()].target()
    }

    /// Every knob's requested value.
    pub fn params(&self) -> &EffectParameterSet {
        &self.params
    }

    /// Switch the modulation send between chorus, flanger and phaser.
    pub fn set_modulation_mode(&mut self, mode: ModulationMode) {
        if self.topology.modulation() == mode {
            return;
        }
        self.topology = Arc::new(self.topology.with_modulation(mode));
        self.config.playback.modulation = mode;
        let rate = self.output_rate as f32;
        for voice in self.live_voices() {
            self.send(AudioCommand::SwapSend {
                voice,
                send: SendReturn::Modulation,
                effect: modulation_effect(mode, rate),
            });
        }
        tracing::info!(mode = mode.as_str(), "modulation mode changed");
    }

    /// Active modulation flavour.
    pub fn modulation_mode(&self) -> ModulationMode {
        self.topology.modulation()
    }

    /// Switch the reverb to another room preset.
    pub fn set_reverb_room(&mut self, name: &str) -> Result<()> {
        let room = find_room(name).ok_or_else(|| ConfigError::UnknownRoom(name.to_string()))?;
        if room.name == self.room.name {
            return Ok(());
        }
        self.room = room;
        self.config.reverb.room = room.name.to_string();
        let kernel = self.kernels.get(&room, self.output_rate);
        for voice in self.live_voices() {
            self.send(AudioCommand::SwapSend {
                voice,
                send: SendReturn::Reverb,
                effect: Box::new(Convolver::new(Arc::clone(&kernel))),
            });
        }
        tracing::info!(room = room.name, "reverb room changed");
        Ok(())
    }

    /// Active reverb room.
    pub fn reverb_room(&self) -> &RoomPreset {
        &self.room
    }

    /// Apply a named preset, user presets first. Case-insensitive.
    pub fn apply_preset(&mut self, name: &str) -> Result<ResolvedPreset> {
        let preset = self.config.find_preset(name).map_err(|e| match e {
            ConfigError::PresetNotFound(n) => EngineError::UnknownPreset(n),
            other => EngineError::Config(other),
        })?;
        let resolved = ResolvedPreset {
            speed: self.set_playback_rate(preset.speed),
            pitch: self.set_pitch_shift(preset.pitch),
            reverb: self.set_reverb_mix(preset.reverb),
            delay: self.set_delay_mix(preset.delay),
            chorus: self.set_chorus_mix(preset.chorus),
        };
        tracing::info!(preset = %preset.name, "preset applied");
        Ok(resolved)
    }

    /// The preset-controlled knobs as currently requested.
    pub fn resolved_settings(&self) -> ResolvedPreset {
        ResolvedPreset {
            speed: self.param_target(Knob::Speed),
            pitch: self.param_target(Knob::PitchSemitones),
            reverb: self.param_target(Knob::ReverbMix),
            delay: self.param_target(Knob::DelayMix),
            chorus: self.param_target(Knob::ChorusMix),
        }
    }

    /// Every preset name available to [`apply_preset`](Self::apply_preset).
    pub fn preset_names(&self) -> Vec<String> {
        self.config.preset_names()
    }

    // ── Export ───────────────────────────────────────────────────────────

    /// Render the current track with the current knob targets and encode
    /// it as 16-bit PCM WAV. Blocks until done.
    pub fn export_processed_audio(&mut self, progress: impl FnMut(f32)) -> Result<Vec<u8>> {
        let job = self.offline_job()?;
        export_wav(&job, progress)
    }

    /// Export on the worker thread.
    ///
    /// The bytes arrive as [`EngineEvent::ExportFinished`] from a later
    /// [`poll`](Self::poll). A newer request discards this one's result.
    pub fn export_in_background(&mut self) -> Result<()> {
        let job = self.offline_job()?;
        self.export_generation += 1;
        self.awaiting_export = Some(self.export_generation);
        self.worker.submit(Job::Export {
            generation: self.export_generation,
            job: Box::new(job),
        });
        tracing::debug!(generation = self.export_generation, "background export requested");
        Ok(())
    }

    fn offline_job(&mut self) -> Result<OfflineJob> {
        let session = self
            .current
            .as_ref()
            .ok_or_else(|| EngineError::Export("no track loaded".to_string()))?;
        let audio = Arc::clone(&session.track.audio);
        let input_gain = session.track.loudness.gain_linear();
        let kernel = self.kernels.get(&self.room, audio.sample_rate());
        Ok(OfflineJob {
            audio,
            topology: Arc::clone(&self.topology),
            kernel,
            knobs: *self.params.values(),
            input_gain,
            ramps: self.config.automation.ramps.clone(),
        })
    }

    // ── Pump ─────────────────────────────────────────────────────────────

    /// Commit debounced knobs, fire due tasks, apply finished background
    /// work, and return what happened.
    pub fn poll(&mut self) -> Vec<EngineEvent> {
        let now = self.now();
        self.pump(now);
        while let Some(result) = self.worker.try_recv() {
            self.apply_job(result);
        }
        std::mem::take(&mut self.events)
    }

    /// Block until outstanding background loads and exports finish, or
    /// `timeout` passes, then [`poll`](Self::poll).
    pub fn wait_for_background(&mut self, timeout: Duration) -> Vec<EngineEvent> {
        let deadline = Instant::now() + timeout;
        while self.awaiting_load.is_some()
            || self.awaiting_preload.is_some()
            || self.awaiting_export.is_some()
        {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                break;
            }
            match self.worker.recv_timeout(left) {
                Some(result) => self.apply_job(result),
                None => break,
            }
        }
        self.poll()
    }

    fn pump(&mut self, now: f64) {
        for knob in Knob::ALL {
            if let Some(value) = self.lanes[knob.index()].flush(now) {
                self.bridge.set_target(knob, value);
            }
        }

        for _ in 0..16 {
            let due = self.scheduler.take_due(now);
            if due.is_empty() {
                break;
            }
            for task in due {
                self.fire(task, now);
            }
        }

        while let Ok(retired) = self.retired.try_recv() {
            match retired {
                Retired::Voice(voice) => tracing::trace!(voice = voice.id(), "voice freed"),
                Retired::Effect(_) => tracing::trace!("send effect freed"),
            }
        }
    }

    fn apply_job(&mut self, result: JobResult) {
        match result {
            JobResult::Decoded {
                target: DecodeTarget::Next,
                generation,
                result,
            } => {
                if self.awaiting_preload != Some(generation) {
                    tracing::debug!(generation, "discarding superseded preload");
                    return;
                }
                self.awaiting_preload = None;
                match result {
                    Ok(track) => {
                        let duration = track.duration();
                        tracing::debug!(duration, "next track preloaded in background");
                        self.next = Some(track);
                        let now = self.now();
                        self.reschedule(now);
                        self.events.push(EngineEvent::NextTrackReady { duration });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "background preload failed");
                        self.events.push(EngineEvent::PreloadFailed(e));
                    }
                }
            }
            JobResult::Decoded {
                target: DecodeTarget::Current,
                generation,
                result,
            } => {
                if self.awaiting_load != Some(generation) {
                    tracing::debug!(generation, "discarding superseded decode");
                    return;
                }
                self.awaiting_load = None;
                match result {
                    Ok(track) => {
                        let now = self.now();
                        self.install(track, now);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "background load failed");
                        self.events.push(EngineEvent::LoadFailed(e));
                    }
                }
            }
            JobResult::Exported { generation, result } => {
                if self.awaiting_export != Some(generation) {
                    tracing::debug!(generation, "discarding superseded export");
                    return;
                }
                self.awaiting_export = None;
                self.events.push(EngineEvent::ExportFinished(result));
            }
        }
    }

    fn fire(&mut self, task: ScheduledTask, now: f64) {
        tracing::trace!(voice = task.voice, kind = ?task.kind, due = task.due, now, "task fired");
        match task.kind {
            TaskKind::BeginCrossfade => self.begin_crossfade(task.voice, now),
            TaskKind::FinishCrossfade => {
                if self
                    .crossfade
                    .is_some_and(|fade| fade.outgoing() == task.voice)
                {
                    self.complete_crossfade(now);
                }
            }
            TaskKind::TrackEnd => self.end_track(task.voice, now),
            TaskKind::StartNext => {
                let is_current = self
                    .current
                    .as_ref()
                    .is_some_and(|s| s.voice == Some(task.voice));
                if is_current && self.state == PlaybackState::Loaded {
                    self.play_at(now);
                }
            }
        }
    }

    // ── State machine internals ──────────────────────────────────────────

    fn play_at(&mut self, now: f64) {
        let resumable = match self.state {
            PlaybackState::Loaded | PlaybackState::Paused => true,
            PlaybackState::Idle => self.current.is_some(),
            PlaybackState::Playing | PlaybackState::Crossfading => false,
        };
        if !resumable {
            return;
        }
        let Some(mut session) = self.current.take() else {
            return;
        };
        let voice = match session.voice {
            Some(voice) => voice,
            None => {
                let start = session.transport.position(now);
                let voice = self.spawn_voice(&session.track, start, 1.0);
                session.voice = Some(voice);
                voice
            }
        };
        session.transport.play(now);
        self.current = Some(session);
        self.send(AudioCommand::Play(voice));
        self.set_state(PlaybackState::Playing);
        self.reschedule(now);
    }

    fn install(&mut self, track: PreparedTrack, now: f64) {
        self.teardown_voices();
        self.snap_params(now);
        let duration = track.duration();
        let voice = self.spawn_voice(&track, 0.0, 1.0);
        let transport = self.new_transport(duration, now);
        tracing::info!(
            duration,
            sample_rate = track.audio.sample_rate(),
            channels = track.audio.channel_count(),
            gain_db = track.loudness.gain_db,
            "track loaded"
        );
        self.current = Some(TrackSession {
            track,
            transport,
            voice: Some(voice),
        });
        self.events.push(EngineEvent::TrackLoaded { duration });
        self.set_state(PlaybackState::Loaded);
    }

    fn reschedule(&mut self, now: f64) {
        let Some(session) = self.current.as_ref() else {
            return;
        };
        let Some(voice) = session.voice else {
            return;
        };
        self.scheduler.cancel_kind(voice, TaskKind::BeginCrossfade);
        self.scheduler.cancel_kind(voice, TaskKind::TrackEnd);
        if self.state != PlaybackState::Playing || !session.transport.is_playing() {
            return;
        }

        let remaining = session.transport.remaining(now);
        let window = self.crossfade_secs();
        if self.next.is_some() && window > 0.0 {
            let at = crossfade_start(now, remaining, window);
            self.scheduler.schedule(voice, TaskKind::BeginCrossfade, at);
        } else {
            self.scheduler.schedule(voice, TaskKind::TrackEnd, now + remaining);
        }
    }

    fn begin_crossfade(&mut self, voice: VoiceId, now: f64) {
        let Some(session) = self.current.as_ref() else {
            return;
        };
        if self.state != PlaybackState::Playing
            || session.voice != Some(voice)
            || !session.transport.is_playing()
        {
            tracing::debug!(voice, "stale crossfade task ignored");
            return;
        }

        let remaining = session.transport.remaining(now);
        let window = self.crossfade_secs();
        if remaining > window + 1e-6 {
            self.reschedule(now);
            return;
        }
        let Some(next) = self.next.take() else {
            self.reschedule(now);
            return;
        };
        if remaining <= 0.0 {
            self.next = Some(next);
            self.end_track(voice, now);
            return;
        }

        let fade_ms = (remaining * 1000.0) as f32;
        let incoming = self.spawn_voice(&next, 0.0, 0.0);
        let mut transport = self.new_transport(next.duration(), now);
        transport.play(now);
        self.send(AudioCommand::Play(incoming));
        self.send(AudioCommand::Fade {
            voice: incoming,
            gain: 1.0,
            ms: fade_ms,
        });
        self.send(AudioCommand::Fade {
            voice,
            gain: 0.0,
            ms: fade_ms,
        });

        self.incoming = Some(TrackSession {
            track: next,
            transport,
            voice: Some(incoming),
        });
        self.crossfade = Some(CrossfadeSession::new(voice, incoming, now, remaining));
        self.scheduler
            .schedule(voice, TaskKind::FinishCrossfade, now + remaining);
        tracing::info!(outgoing = voice, incoming, secs = remaining, "crossfade started");
        self.events.push(EngineEvent::CrossfadeStarted {
            outgoing: voice,
            incoming,
        });
        self.set_state(PlaybackState::Crossfading);
    }

    fn complete_crossfade(&mut self, now: f64) {
        let Some(fade) = self.crossfade.take() else {
            return;
        };
        self.scheduler.cancel_voice(fade.outgoing());
        let ms = if fade.is_complete(now) {
            0.0
        } else {
            self.config.playback.seek_declick_ms
        };
        self.send(AudioCommand::Retire {
            voice: fade.outgoing(),
            ms,
        });
        self.send(AudioCommand::Fade {
            voice: fade.incoming(),
            gain: 1.0,
            ms,
        });

        match self.incoming.take() {
            Some(session) => {
                let duration = session.transport.duration();
                self.current = Some(session);
                tracing::info!(voice = fade.incoming(), duration, "crossfade complete");
                self.events.push(EngineEvent::TrackChanged { duration });
                self.set_state(PlaybackState::Playing);
                self.reschedule(now);
            }
            None => {
                self.current = None;
                self.set_state(PlaybackState::Idle);
            }
        }
    }

    fn end_track(&mut self, voice: VoiceId, now: f64) {
        let Some(session) = self.current.as_ref() else {
            return;
        };
        if self.state != PlaybackState::Playing || session.voice != Some(voice) {
            return;
        }
        if !session.transport.is_finished(now) {
            self.reschedule(now);
            return;
        }

        self.scheduler.cancel_voice(voice);
        self.send(AudioCommand::Retire { voice, ms: 0.0 });
        self.events.push(EngineEvent::TrackEnded);
        tracing::debug!(voice, "track ended");

        match self.next.take() {
            Some(next) => {
                let duration = next.duration();
                let incoming = self.spawn_voice(&next, 0.0, 1.0);
                let transport = self.new_transport(duration, now);
                self.current = Some(TrackSession {
                    track: next,
                    transport,
                    voice: Some(incoming),
                });
                self.events.push(EngineEvent::TrackChanged { duration });
                self.set_state(PlaybackState::Loaded);
                let gap = f64::from(self.config.playback.gap_ms) / 1000.0;
                self.scheduler
                    .schedule(incoming, TaskKind::StartNext, now + gap);
            }
            None => {
                if let Some(session) = self.current.as_mut() {
                    session.transport.stop();
                    session.voice = None;
                }
                self.set_state(PlaybackState::Idle);
            }
        }
    }

    fn apply_rate(&mut self, rate: f32, now: f64) {
        self.send(AudioCommand::SetRate(rate));
        let rate = f64::from(rate);
        for session in self.current.iter_mut().chain(self.incoming.iter_mut()) {
            session.transport.set_rate(rate, now);
        }
        self.reschedule(now);
    }

    fn teardown_voices(&mut self) {
        self.scheduler.cancel_all();
        self.crossfade = None;
        self.incoming = None;
        self.send(AudioCommand::RetireAll {
            ms: self.config.playback.seek_declick_ms,
        });
    }

    fn snap_params(&mut self, now: f64) {
        for knob in Knob::ALL {
            let lane = &mut self.lanes[knob.index()];
            lane.snap(now);
            self.bridge.set_target(knob, lane.target());
        }
        self.bridge.request_snap();
    }

    fn spawn_voice(&mut self, track: &PreparedTrack, start_secs: f64, fade: f32) -> VoiceId {
        let id = self.next_voice_id;
        self.next_voice_id += 1;

        let ctx = GraphContext::new(
            Arc::clone(&self.topology),
            self.kernels.get(&self.room, self.output_rate),
            self.config.automation.ramps.clone(),
            self.output_rate as f32,
        );
        let graph = SignalGraph::new(&ctx, track.loudness.gain_linear(), &self.bridge.snapshot());
        let mut voice = Voice::new(
            id,
            Arc::clone(&track.audio),
            graph,
            self.output_rate as f32,
            self.config.playback.seek_declick_ms,
        );
        voice.set_fade(fade);
        voice.set_rate(self.params.get(Knob::Speed));
        if start_secs > 0.0 {
            voice.seek(start_secs);
        }
        self.send(AudioCommand::Start(Box::new(voice)));
        tracing::debug!(voice = id, start_secs, "voice created");
        id
    }

    fn new_transport(&self, duration: f64, now: f64) -> Transport {
        let mut transport = Transport::new(duration);
        transport.set_rate(f64::from(self.params.get(Knob::Speed)), now);
        transport
    }

    fn live_voices(&self) -> Vec<VoiceId> {
        self.current
            .iter()
            .chain(self.incoming.iter())
            .filter_map(|s| s.voice)
            .collect()
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            tracing::debug!(from = %self.state, to = %state, "state change");
            self.state = state;
            self.events.push(EngineEvent::StateChanged(state));
        }
    }

    fn send(&self, command: AudioCommand) {
        if self.commands.send(command).is_err() {
            tracing::debug!("audio thread gone, command dropped");
        }
    }

    fn now(&self) -> f64 {
        self.clock.now()
    }

    // ── Session ──────────────────────────────────────────────────────────

    /// Render one buffer of interleaved stereo output on a headless engine.
    ///
    /// Returns `false` on a device-backed engine or after shutdown.
    pub fn pull_output(&self, buffer: &mut [f32]) -> bool {
        self.null.as_ref().is_some_and(|null| null.pull(buffer))
    }

    /// Output sample rate.
    pub fn output_sample_rate(&self) -> u32 {
        self.output_rate
    }

    /// Name of the output backend.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Live configuration, including changes made through setters.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Close the output stream. Safe to call repeatedly; also runs on drop.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.scheduler.cancel_all();
        self.crossfade = None;
        self.incoming = None;
        self.send(AudioCommand::RetireAll { ms: 0.0 });
        self.stream.take();
        tracing::info!("engine shut down");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("backend", &self.backend.name())
            .field("output_rate", &self.output_rate)
            .field("state", &self.state)
            .field("current", &self.current)
            .field("crossfade", &self.crossfade)
            .field("room", &self.room.name)
            .field("topology", &self.topology)
            .finish_non_exhaustive()
    }
}
