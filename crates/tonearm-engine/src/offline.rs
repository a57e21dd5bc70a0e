//! Offline rendering and WAV export.
//!
//! An export replays the track through a fresh [`SignalGraph`] built from
//! the same topology and reverb kernel the live voices use, with every knob
//! fixed at its current target. The graph is driven by an ordinary
//! [`Voice`], so speed, interpolation and stage order match live playback
//! exactly; only the ramps are missing.

use std::sync::Arc;

use tonearm_config::RampConfig;
use tonearm_core::StereoSamples;
use tonearm_effects::ConvolutionKernel;
use tonearm_io::{DecodedAudio, encode_pcm16};

use crate::error::{EngineError, Result};
use crate::graph::{GraphContext, SignalGraph};
use crate::params::{KNOB_COUNT, Knob};
use crate::topology::GraphTopology;
use crate::voice::Voice;

/// Frames rendered between progress reports.
pub const RENDER_BLOCK: usize = 4096;

/// Everything an export needs, copied out of the engine.
#[derive(Debug, Clone)]
pub struct OfflineJob {
    /// Source track.
    pub audio: Arc<DecodedAudio>,
    /// Stage layout.
    pub topology: Arc<GraphTopology>,
    /// Reverb kernel at the source sample rate.
    pub kernel: Arc<ConvolutionKernel>,
    /// Knob values, held constant for the whole render.
    pub knobs: [f32; KNOB_COUNT],
    /// Loudness normalisation gain, linear.
    pub input_gain: f32,
    /// Ramp windows; only matter for the limiter and send switching.
    pub ramps: RampConfig,
}

/// Output length for `source_frames` played at `speed`.
pub fn output_frames(source_frames: usize, speed: f32) -> usize {
    let speed = f64::from(Knob::Speed.clamp(speed));
    (source_frames as f64 / speed).ceil() as usize
}

/// Render the job to a stereo buffer at the source sample rate.
///
/// The graph always runs in stereo; [`export_wav`] folds the result back to
/// the source's channel count. `progress` receives the completed fraction
/// after every block.
pub fn render_offline(job: &OfflineJob, mut progress: impl FnMut(f32)) -> Result<StereoSamples> {
    let sample_rate = job.audio.sample_rate() as f32;
    let speed = job.knobs[Knob::Speed.index()];
    let frames = output_frames(job.audio.frames(), speed);
    if frames == 0 {
        return Err(EngineError::Export("track has no frames".to_string()));
    }

    let ctx = GraphContext::new(
        Arc::clone(&job.topology),
        Arc::clone(&job.kernel),
        job.ramps.clone(),
        sample_rate,
    );
    let graph = SignalGraph::new(&ctx, job.input_gain, &job.knobs);
    let mut voice = Voice::new(0, Arc::clone(&job.audio), graph, sample_rate, 0.0);
    voice.set_rate(speed);
    voice.play();

    let mut out = StereoSamples::silence(frames);
    let mut done = 0usize;
    for (l, r) in out
        .left
        .chunks_mut(RENDER_BLOCK)
        .zip(out.right.chunks_mut(RENDER_BLOCK))
    {
        voice.render_add(l, r, &job.knobs);
        done += l.len();
        progress(done as f32 / frames as f32);
    }

    if out.left.iter().chain(&out.right).any(|s| !s.is_finite()) {
        return Err(EngineError::Export(
            "render produced non-finite samples".to_string(),
        ));
    }

    tracing::debug!(
        frames,
        sample_rate = job.audio.sample_rate(),
        "offline render complete"
    );
    Ok(out)
}

/// Planar channels matching the source layout: mono sources get the
/// average of both graph outputs.
pub fn source_channels(rendered: StereoSamples, channel_count: usize) -> Vec<Vec<f32>> {
    if channel_count == 1 {
        vec![rendered.to_mono()]
    } else {
        vec![rendered.left, rendered.right]
    }
}

/// Render the job and encode it as a 16-bit PCM WAV file in memory.
pub fn export_wav(job: &OfflineJob, progress: impl FnMut(f32)) -> Result<Vec<u8>> {
    let rendered = render_offline(job, progress)?;
    let channels = source_channels(rendered, job.audio.channel_count());
    let bytes = encode_pcm16(&channels, job.audio.sample_rate())
        .map_err(|e| EngineError::Export(e.to_string()))?;
    tracing::info!(
        bytes = bytes.len(),
        channels = channels.len(),
        "export encoded"
    );
    Ok(bytes)
}
