//! A playing instance of a decoded track.
//!
//! A voice reads its source at `rate × source_rate / output_rate` frames
//! per output frame with linear interpolation, runs the result through its
//! own [`SignalGraph`], and mixes into the output with two gains: the fade
//! gain (crossfades, teardown) and the declick gain (pause, seek).

use std::sync::Arc;

use tonearm_core::LinearSmoothedParam;
use tonearm_io::DecodedAudio;

use crate::graph::{CONTROL_BLOCK, SignalGraph};
use crate::params::{KNOB_COUNT, Knob};

/// Identifies a voice across threads.
pub type VoiceId = u64;

/// Source reader, graph and gains for one track.
#[derive(Debug)]
pub struct Voice {
    id: VoiceId,
    audio: Arc<DecodedAudio>,
    graph: SignalGraph,
    /// Read position in source frames.
    position: f64,
    /// Source frames per output frame at speed 1.
    step: f64,
    /// Playback rate. Follows the transport directly, with no ramp, so the
    /// read head and the reported position advance together.
    rate: f64,
    fade: LinearSmoothedParam,
    declick: LinearSmoothedParam,
    declick_ms: f32,
    playing: bool,
    retiring: bool,
    pending_seek: Option<f64>,
    buf_l: [f32; CONTROL_BLOCK],
    buf_r: [f32; CONTROL_BLOCK],
    gains: [f32; CONTROL_BLOCK],
}

impl Voice {
    /// Paused voice at the start of `audio`, fade gain 1.
    pub fn new(
        id: VoiceId,
        audio: Arc<DecodedAudio>,
        graph: SignalGraph,
        output_rate: f32,
        declick_ms: f32,
    ) -> Self {
        let step = f64::from(audio.sample_rate()) / f64::from(output_rate.max(1.0));
        Self {
            id,
            audio,
            graph,
            position: 0.0,
            step,
            rate: 1.0,
            fade: LinearSmoothedParam::with_config(1.0, output_rate, 0.0),
            declick: LinearSmoothedParam::with_config(0.0, output_rate, declick_ms),
            declick_ms,
            playing: false,
            retiring: false,
            pending_seek: None,
            buf_l: [0.0; CONTROL_BLOCK],
            buf_r: [0.0; CONTROL_BLOCK],
            gains: [0.0; CONTROL_BLOCK],
        }
    }

    /// Voice id.
    pub fn id(&self) -> VoiceId {
        self.id
    }

    /// The track this voice reads.
    pub fn audio(&self) -> &Arc<DecodedAudio> {
        &self.audio
    }

    /// The voice's graph.
    pub fn graph(&self) -> &SignalGraph {
        &self.graph
    }

    /// Mutable graph access, for send swaps and snaps.
    pub fn graph_mut(&mut self) -> &mut SignalGraph {
        &mut self.graph
    }

    /// Whether the voice is set to play.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Read position in seconds of source time.
    pub fn position_secs(&self) -> f64 {
        self.position / f64::from(self.audio.sample_rate())
    }

    /// Whether the read position is past the last frame.
    pub fn is_exhausted(&self) -> bool {
        self.position >= self.audio.frames() as f64
    }

    /// Set the playback rate, clamped to the speed range.
    pub fn set_rate(&mut self, rate: f32) {
        self.rate = f64::from(Knob::Speed.clamp(rate));
    }

    /// Current playback rate.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Current fade gain.
    pub fn fade_gain(&self) -> f32 {
        self.fade.get()
    }

    /// Start or resume, fading in over the declick window.
    pub fn play(&mut self) {
        self.playing = true;
        if self.pending_seek.is_none() {
            self.declick.ramp_to(1.0, self.declick_ms);
        }
    }

    /// Fade out over the declick window, then hold.
    pub fn pause(&mut self) {
        self.playing = false;
        self.declick.ramp_to(0.0, self.declick_ms);
    }

    /// Move the read head to `secs`.
    ///
    /// While audible, the jump waits for a declick fade-out and is followed
    /// by a fade-in.
    pub fn seek(&mut self, secs: f64) {
        let frame = (secs.max(0.0) * f64::from(self.audio.sample_rate())).min(self.audio.frames() as f64);
        if self.declick.get() > 0.0 || !self.declick.is_settled() {
            self.pending_seek = Some(frame);
            self.declick.ramp_to(0.0, self.declick_ms);
        } else {
            self.position = frame;
        }
    }

    /// Ramp the fade gain to `gain` over `ms`.
    pub fn fade_to(&mut self, gain: f32, ms: f32) {
        self.fade.ramp_to(gain.clamp(0.0, 1.0), ms);
    }

    /// Set the fade gain with no ramp.
    pub fn set_fade(&mut self, gain: f32) {
        self.fade.set_immediate(gain.clamp(0.0, 1.0));
    }

    /// Fade out over `ms`, after which the voice can be dropped.
    pub fn retire(&mut self, ms: f32) {
        self.retiring = true;
        self.fade_to(0.0, ms);
    }

    /// Whether the voice is marked for teardown.
    pub fn is_retiring(&self) -> bool {
        self.retiring
    }

    /// Retiring and fully faded out.
    pub fn is_done(&self) -> bool {
        self.retiring && self.fade.is_settled() && self.fade.get() <= 0.0
    }

    /// Jump every knob in the graph to `targets`.
    pub fn snap_params(&mut self, targets: &[f32; KNOB_COUNT]) {
        self.graph.snap(targets);
    }

    fn audible(&self) -> bool {
        self.playing || self.declick.get() > 0.0 || !self.declick.is_settled()
    }

    #[inline]
    fn read(&self, position: f64) -> (f32, f32) {
        let index = position as usize;
        let frac = (position - index as f64) as f32;
        let (l0, r0) = self.audio.frame(index);
        if frac == 0.0 {
            return (l0, r0);
        }
        let (l1, r1) = self.audio.frame(index + 1);
        (l0 + (l1 - l0) * frac, r0 + (r1 - r0) * frac)
    }

    /// Render and mix into `out_l`/`out_r`.
    pub fn render_add(&mut self, out_l: &mut [f32], out_r: &mut [f32], targets: &[f32; KNOB_COUNT]) {
        if !self.audible() && self.pending_seek.is_none() {
            return;
        }
        self.graph.set_targets(targets);

        for (chunk_l, chunk_r) in out_l
            .chunks_mut(CONTROL_BLOCK)
            .zip(out_r.chunks_mut(CONTROL_BLOCK))
        {
            let n = chunk_l.len();
            let increment = self.step * self.rate;
            for i in 0..n {
                if let Some(target) = self.pending_seek
                    && self.declick.is_settled()
                    && self.declick.get() <= 0.0
                {
                    self.position = target;
                    self.pending_seek = None;
                    if self.playing {
                        self.declick.ramp_to(1.0, self.declick_ms);
                    }
                }
                let (l, r) = if self.audible() {
                    let frame = self.read(self.position);
                    self.position += increment;
                    frame
                } else {
                    (0.0, 0.0)
                };
                self.buf_l[i] = l;
                self.buf_r[i] = r;
                self.gains[i] = self.fade.advance() * self.declick.advance();
            }

            self.graph
                .process_block(&mut self.buf_l[..n], &mut self.buf_r[..n]);
            for i in 0..n {
                chunk_l[i] += self.buf_l[i] * self.gains[i];
                chunk_r[i] += self.buf_r[i] * self.gains[i];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphContext;
    use crate::params::EffectParameterSet;
    use crate::topology::GraphTopology;
    use tonearm_config::RampConfig;
    use tonearm_effects::ConvolutionKernel;

    const SR: f32 = 1000.0;

    fn voice(samples: Vec<f32>, declick_ms: f32) -> (Voice, EffectParameterSet) {
        let params = EffectParameterSet::with_volume(100.0);
        let ctx = GraphContext::new(
            Arc::new(GraphTopology::default()),
            Arc::new(ConvolutionKernel::mono(&[1.0], 64)),
            RampConfig::default(),
            SR,
        );
        let graph = SignalGraph::new(&ctx, 1.0, params.values());
        let audio = DecodedAudio::from_planar(vec![samples], SR as u32).unwrap().into_shared();
        (Voice::new(1, audio, graph, SR, declick_ms), params)
    }

    fn render(voice: &mut Voice, params: &EffectParameterSet, n: usize) -> Vec<f32> {
        let mut l = vec![0.0; n];
        let mut r = vec![0.0; n];
        voice.render_add(&mut l, &mut r, params.values());
        l
    }

    fn ramp_signal(n: usize) -> Vec<f32> {
        (0..n).map(|i| i as f32 / n as f32 * 0.5).collect()
    }

    #[test]
    fn test_paused_voice_is_silent() {
        let (mut v, params) = voice(vec![0.5; 100], 0.0);
        assert!(render(&mut v, &params, 50).iter().all(|&s| s == 0.0));
        assert_eq!(v.position_secs(), 0.0);
    }

    #[test]
    fn test_plays_source_at_unity() {
        let source = ramp_signal(200);
        let (mut v, params) = voice(source.clone(), 0.0);
        v.play();
        let out = render(&mut v, &params, 100);
        for i in 0..100 {
            assert!((out[i] - source[i]).abs() < 1e-5, "{i}");
        }
        assert!((v.position_secs() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_speed_doubles_read_rate() {
        let (mut v, params) = voice(ramp_signal(1000), 0.0);
        v.set_rate(2.0);
        v.play();
        render(&mut v, &params, 128);
        assert!((v.position_secs() - 0.256).abs() < 1e-9);
    }

    #[test]
    fn test_rate_ignores_speed_knob_ramp() {
        // The speed knob target alone must not move the read head; only
        // set_rate does, and it takes effect on the next sample.
        let (mut v, mut params) = voice(ramp_signal(1000), 0.0);
        params.set(Knob::Speed, 2.0);
        v.play();
        render(&mut v, &params, 100);
        assert!((v.position_secs() - 0.1).abs() < 1e-9);

        v.set_rate(0.5);
        let out = render(&mut v, &params, 100);
        assert!((v.position_secs() - 0.15).abs() < 1e-9);
        let expected = ramp_signal(1000)[100];
        assert!((out[0] - expected).abs() < 1e-5);
    }

    #[test]
    fn test_source_rate_conversion() {
        let params = EffectParameterSet::with_volume(100.0);
        let ctx = GraphContext::new(
            Arc::new(GraphTopology::default()),
            Arc::new(ConvolutionKernel::mono(&[1.0], 64)),
            RampConfig::default(),
            2000.0,
        );
        let graph = SignalGraph::new(&ctx, 1.0, params.values());
        let audio = DecodedAudio::from_planar(vec![vec![0.1; 1000]], 1000).unwrap().into_shared();
        let mut v = Voice::new(2, audio, graph, 2000.0, 0.0);
        v.play();
        let mut l = vec![0.0; 200];
        let mut r = vec![0.0; 200];
        v.render_add(&mut l, &mut r, params.values());
        assert!((v.position_secs() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_retire_fades_to_done() {
        let (mut v, params) = voice(vec![0.5; 1000], 0.0);
        v.play();
        v.retire(50.0);
        assert!(!v.is_done());
        let out = render(&mut v, &params, 100);
        assert!(out[10] > out[40]);
        assert_eq!(out[60], 0.0);
        assert!(v.is_done());
    }

    #[test]
    fn test_seek_declicks_then_jumps() {
        let source = ramp_signal(1000);
        let (mut v, params) = voice(source.clone(), 10.0);
        v.play();
        render(&mut v, &params, 100);
        v.seek(0.5);
        let out = render(&mut v, &params, 100);
        // 10 ms at 1 kHz: ten samples down, jump, ten samples up.
        assert!(out[9].abs() < 1e-6);
        assert!((out[40] - source[500 + 30]).abs() < 0.01, "{}", out[40]);
    }

    #[test]
    fn test_seek_while_paused_is_immediate() {
        let (mut v, _) = voice(vec![0.0; 1000], 10.0);
        v.seek(0.25);
        assert!((v.position_secs() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_past_end_reads_silence() {
        let (mut v, params) = voice(vec![0.5; 10], 0.0);
        v.play();
        let out = render(&mut v, &params, 64);
        assert!(out[5] > 0.0);
        assert!(out[30].abs() < 1e-6);
        assert!(v.is_exhausted());
    }
}
