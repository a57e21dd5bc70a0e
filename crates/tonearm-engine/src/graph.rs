//! Signal graph built from a [`GraphTopology`].
//!
//! ```text
//! input gain → pitch → EQ → bass → [distortion] → compressor
//!     → send bus: dry + delay + [modulation] + reverb
//!     → panner → limiter → master gain
//! ```
//!
//! Knob targets arrive once per buffer as a snapshot. Each knob restarts a
//! linear ramp toward a changed target from wherever it currently stands;
//! stages then read the ramped values once per control block of
//! [`CONTROL_BLOCK`] frames. Master gain and the send return gains are
//! interpolated per sample inside the block.
//!
//! Distortion and the modulation return are the only stages that switch in
//! and out of the path, and only once their level has ramped to zero. Their
//! internal state is cleared on disconnect, so reconnecting starts clean.
//! Every other stage stays wired in and is neutral at its neutral setting.

use std::fmt;
use std::sync::Arc;

use tonearm_config::{ModulationMode, RampConfig};
use tonearm_core::{Effect, LinearSmoothedParam};
use tonearm_effects::{
    BassShelf, Chorus, Compressor, ConvolutionKernel, Convolver, Delay, Distortion, Flanger,
    GraphicEq, Limiter, Panner, Phaser, PitchShifter,
};

use crate::params::{KNOB_COUNT, Knob, ParamFrame};
use crate::topology::{GraphTopology, SendReturn, Stage};

/// Frames between stage parameter updates.
pub const CONTROL_BLOCK: usize = 64;

const DELAY_TIME_MS: f32 = 350.0;
const DELAY_FEEDBACK: f32 = 0.35;
const COMPRESSOR_RATIO: f32 = 4.0;
const COMPRESSOR_KNEE_DB: f32 = 6.0;

/// A boxed stage that can move to the audio thread.
pub type BoxedEffect = Box<dyn Effect + Send>;

/// Shared inputs for building graphs at one sample rate.
#[derive(Debug, Clone)]
pub struct GraphContext {
    /// Stage layout.
    pub topology: Arc<GraphTopology>,
    /// Reverb kernel.
    pub kernel: Arc<ConvolutionKernel>,
    /// Knob ramp windows.
    pub ramps: RampConfig,
    /// Processing rate in Hz.
    pub sample_rate: f32,
}

impl GraphContext {
    /// Bundle the inputs.
    pub fn new(
        topology: Arc<GraphTopology>,
        kernel: Arc<ConvolutionKernel>,
        ramps: RampConfig,
        sample_rate: f32,
    ) -> Self {
        Self {
            topology,
            kernel,
            ramps,
            sample_rate,
        }
    }

    /// Fresh effect for one send return.
    pub fn send_effect(&self, send: SendReturn) -> BoxedEffect {
        match send {
            SendReturn::Delay => {
                let mut delay = Delay::new(self.sample_rate);
                delay.set_delay_time_ms(DELAY_TIME_MS);
                delay.set_feedback(DELAY_FEEDBACK);
                delay.set_mix(1.0);
                delay.reset();
                Box::new(delay)
            }
            SendReturn::Modulation => modulation_effect(self.topology.modulation(), self.sample_rate),
            SendReturn::Reverb => Box::new(Convolver::new(Arc::clone(&self.kernel))),
        }
    }
}

/// Fully wet modulation effect of the given flavour.
pub fn modulation_effect(mode: ModulationMode, sample_rate: f32) -> BoxedEffect {
    match mode {
        ModulationMode::Chorus => {
            let mut chorus = Chorus::new(sample_rate);
            chorus.set_mix(1.0);
            Box::new(chorus)
        }
        ModulationMode::Flanger => {
            let mut flanger = Flanger::new(sample_rate);
            flanger.set_mix(1.0);
            Box::new(flanger)
        }
        ModulationMode::Phaser => {
            let mut phaser = Phaser::new(sample_rate);
            phaser.set_mix(1.0);
            Box::new(phaser)
        }
    }
}

fn send_slot(send: SendReturn) -> usize {
    match send {
        SendReturn::Delay => 0,
        SendReturn::Modulation => 1,
        SendReturn::Reverb => 2,
    }
}

/// One voice's instance of the signal graph.
pub struct SignalGraph {
    topology: Arc<GraphTopology>,
    input_gain: f32,
    knobs: [LinearSmoothedParam; KNOB_COUNT],
    windows_ms: [f32; KNOB_COUNT],
    targets: [f32; KNOB_COUNT],
    frame: ParamFrame,
    prev_frame: ParamFrame,

    pitch: PitchShifter,
    eq: GraphicEq,
    bass: BassShelf,
    distortion: Distortion,
    distortion_live: bool,
    compressor: Compressor,
    sends: [BoxedEffect; 3],
    sends_live: [bool; 3],
    panner: Panner,
    limiter: Limiter,

    dry_l: Vec<f32>,
    dry_r: Vec<f32>,
    wet_l: Vec<f32>,
    wet_r: Vec<f32>,
}

impl SignalGraph {
    /// Build every stage and settle it at `initial`.
    pub fn new(ctx: &GraphContext, input_gain: f32, initial: &[f32; KNOB_COUNT]) -> Self {
        let sr = ctx.sample_rate;
        let windows_ms = Knob::ALL.map(|k| k.ramp().window_ms(&ctx.ramps));
        let targets = std::array::from_fn(|i| Knob::ALL[i].clamp(initial[i]));
        let knobs = std::array::from_fn(|i| LinearSmoothedParam::with_config(targets[i], sr, windows_ms[i]));
        let frame = ParamFrame::from_values(&targets);

        let mut compressor = Compressor::new(sr);
        compressor.set_ratio(COMPRESSOR_RATIO);
        compressor.set_knee_db(COMPRESSOR_KNEE_DB);

        let mut graph = Self {
            topology: Arc::clone(&ctx.topology),
            input_gain,
            knobs,
            windows_ms,
            targets,
            frame,
            prev_frame: frame,
            pitch: PitchShifter::new(sr),
            eq: GraphicEq::new(sr),
            bass: BassShelf::new(sr),
            distortion: Distortion::new(sr),
            distortion_live: false,
            compressor,
            sends: [
                ctx.send_effect(SendReturn::Delay),
                ctx.send_effect(SendReturn::Modulation),
                ctx.send_effect(SendReturn::Reverb),
            ],
            sends_live: [false; 3],
            panner: Panner::new(sr),
            limiter: Limiter::new(sr),
            dry_l: vec![0.0; CONTROL_BLOCK],
            dry_r: vec![0.0; CONTROL_BLOCK],
            wet_l: vec![0.0; CONTROL_BLOCK],
            wet_r: vec![0.0; CONTROL_BLOCK],
        };
        graph.apply_frame();
        graph.reset();
        graph
    }

    /// Process a stereo block in place.
    ///
    /// `targets` is the knob snapshot for this block; any knob whose target
    /// changed since the last call starts a new ramp.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32], targets: &[f32; KNOB_COUNT]) {
        self.set_targets(targets);
        self.process_block(left, right);
    }

    /// Process a stereo block in place with the targets already set.
    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len());
        for (l, r) in left
            .chunks_mut(CONTROL_BLOCK)
            .zip(right.chunks_mut(CONTROL_BLOCK))
        {
            self.process_chunk(l, r);
        }
    }

    /// Take a knob snapshot, restarting ramps for changed targets.
    pub fn set_targets(&mut self, targets: &[f32; KNOB_COUNT]) {
        for (i, knob) in Knob::ALL.iter().enumerate() {
            let target = knob.clamp(targets[i]);
            if target != self.targets[i] {
                self.targets[i] = target;
                self.knobs[i].ramp_to(target, self.windows_ms[i]);
            }
        }
    }

    fn process_chunk(&mut self, left: &mut [f32], right: &mut [f32]) {
        let n = left.len();
        let volume = Knob::Volume.index();
        let values: [f32; KNOB_COUNT] = std::array::from_fn(|i| {
            if i == volume {
                self.knobs[i].get()
            } else {
                self.knobs[i].advance_by(n as u32)
            }
        });
        self.prev_frame = self.frame;
        self.frame = ParamFrame::from_values(&values);
        self.apply_frame();

        let topology = Arc::clone(&self.topology);
        for stage in topology.stages() {
            match stage {
                Stage::InputGain => {
                    if self.input_gain != 1.0 {
                        left.iter_mut().for_each(|s| *s *= self.input_gain);
                        right.iter_mut().for_each(|s| *s *= self.input_gain);
                    }
                }
                Stage::PitchShift => self.pitch.process_block_stereo(left, right),
                Stage::Equalizer => self.eq.process_block_stereo(left, right),
                Stage::BassShelf => self.bass.process_block_stereo(left, right),
                Stage::Distortion => self.process_distortion(left, right),
                Stage::Compressor => self.compressor.process_block_stereo(left, right),
                Stage::SendBus => self.process_sends(left, right),
                Stage::Panner => self.panner.process_block_stereo(left, right),
                Stage::Limiter => self.limiter.process_block_stereo(left, right),
                Stage::MasterGain => {
                    let knob = &mut self.knobs[volume];
                    for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                        let gain = knob.advance() / 100.0;
                        *l *= gain;
                        *r *= gain;
                    }
                }
            }
        }
        if !topology.contains(Stage::MasterGain) {
            self.knobs[volume].advance_by(n as u32);
        }
    }

    fn apply_frame(&mut self) {
        let f = self.frame;
        self.pitch.set_semitones(f.pitch_semitones);
        self.eq.set_gains(&f.eq_gains_db);
        self.bass.set_gain_db(f.bass_db);
        self.distortion.set_drive_db(f.drive_db);
        self.compressor.set_threshold_db(f.compressor_threshold_db);
        self.panner.set_pan(f.pan);
        self.panner.set_azimuth(f.azimuth_deg);
    }

    fn process_distortion(&mut self, left: &mut [f32], right: &mut [f32]) {
        let (w0, w1) = (self.prev_frame.distortion_wet, self.frame.distortion_wet);
        if w0 <= 0.0 && w1 <= 0.0 {
            if self.distortion_live {
                self.distortion.reset();
                self.distortion_live = false;
            }
            return;
        }
        self.distortion_live = true;
        let n = left.len();
        let (dl, dr) = (&mut self.dry_l[..n], &mut self.dry_r[..n]);
        dl.copy_from_slice(left);
        dr.copy_from_slice(right);
        self.distortion.process_block_stereo(left, right);
        for i in 0..n {
            let wet = ramp_at(w0, w1, i, n);
            left[i] = dl[i] + (left[i] - dl[i]) * wet;
            right[i] = dr[i] + (right[i] - dr[i]) * wet;
        }
    }

    fn process_sends(&mut self, left: &mut [f32], right: &mut [f32]) {
        let n = left.len();
        let Self {
            topology,
            sends,
            sends_live,
            prev_frame,
            frame,
            dry_l,
            dry_r,
            wet_l,
            wet_r,
            ..
        } = self;
        let (dry_l, dry_r) = (&mut dry_l[..n], &mut dry_r[..n]);
        dry_l.copy_from_slice(left);
        dry_r.copy_from_slice(right);

        for &send in topology.sends() {
            let slot = send_slot(send);
            let (g0, g1) = match send {
                SendReturn::Delay => (prev_frame.delay_return, frame.delay_return),
                SendReturn::Modulation => (prev_frame.modulation_return, frame.modulation_return),
                SendReturn::Reverb => (prev_frame.reverb_return, frame.reverb_return),
            };
            let silent = g0 <= 0.0 && g1 <= 0.0;
            if silent && send.switchable() {
                if sends_live[slot] {
                    sends[slot].reset();
                    sends_live[slot] = false;
                }
                continue;
            }
            sends_live[slot] = true;

            let (wl, wr) = (&mut wet_l[..n], &mut wet_r[..n]);
            wl.copy_from_slice(dry_l);
            wr.copy_from_slice(dry_r);
            sends[slot].process_block_stereo(wl, wr);
            if silent {
                continue;
            }
            for i in 0..n {
                let gain = ramp_at(g0, g1, i, n);
                left[i] += wl[i] * gain;
                right[i] += wr[i] * gain;
            }
        }
    }

    /// Jump every knob to `targets` without ramping.
    pub fn snap(&mut self, targets: &[f32; KNOB_COUNT]) {
        for (i, knob) in Knob::ALL.iter().enumerate() {
            let value = knob.clamp(targets[i]);
            self.targets[i] = value;
            self.knobs[i].set_immediate(value);
        }
        self.frame = ParamFrame::from_values(&self.targets);
        self.prev_frame = self.frame;
        self.apply_frame();
    }

    /// Clear all stage state and settle knobs at their targets.
    pub fn reset(&mut self) {
        for knob in &mut self.knobs {
            knob.snap_to_target();
        }
        self.pitch.reset();
        self.eq.reset();
        self.bass.reset();
        self.distortion.reset();
        self.compressor.reset();
        for send in &mut self.sends {
            send.reset();
        }
        self.panner.reset();
        self.limiter.reset();
        self.distortion_live = self.frame.distortion_connected();
        self.sends_live = [false; 3];
    }

    /// Put a new effect on a send return and hand back the old one.
    ///
    /// The old effect is returned rather than dropped so the caller can
    /// free it off the audio thread.
    pub fn swap_send(&mut self, send: SendReturn, effect: BoxedEffect) -> BoxedEffect {
        let slot = send_slot(send);
        self.sends_live[slot] = false;
        std::mem::replace(&mut self.sends[slot], effect)
    }

    /// Whether `stage` processed signal in the last block.
    pub fn is_connected(&self, stage: Stage) -> bool {
        match stage {
            Stage::Distortion => self.distortion_live && self.topology.contains(stage),
            _ => self.topology.contains(stage),
        }
    }

    /// Whether the return for `send` is in the path.
    pub fn send_connected(&self, send: SendReturn) -> bool {
        if send.switchable() {
            self.sends_live[send_slot(send)]
        } else {
            self.topology.sends().contains(&send)
        }
    }

    /// Stages currently in the path, in order.
    pub fn connected_stages(&self) -> Vec<Stage> {
        self.topology
            .stages()
            .iter()
            .copied()
            .filter(|&s| self.is_connected(s))
            .collect()
    }

    /// Whether the EQ is skipping its filter bank.
    pub fn eq_bypassed(&self) -> bool {
        self.eq.is_bypassed()
    }

    /// Current (ramped) value of `knob`.
    pub fn knob_value(&self, knob: Knob) -> f32 {
        self.knobs[knob.index()].get()
    }

    /// Stage settings in effect.
    pub fn frame(&self) -> &ParamFrame {
        &self.frame
    }

    /// The layout this graph was built from.
    pub fn topology(&self) -> &Arc<GraphTopology> {
        &self.topology
    }

    /// Linear input gain.
    pub fn input_gain(&self) -> f32 {
        self.input_gain
    }
}

impl fmt::Debug for SignalGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalGraph")
            .field("topology", &self.topology.to_string())
            .field("input_gain", &self.input_gain)
            .field("sends_live", &self.sends_live)
            .field("distortion_live", &self.distortion_live)
            .finish_non_exhaustive()
    }
}

#[inline]
fn ramp_at(from: f32, to: f32, i: usize, n: usize) -> f32 {
    from + (to - from) * (i + 1) as f32 / n as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::EffectParameterSet;

    const SR: f32 = 48000.0;

    fn context(modulation: ModulationMode) -> GraphContext {
        let kernel = ConvolutionKernel::mono(&[0.5, 0.25], 64);
        GraphContext::new(
            Arc::new(GraphTopology::standard(modulation)),
            Arc::new(kernel),
            RampConfig::default(),
            SR,
        )
    }

    fn sine(n: usize, amplitude: f32) -> Vec<f32> {
        (0..n)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / SR).sin())
            .collect()
    }

    #[test]
    fn test_neutral_graph_only_applies_volume() {
        let params = EffectParameterSet::default();
        let mut graph = SignalGraph::new(&context(ModulationMode::Chorus), 1.0, params.values());
        let input = sine(4096, 0.25);
        let mut l = input.clone();
        let mut r = input.clone();
        graph.process(&mut l, &mut r, params.values());
        for (i, (&x, &y)) in input.iter().zip(&l).enumerate() {
            assert!((x * 0.8 - y).abs() < 1e-5, "sample {i}: {x} -> {y}");
        }
        assert_eq!(l, r);
        assert!(graph.eq_bypassed());
        assert!(!graph.is_connected(Stage::Distortion));
        assert!(graph.send_connected(SendReturn::Reverb));
        assert!(graph.send_connected(SendReturn::Delay));
        assert!(!graph.send_connected(SendReturn::Modulation));
    }

    #[test]
    fn test_input_gain_applied() {
        let params = EffectParameterSet::with_volume(100.0);
        let mut graph = SignalGraph::new(&context(ModulationMode::Chorus), 0.5, params.values());
        let mut l = vec![0.2; 128];
        let mut r = vec![0.2; 128];
        graph.process(&mut l, &mut r, params.values());
        assert!((l[127] - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_volume_ramps_monotonically() {
        let mut params = EffectParameterSet::with_volume(100.0);
        let mut graph = SignalGraph::new(&context(ModulationMode::Chorus), 1.0, params.values());
        params.set(Knob::Volume, 20.0);
        let mut l = vec![0.5; 4800];
        let mut r = vec![0.5; 4800];
        graph.process(&mut l, &mut r, params.values());
        for pair in l.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-7);
        }
        // 30 ms at 48 kHz is 1440 samples.
        assert!((l[1500] - 0.1).abs() < 1e-5, "{}", l[1500]);
        assert!(l[100] > 0.3);
    }

    #[test]
    fn test_distortion_connects_only_above_zero() {
        let mut params = EffectParameterSet::default();
        let mut graph = SignalGraph::new(&context(ModulationMode::Chorus), 1.0, params.values());
        let mut l = sine(512, 0.3);
        let mut r = l.clone();
        graph.process(&mut l, &mut r, params.values());
        assert!(!graph.connected_stages().contains(&Stage::Distortion));

        params.set(Knob::Distortion, 60.0);
        graph.process(&mut l, &mut r, params.values());
        assert!(graph.connected_stages().contains(&Stage::Distortion));

        params.set(Knob::Distortion, 0.0);
        let mut l = sine(4800, 0.3);
        let mut r = l.clone();
        graph.process(&mut l, &mut r, params.values());
        assert!(!graph.is_connected(Stage::Distortion));
    }

    #[test]
    fn test_reverb_return_adds_wet_signal() {
        let mut params = EffectParameterSet::with_volume(100.0);
        params.set(Knob::ReverbMix, 100.0);
        let mut graph = SignalGraph::new(&context(ModulationMode::Chorus), 1.0, params.values());
        let mut l = vec![0.0; 256];
        let mut r = vec![0.0; 256];
        l[0] = 0.5;
        r[0] = 0.5;
        graph.process(&mut l, &mut r, params.values());
        assert!(graph.send_connected(SendReturn::Reverb));
        // Dry impulse, then the kernel's taps one convolver block later.
        assert!((l[0] - 0.5).abs() < 1e-5);
        assert!((l[64] - 0.25).abs() < 1e-4, "{}", l[64]);
        assert!((l[65] - 0.125).abs() < 1e-4, "{}", l[65]);
    }

    #[test]
    fn test_reverb_keeps_running_at_zero_mix() {
        let mut params = EffectParameterSet::with_volume(100.0);
        let mut graph = SignalGraph::new(&context(ModulationMode::Chorus), 1.0, params.values());
        let mut l = vec![0.0; 32];
        let mut r = vec![0.0; 32];
        l[0] = 0.5;
        r[0] = 0.5;
        graph.process(&mut l, &mut r, params.values());
        assert!((l[0] - 0.5).abs() < 1e-5);
        assert!(l[1..].iter().all(|&s| s.abs() < 1e-6));

        // The impulse went in while the return was silent; its tail comes
        // out once the mix is raised.
        params.set(Knob::ReverbMix, 100.0);
        graph.snap(params.values());
        let mut l = vec![0.0; 64];
        let mut r = vec![0.0; 64];
        graph.process(&mut l, &mut r, params.values());
        assert!((l[32] - 0.25).abs() < 1e-4, "{}", l[32]);
        assert!((l[33] - 0.125).abs() < 1e-4, "{}", l[33]);
    }

    #[test]
    fn test_modulation_return_disconnects_at_zero() {
        let mut params = EffectParameterSet::with_volume(100.0);
        params.set(Knob::ChorusMix, 50.0);
        let mut graph = SignalGraph::new(&context(ModulationMode::Chorus), 1.0, params.values());
        let mut l = sine(512, 0.2);
        let mut r = l.clone();
        graph.process(&mut l, &mut r, params.values());
        assert!(graph.send_connected(SendReturn::Modulation));

        params.set(Knob::ChorusMix, 0.0);
        params.set(Knob::DelayMix, 0.0);
        graph.snap(params.values());
        let mut l = sine(512, 0.2);
        let mut r = l.clone();
        graph.process(&mut l, &mut r, params.values());
        assert!(!graph.send_connected(SendReturn::Modulation));
        assert!(graph.send_connected(SendReturn::Delay));
    }

    #[test]
    fn test_eq_gain_engages_bank() {
        let mut params = EffectParameterSet::default();
        params.set(Knob::EqBand(5), 6.0);
        let mut graph = SignalGraph::new(&context(ModulationMode::Chorus), 1.0, params.values());
        let mut l = sine(256, 0.1);
        let mut r = l.clone();
        graph.process(&mut l, &mut r, params.values());
        assert!(!graph.eq_bypassed());
    }

    #[test]
    fn test_swap_send_returns_previous_effect() {
        let ctx = context(ModulationMode::Chorus);
        let params = EffectParameterSet::default();
        let mut graph = SignalGraph::new(&ctx, 1.0, params.values());
        let old = graph.swap_send(
            SendReturn::Modulation,
            modulation_effect(ModulationMode::Phaser, SR),
        );
        assert_eq!(old.latency_samples(), 0);
    }

    #[test]
    fn test_hot_settings_stay_bounded() {
        let mut params = EffectParameterSet::with_volume(100.0);
        for knob in Knob::ALL {
            let (_, max) = knob.range();
            params.set(knob, max);
        }
        let mut graph = SignalGraph::new(&context(ModulationMode::Flanger), 4.0, params.values());
        let mut l = sine(9600, 1.0);
        let mut r = l.clone();
        graph.process(&mut l, &mut r, params.values());
        for s in l.iter().chain(&r) {
            assert!(s.is_finite());
            assert!(s.abs() <= 1.0, "{s}");
        }
    }

    #[test]
    fn test_snap_skips_ramp() {
        let mut params = EffectParameterSet::with_volume(100.0);
        let mut graph = SignalGraph::new(&context(ModulationMode::Chorus), 1.0, params.values());
        params.set(Knob::Volume, 50.0);
        graph.snap(params.values());
        assert_eq!(graph.knob_value(Knob::Volume), 50.0);
        let mut l = vec![1.0; 64];
        let mut r = vec![1.0; 64];
        graph.process(&mut l, &mut r, params.values());
        assert!((l[0] - 0.5 * tonearm_core::db_to_linear(-0.3)).abs() < 1e-5);
    }
}
