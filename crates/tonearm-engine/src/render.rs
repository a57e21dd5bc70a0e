//! The audio-thread side of the engine.
//!
//! [`RenderCore`] owns every live [`Voice`]. The control thread talks to it
//! only through [`AudioCommand`]s on a crossbeam channel and the atomic
//! [`ParamBridge`]; each callback drains pending commands, snapshots knob
//! targets once, renders every voice into a stereo mix, and interleaves the
//! mix into the device buffer. Voices that finish fading out, and effects
//! replaced by a send swap, are sent back on the retired channel so their
//! memory is freed on the control thread.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use crate::bridge::ParamBridge;
use crate::graph::BoxedEffect;
use crate::topology::SendReturn;
use crate::voice::{Voice, VoiceId};

/// Frames mixed per pass over the voices.
pub const MIX_BLOCK: usize = 1024;

/// Commands sent from the control thread to the audio thread.
pub enum AudioCommand {
    /// Add a voice. It starts in whatever state it was built in.
    Start(Box<Voice>),
    /// Start or resume a voice.
    Play(VoiceId),
    /// Pause a voice, keeping its position.
    Pause(VoiceId),
    /// Move a voice's read head.
    Seek {
        /// Target voice.
        voice: VoiceId,
        /// Position in seconds.
        secs: f64,
    },
    /// Set the playback rate of every voice.
    SetRate(f32),
    /// Ramp a voice's fade gain.
    Fade {
        /// Target voice.
        voice: VoiceId,
        /// Final gain, 0–1.
        gain: f32,
        /// Ramp length.
        ms: f32,
    },
    /// Fade a voice out and tear it down.
    Retire {
        /// Target voice.
        voice: VoiceId,
        /// Fade length.
        ms: f32,
    },
    /// Fade out and tear down every voice.
    RetireAll {
        /// Fade length.
        ms: f32,
    },
    /// Replace the effect on one send return of a voice's graph.
    SwapSend {
        /// Target voice.
        voice: VoiceId,
        /// Which return.
        send: SendReturn,
        /// New effect.
        effect: BoxedEffect,
    },
}

/// Objects handed back to the control thread for deallocation.
pub enum Retired {
    /// A voice that finished fading out.
    Voice(Box<Voice>),
    /// An effect displaced by [`AudioCommand::SwapSend`].
    Effect(BoxedEffect),
}

/// Renders all voices for the output callback.
pub struct RenderCore {
    commands: Receiver<AudioCommand>,
    retired: Sender<Retired>,
    bridge: Arc<ParamBridge>,
    voices: Vec<Box<Voice>>,
    snap_epoch: u32,
    channels: usize,
    mix_l: Vec<f32>,
    mix_r: Vec<f32>,
}

impl RenderCore {
    /// Core writing `channels` interleaved channels.
    pub fn new(
        commands: Receiver<AudioCommand>,
        retired: Sender<Retired>,
        bridge: Arc<ParamBridge>,
        channels: u16,
    ) -> Self {
        Self {
            commands,
            retired,
            snap_epoch: bridge.snap_epoch(),
            bridge,
            voices: Vec::with_capacity(8),
            channels: usize::from(channels.max(1)),
            mix_l: vec![0.0; MIX_BLOCK],
            mix_r: vec![0.0; MIX_BLOCK],
        }
    }

    /// Number of live voices.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Live voice by id.
    pub fn voice(&self, id: VoiceId) -> Option<&Voice> {
        self.voices.iter().find(|v| v.id() == id).map(AsRef::as_ref)
    }

    /// Fill an interleaved output buffer.
    pub fn render(&mut self, output: &mut [f32]) {
        self.drain_commands();

        let targets = self.bridge.snapshot();
        let epoch = self.bridge.snap_epoch();
        if epoch != self.snap_epoch {
            self.snap_epoch = epoch;
            for voice in &mut self.voices {
                voice.snap_params(&targets);
            }
        }

        let channels = self.channels;
        for chunk in output.chunks_mut(MIX_BLOCK * channels) {
            let frames = chunk.len() / channels;
            let (mix_l, mix_r) = (&mut self.mix_l[..frames], &mut self.mix_r[..frames]);
            mix_l.fill(0.0);
            mix_r.fill(0.0);
            for voice in &mut self.voices {
                voice.render_add(mix_l, mix_r, &targets);
            }

            for (i, frame) in chunk.chunks_exact_mut(channels).enumerate() {
                if channels == 1 {
                    frame[0] = (mix_l[i] + mix_r[i]) * 0.5;
                } else {
                    frame[0] = mix_l[i];
                    frame[1] = mix_r[i];
                    frame[2..].fill(0.0);
                }
            }
        }

        self.collect_finished();
    }

    fn drain_commands(&mut self) {
        while let Ok(cmd) = self.commands.try_recv() {
            match cmd {
                AudioCommand::Start(voice) => self.voices.push(voice),
                AudioCommand::Play(id) => {
                    if let Some(v) = self.find(id) {
                        v.play();
                    }
                }
                AudioCommand::Pause(id) => {
                    if let Some(v) = self.find(id) {
                        v.pause();
                    }
                }
                AudioCommand::Seek { voice, secs } => {
                    if let Some(v) = self.find(voice) {
                        v.seek(secs);
                    }
                }
                AudioCommand::SetRate(rate) => {
                    for v in &mut self.voices {
                        v.set_rate(rate);
                    }
                }
                AudioCommand::Fade { voice, gain, ms } => {
                    if let Some(v) = self.find(voice) {
                        v.fade_to(gain, ms);
                    }
                }
                AudioCommand::Retire { voice, ms } => {
                    if let Some(v) = self.find(voice) {
                        v.retire(ms);
                    }
                }
                AudioCommand::RetireAll { ms } => {
                    for v in &mut self.voices {
                        v.retire(ms);
                    }
                }
                AudioCommand::SwapSend {
                    voice,
                    send,
                    effect,
                } => match self.find(voice) {
                    Some(v) => {
                        let old = v.graph_mut().swap_send(send, effect);
                        let _ = self.retired.send(Retired::Effect(old));
                    }
                    None => {
                        let _ = self.retired.send(Retired::Effect(effect));
                    }
                },
            }
        }
    }

    fn find(&mut self, id: VoiceId) -> Option<&mut Voice> {
        self.voices
            .iter_mut()
            .find(|v| v.id() == id)
            .map(AsMut::as_mut)
    }

    fn collect_finished(&mut self) {
        let mut i = 0;
        while i < self.voices.len() {
            if self.voices[i].is_done() {
                let voice = self.voices.swap_remove(i);
                let _ = self.retired.send(Retired::Voice(voice));
            } else {
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphContext, SignalGraph};
    use crate::params::{EffectParameterSet, Knob};
    use crate::topology::GraphTopology;
    use crossbeam_channel::unbounded;
    use tonearm_config::RampConfig;
    use tonearm_effects::ConvolutionKernel;
    use tonearm_io::DecodedAudio;

    const SR: f32 = 1000.0;

    struct Harness {
        core: RenderCore,
        tx: Sender<AudioCommand>,
        retired: Receiver<Retired>,
        bridge: Arc<ParamBridge>,
        params: EffectParameterSet,
    }

    fn harness() -> Harness {
        let params = EffectParameterSet::with_volume(100.0);
        let bridge = Arc::new(ParamBridge::new(params.values()));
        let (tx, rx) = unbounded();
        let (retired_tx, retired) = unbounded();
        Harness {
            core: RenderCore::new(rx, retired_tx, Arc::clone(&bridge), 2),
            tx,
            retired,
            bridge,
            params,
        }
    }

    fn voice(id: VoiceId, level: f32, params: &EffectParameterSet) -> Box<Voice> {
        let ctx = GraphContext::new(
            Arc::new(GraphTopology::default()),
            Arc::new(ConvolutionKernel::mono(&[1.0], 64)),
            RampConfig::default(),
            SR,
        );
        let graph = SignalGraph::new(&ctx, 1.0, params.values());
        let audio = DecodedAudio::from_planar(vec![vec![level; 5000]], SR as u32)
            .unwrap()
            .into_shared();
        Box::new(Voice::new(id, audio, graph, SR, 0.0))
    }

    #[test]
    fn test_commands_applied_before_render() {
        let mut h = harness();
        h.tx.send(AudioCommand::Start(voice(1, 0.25, &h.params))).unwrap();
        h.tx.send(AudioCommand::Play(1)).unwrap();
        let mut out = vec![0.0; 64];
        h.core.render(&mut out);
        assert_eq!(h.core.voice_count(), 1);
        assert!((out[0] - 0.25).abs() < 1e-5);
        assert!((out[1] - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_two_voices_sum() {
        let mut h = harness();
        h.tx.send(AudioCommand::Start(voice(1, 0.1, &h.params))).unwrap();
        h.tx.send(AudioCommand::Start(voice(2, 0.2, &h.params))).unwrap();
        h.tx.send(AudioCommand::Play(1)).unwrap();
        h.tx.send(AudioCommand::Play(2)).unwrap();
        let mut out = vec![0.0; 32];
        h.core.render(&mut out);
        assert!((out[10] - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_retired_voice_returned() {
        let mut h = harness();
        h.tx.send(AudioCommand::Start(voice(7, 0.1, &h.params))).unwrap();
        h.tx.send(AudioCommand::Retire { voice: 7, ms: 0.0 }).unwrap();
        let mut out = vec![0.0; 16];
        h.core.render(&mut out);
        assert_eq!(h.core.voice_count(), 0);
        assert!(matches!(h.retired.try_recv(), Ok(Retired::Voice(v)) if v.id() == 7));
    }

    #[test]
    fn test_unknown_voice_commands_ignored() {
        let mut h = harness();
        h.tx.send(AudioCommand::Pause(99)).unwrap();
        h.tx.send(AudioCommand::Retire { voice: 99, ms: 5.0 }).unwrap();
        let mut out = vec![1.0; 16];
        h.core.render(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_set_rate_reaches_every_voice() {
        let mut h = harness();
        h.tx.send(AudioCommand::Start(voice(1, 0.1, &h.params))).unwrap();
        h.tx.send(AudioCommand::Start(voice(2, 0.1, &h.params))).unwrap();
        h.tx.send(AudioCommand::SetRate(1.5)).unwrap();
        h.tx.send(AudioCommand::Play(1)).unwrap();
        h.tx.send(AudioCommand::Play(2)).unwrap();
        let mut out = vec![0.0; 200];
        h.core.render(&mut out);
        for id in [1, 2] {
            let v = h.core.voice(id).unwrap();
            assert_eq!(v.rate(), 1.5);
            assert!((v.position_secs() - 0.15).abs() < 1e-9);
        }
    }

    #[test]
    fn test_snap_epoch_skips_ramps() {
        let mut h = harness();
        h.tx.send(AudioCommand::Start(voice(1, 0.5, &h.params))).unwrap();
        h.tx.send(AudioCommand::Play(1)).unwrap();
        let mut out = vec![0.0; 64];
        h.core.render(&mut out);

        h.bridge.set_target(Knob::Volume, 50.0);
        h.bridge.request_snap();
        h.core.render(&mut out);
        assert!((out[0] - 0.25).abs() < 1e-5, "{}", out[0]);
    }

    #[test]
    fn test_mono_output_folds() {
        let params = EffectParameterSet::with_volume(100.0);
        let bridge = Arc::new(ParamBridge::new(params.values()));
        let (tx, rx) = unbounded();
        let (retired_tx, _retired) = unbounded();
        let mut core = RenderCore::new(rx, retired_tx, bridge, 1);
        tx.send(AudioCommand::Start(voice(1, 0.4, &params))).unwrap();
        tx.send(AudioCommand::Play(1)).unwrap();
        let mut out = vec![0.0; 8];
        core.render(&mut out);
        assert!((out[3] - 0.4).abs() < 1e-5);
    }
}
