//! Declarative description of the signal graph.
//!
//! A [`GraphTopology`] says which stages exist, in what order, and what
//! hangs off the send bus. It is evaluated only when a voice is connected or
//! the structure changes (modulation flavour); knob changes never touch it.
//! Stages whose knob sits at its neutral value stay in the list and pass
//! signal through unchanged.

use std::fmt;

use tonearm_config::ModulationMode;

use crate::error::{EngineError, Result};

/// A serial stage of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Loudness normalisation gain.
    InputGain,
    /// Duration-preserving pitch shift.
    PitchShift,
    /// Ten-band graphic EQ.
    Equalizer,
    /// 150 Hz low shelf.
    BassShelf,
    /// Waveshaper; connected only while its knob is above zero.
    Distortion,
    /// Soft-knee compressor.
    Compressor,
    /// Dry path plus the parallel returns.
    SendBus,
    /// Stereo balance and 3-D placement.
    Panner,
    /// Brickwall limiter.
    Limiter,
    /// Volume knob.
    MasterGain,
}

impl Stage {
    /// Short lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::InputGain => "input",
            Self::PitchShift => "pitch",
            Self::Equalizer => "eq",
            Self::BassShelf => "bass",
            Self::Distortion => "distortion",
            Self::Compressor => "compressor",
            Self::SendBus => "sends",
            Self::Panner => "panner",
            Self::Limiter => "limiter",
            Self::MasterGain => "master",
        }
    }
}

/// A parallel return on the send bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendReturn {
    /// Feedback echo.
    Delay,
    /// Chorus, flanger or phaser.
    Modulation,
    /// Convolution reverb.
    Reverb,
}

impl SendReturn {
    /// Short lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Delay => "delay",
            Self::Modulation => "modulation",
            Self::Reverb => "reverb",
        }
    }

    /// Whether the return leaves the path while its level is zero.
    ///
    /// Only the modulation return does. Delay and reverb keep processing at
    /// zero level, so their tails are intact when the mix comes back up.
    pub fn switchable(self) -> bool {
        matches!(self, Self::Modulation)
    }
}

/// Ordered stage list, send list and modulation flavour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphTopology {
    stages: Vec<Stage>,
    sends: Vec<SendReturn>,
    modulation: ModulationMode,
}

impl GraphTopology {
    /// The player's full chain.
    pub fn standard(modulation: ModulationMode) -> Self {
        Self {
            stages: vec![
                Stage::InputGain,
                Stage::PitchShift,
                Stage::Equalizer,
                Stage::BassShelf,
                Stage::Distortion,
                Stage::Compressor,
                Stage::SendBus,
                Stage::Panner,
                Stage::Limiter,
                Stage::MasterGain,
            ],
            sends: vec![SendReturn::Delay, SendReturn::Modulation, SendReturn::Reverb],
            modulation,
        }
    }

    /// Custom chain, validated.
    pub fn new(stages: Vec<Stage>, sends: Vec<SendReturn>, modulation: ModulationMode) -> Result<Self> {
        let topology = Self {
            stages,
            sends,
            modulation,
        };
        topology.validate()?;
        Ok(topology)
    }

    /// Reject chains the graph builder cannot wire.
    ///
    /// Stages and sends must be unique, the chain must end in
    /// [`Stage::MasterGain`], [`Stage::InputGain`] may only come first, and
    /// sends need a [`Stage::SendBus`] to hang off.
    pub fn validate(&self) -> Result<()> {
        for (i, stage) in self.stages.iter().enumerate() {
            if self.stages[..i].contains(stage) {
                return Err(EngineError::Topology(format!(
                    "stage '{}' appears twice",
                    stage.name()
                )));
            }
        }
        for (i, send) in self.sends.iter().enumerate() {
            if self.sends[..i].contains(send) {
                return Err(EngineError::Topology(format!(
                    "send '{}' appears twice",
                    send.name()
                )));
            }
        }
        if self.stages.last() != Some(&Stage::MasterGain) {
            return Err(EngineError::Topology(
                "chain must end in the master gain".to_string(),
            ));
        }
        if let Some(pos) = self.position(Stage::InputGain)
            && pos != 0
        {
            return Err(EngineError::Topology(
                "input gain must be the first stage".to_string(),
            ));
        }
        if !self.sends.is_empty() && !self.contains(Stage::SendBus) {
            return Err(EngineError::Topology(
                "returns configured without a send bus".to_string(),
            ));
        }
        Ok(())
    }

    /// Serial stages in processing order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Returns on the send bus.
    pub fn sends(&self) -> &[SendReturn] {
        &self.sends
    }

    /// Modulation flavour.
    pub fn modulation(&self) -> ModulationMode {
        self.modulation
    }

    /// Same structure with another modulation flavour.
    pub fn with_modulation(&self, modulation: ModulationMode) -> Self {
        Self {
            modulation,
            ..self.clone()
        }
    }

    /// Whether `stage` is in the chain.
    pub fn contains(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    /// Whether `send` hangs off the bus.
    pub fn has_send(&self, send: SendReturn) -> bool {
        self.sends.contains(&send)
    }

    fn position(&self, stage: Stage) -> Option<usize> {
        self.stages.iter().position(|s| *s == stage)
    }
}

impl Default for GraphTopology {
    fn default() -> Self {
        Self::standard(ModulationMode::default())
    }
}

impl fmt::Display for GraphTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            f.write_str(stage.name())?;
            if *stage == Stage::SendBus && !self.sends.is_empty() {
                f.write_str("[dry")?;
                for send in &self.sends {
                    match send {
                        SendReturn::Modulation => write!(f, " + {}", self.modulation.as_str())?,
                        other => write!(f, " + {}", other.name())?,
                    }
                }
                f.write_str("]")?;
            }
        }
        Ok(())
    }
}
