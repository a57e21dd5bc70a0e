//! Gated RMS loudness and the normalisation gain derived from it.
//!
//! The track is cut into 400 ms blocks. Blocks quieter than -70 dBFS are
//! dropped (absolute gate), then blocks more than 10 dB under the mean of
//! the survivors are dropped (relative gate). The mean power of what is left
//! is the measured level. Mean power is taken over every sample of every
//! channel in the block.

use tonearm_config::LoudnessConfig;
use tonearm_core::{db_to_linear, linear_to_db};
use tonearm_io::DecodedAudio;

/// Analysis block length.
pub const BLOCK_SECS: f64 = 0.4;
/// Blocks below this level never count.
pub const ABSOLUTE_GATE_DBFS: f32 = -70.0;
/// Blocks this far below the ungated mean are dropped.
pub const RELATIVE_GATE_DB: f32 = 10.0;

/// Result of analysing one track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessAnalysis {
    /// Gated RMS level in dBFS, `None` for silence.
    pub measured_dbfs: Option<f32>,
    /// Sample peak, linear.
    pub peak: f32,
    /// Gain to apply at the graph input, in dB.
    pub gain_db: f32,
}

impl LoudnessAnalysis {
    /// Analysis that applies no gain.
    pub fn unity() -> Self {
        Self {
            measured_dbfs: None,
            peak: 0.0,
            gain_db: 0.0,
        }
    }

    /// Gain as a linear factor.
    pub fn gain_linear(&self) -> f32 {
        db_to_linear(self.gain_db)
    }
}

/// Gated RMS level of `audio` in dBFS, or `None` if every block is gated.
pub fn gated_rms_dbfs(audio: &DecodedAudio) -> Option<f32> {
    let block = ((f64::from(audio.sample_rate()) * BLOCK_SECS) as usize).max(1);
    let frames = audio.frames();
    let channels = audio.channels();

    let powers: Vec<f64> = (0..frames)
        .step_by(block)
        .map(|start| {
            let end = (start + block).min(frames);
            let sum: f64 = channels
                .iter()
                .flat_map(|c| c[start..end].iter())
                .map(|&s| f64::from(s) * f64::from(s))
                .sum();
            sum / ((end - start) * channels.len()) as f64
        })
        .filter(|&p| power_db(p) >= ABSOLUTE_GATE_DBFS)
        .collect();

    if powers.is_empty() {
        return None;
    }

    let ungated = powers.iter().sum::<f64>() / powers.len() as f64;
    let threshold = power_db(ungated) - RELATIVE_GATE_DB;
    let kept: Vec<f64> = powers
        .into_iter()
        .filter(|&p| power_db(p) >= threshold)
        .collect();
    let mean = kept.iter().sum::<f64>() / kept.len() as f64;
    Some(power_db(mean))
}

fn power_db(power: f64) -> f32 {
    if power <= 0.0 {
        f32::NEG_INFINITY
    } else {
        (10.0 * power.log10()) as f32
    }
}

/// Measure `audio` and derive its normalisation gain.
///
/// The gain moves the measured level to the target, is clamped to the
/// configured range, and is then lowered further if it would push the
/// sample peak above the peak ceiling. Disabled normalisation and silent
/// tracks get unity gain.
pub fn analyze(audio: &DecodedAudio, config: &LoudnessConfig) -> LoudnessAnalysis {
    if !config.enabled {
        return LoudnessAnalysis::unity();
    }
    let peak = audio.peak();
    let Some(measured) = gated_rms_dbfs(audio) else {
        return LoudnessAnalysis {
            peak,
            ..LoudnessAnalysis::unity()
        };
    };

    let mut gain_db = (config.target_dbfs - measured).clamp(config.min_gain_db, config.max_gain_db);
    if peak > 0.0 {
        let headroom = config.peak_ceiling_dbfs - linear_to_db(peak);
        gain_db = gain_db.min(headroom);
    }

    tracing::debug!(measured_dbfs = measured, peak, gain_db, "loudness analysed");
    LoudnessAnalysis {
        measured_dbfs: Some(measured),
        peak,
        gain_db,
    }
}
