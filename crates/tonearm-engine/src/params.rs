//! Knobs, their ranges, and the mapping from knob values to stage settings.
//!
//! | Knob | Range | Default | Stage setting |
//! |------|-------|---------|---------------|
//! | volume | 0–100 | 80 | master gain v/100 |
//! | speed | 0.25–2.0 | 1.0 | voice read rate |
//! | pitch_semitones | -12–12 | 0 | pitch shifter |
//! | reverb_mix | 0–100 | 0 | reverb return v/100 |
//! | bass_boost | 0–100 | 0 | 150 Hz shelf, v × 0.15 dB |
//! | compressor | 0–100 | 0 | threshold -v × 0.5 dB |
//! | delay_mix | 0–100 | 0 | delay return v/100 |
//! | chorus_mix | 0–100 | 0 | modulation return v/100 |
//! | distortion | 0–100 | 0 | drive v × 0.3 dB |
//! | spatial_position | -180–180 | 0 | panner azimuth |
//! | stereo_pan | -1–1 | 0 | panner balance |
//! | eq_band[0..10] | -40–40 dB | 0 | peaking band gain |

use std::fmt;

use tonearm_config::RampConfig;
use tonearm_effects::BAND_COUNT;

/// Number of automatable knobs, EQ bands included.
pub const KNOB_COUNT: usize = 11 + BAND_COUNT;

const BASS_DB_PER_STEP: f32 = 0.15;
const COMPRESSOR_DB_PER_STEP: f32 = 0.5;
const DRIVE_DB_PER_STEP: f32 = 0.3;
/// Distortion knob value at which the shaped signal fully replaces the dry one.
const DISTORTION_FULL_WET: f32 = 10.0;

/// One automatable control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Knob {
    /// Master volume.
    Volume,
    /// Playback speed (changes duration and pitch together).
    Speed,
    /// Pitch shift without changing duration.
    PitchSemitones,
    /// Reverb return level.
    ReverbMix,
    /// Low shelf boost.
    BassBoost,
    /// Compression amount.
    Compressor,
    /// Echo return level.
    DelayMix,
    /// Modulation return level.
    ChorusMix,
    /// Waveshaper drive.
    Distortion,
    /// 3-D source azimuth.
    SpatialPosition,
    /// Stereo balance.
    StereoPan,
    /// One band of the graphic EQ.
    EqBand(u8),
}

/// How quickly a knob follows a new target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampSpeed {
    /// Continuous sliders.
    Fast,
    /// Controls whose sudden change is audible as a pitch or time glitch.
    Medium,
    /// Reverb.
    Slow,
}

impl RampSpeed {
    /// Ramp window in ms under `ramps`.
    pub fn window_ms(self, ramps: &RampConfig) -> f32 {
        match self {
            Self::Fast => ramps.fast_ms,
            Self::Medium => ramps.medium_ms,
            Self::Slow => ramps.slow_ms,
        }
    }
}

impl Knob {
    /// Every knob, in index order.
    pub const ALL: [Knob; KNOB_COUNT] = [
        Knob::Volume,
        Knob::Speed,
        Knob::PitchSemitones,
        Knob::ReverbMix,
        Knob::BassBoost,
        Knob::Compressor,
        Knob::DelayMix,
        Knob::ChorusMix,
        Knob::Distortion,
        Knob::SpatialPosition,
        Knob::StereoPan,
        Knob::EqBand(0),
        Knob::EqBand(1),
        Knob::EqBand(2),
        Knob::EqBand(3),
        Knob::EqBand(4),
        Knob::EqBand(5),
        Knob::EqBand(6),
        Knob::EqBand(7),
        Knob::EqBand(8),
        Knob::EqBand(9),
    ];

    /// The knob for EQ band `band`, if it exists.
    pub fn eq_band(band: usize) -> Option<Knob> {
        (band < BAND_COUNT).then_some(Knob::EqBand(band as u8))
    }

    /// Position in [`Knob::ALL`].
    pub fn index(self) -> usize {
        match self {
            Self::Volume => 0,
            Self::Speed => 1,
            Self::PitchSemitones => 2,
            Self::ReverbMix => 3,
            Self::BassBoost => 4,
            Self::Compressor => 5,
            Self::DelayMix => 6,
            Self::ChorusMix => 7,
            Self::Distortion => 8,
            Self::SpatialPosition => 9,
            Self::StereoPan => 10,
            Self::EqBand(band) => 11 + (band as usize).min(BAND_COUNT - 1),
        }
    }

    /// Accepted value range, inclusive.
    pub fn range(self) -> (f32, f32) {
        match self {
            Self::Speed => (0.25, 2.0),
            Self::PitchSemitones => (-12.0, 12.0),
            Self::SpatialPosition => (-180.0, 180.0),
            Self::StereoPan => (-1.0, 1.0),
            Self::EqBand(_) => (-40.0, 40.0),
            _ => (0.0, 100.0),
        }
    }

    /// Value at session start.
    pub fn default_value(self) -> f32 {
        match self {
            Self::Volume => 80.0,
            Self::Speed => 1.0,
            _ => 0.0,
        }
    }

    /// Clamp into range; NaN becomes the default.
    pub fn clamp(self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default_value();
        }
        let (min, max) = self.range();
        value.clamp(min, max)
    }

    /// Ramp class.
    pub fn ramp(self) -> RampSpeed {
        match self {
            Self::Speed | Self::PitchSemitones | Self::DelayMix | Self::ChorusMix => {
                RampSpeed::Medium
            }
            Self::ReverbMix => RampSpeed::Slow,
            _ => RampSpeed::Fast,
        }
    }
}

impl fmt::Display for Knob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Volume => f.write_str("volume"),
            Self::Speed => f.write_str("speed"),
            Self::PitchSemitones => f.write_str("pitch_semitones"),
            Self::ReverbMix => f.write_str("reverb_mix"),
            Self::BassBoost => f.write_str("bass_boost"),
            Self::Compressor => f.write_str("compressor"),
            Self::DelayMix => f.write_str("delay_mix"),
            Self::ChorusMix => f.write_str("chorus_mix"),
            Self::Distortion => f.write_str("distortion"),
            Self::SpatialPosition => f.write_str("spatial_position"),
            Self::StereoPan => f.write_str("stereo_pan"),
            Self::EqBand(band) => write!(f, "eq_band[{band}]"),
        }
    }
}

impl std::str::FromStr for Knob {
    type Err = String;

    /// Accepts the display names plus the short forms `pitch`, `reverb`,
    /// `bass`, `delay`, `chorus`, `pan`, `spatial` and `eq0`..`eq9`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let knob = match name.as_str() {
            "volume" => Self::Volume,
            "speed" | "rate" => Self::Speed,
            "pitch" | "pitch_semitones" => Self::PitchSemitones,
            "reverb" | "reverb_mix" => Self::ReverbMix,
            "bass" | "bass_boost" => Self::BassBoost,
            "compressor" => Self::Compressor,
            "delay" | "delay_mix" => Self::DelayMix,
            "chorus" | "chorus_mix" => Self::ChorusMix,
            "distortion" => Self::Distortion,
            "spatial" | "spatial_position" => Self::SpatialPosition,
            "pan" | "stereo_pan" => Self::StereoPan,
            other => {
                let band = other
                    .strip_prefix("eq_band[")
                    .and_then(|rest| rest.strip_suffix(']'))
                    .or_else(|| other.strip_prefix("eq"))
                    .and_then(|digits| digits.parse::<usize>().ok())
                    .and_then(Knob::eq_band);
                return band.ok_or_else(|| format!("unknown knob '{s}'"));
            }
        };
        Ok(knob)
    }
}

/// One value per knob.
///
/// Session-scoped: survives track loads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectParameterSet {
    values: [f32; KNOB_COUNT],
}

impl Default for EffectParameterSet {
    fn default() -> Self {
        Self {
            values: Knob::ALL.map(Knob::default_value),
        }
    }
}

impl EffectParameterSet {
    /// Defaults with the given starting volume.
    pub fn with_volume(volume: f32) -> Self {
        let mut set = Self::default();
        set.set(Knob::Volume, volume);
        set
    }

    /// Build from raw values, clamping each into range.
    pub fn from_values(values: [f32; KNOB_COUNT]) -> Self {
        let mut set = Self { values };
        for knob in Knob::ALL {
            set.values[knob.index()] = knob.clamp(set.values[knob.index()]);
        }
        set
    }

    /// Value of `knob`.
    pub fn get(&self, knob: Knob) -> f32 {
        self.values[knob.index()]
    }

    /// Store a clamped value and return what was stored.
    pub fn set(&mut self, knob: Knob, value: f32) -> f32 {
        let clamped = knob.clamp(value);
        self.values[knob.index()] = clamped;
        clamped
    }

    /// All values in [`Knob::ALL`] order.
    pub fn values(&self) -> &[f32; KNOB_COUNT] {
        &self.values
    }

    /// Stage settings for these values.
    pub fn frame(&self) -> ParamFrame {
        ParamFrame::from_values(&self.values)
    }
}

/// Knob values translated to the units each stage takes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamFrame {
    /// Linear master gain.
    pub master_gain: f32,
    /// Source read rate.
    pub speed: f32,
    /// Pitch shift in semitones.
    pub pitch_semitones: f32,
    /// Linear reverb return gain.
    pub reverb_return: f32,
    /// Bass shelf gain in dB.
    pub bass_db: f32,
    /// Compressor threshold in dBFS.
    pub compressor_threshold_db: f32,
    /// Linear delay return gain.
    pub delay_return: f32,
    /// Linear modulation return gain.
    pub modulation_return: f32,
    /// EQ band gains in dB.
    pub eq_gains_db: [f32; BAND_COUNT],
    /// Distortion drive in dB.
    pub drive_db: f32,
    /// Share of the distorted signal in the stage output, 0–1.
    pub distortion_wet: f32,
    /// Source azimuth in degrees.
    pub azimuth_deg: f32,
    /// Stereo balance.
    pub pan: f32,
}

impl ParamFrame {
    /// Translate raw knob values.
    pub fn from_values(values: &[f32; KNOB_COUNT]) -> Self {
        let get = |knob: Knob| knob.clamp(values[knob.index()]);
        let distortion = get(Knob::Distortion);
        Self {
            master_gain: get(Knob::Volume) / 100.0,
            speed: get(Knob::Speed),
            pitch_semitones: get(Knob::PitchSemitones),
            reverb_return: get(Knob::ReverbMix) / 100.0,
            bass_db: get(Knob::BassBoost) * BASS_DB_PER_STEP,
            compressor_threshold_db: -get(Knob::Compressor) * COMPRESSOR_DB_PER_STEP,
            delay_return: get(Knob::DelayMix) / 100.0,
            modulation_return: get(Knob::ChorusMix) / 100.0,
            eq_gains_db: std::array::from_fn(|band| get(Knob::EqBand(band as u8))),
            drive_db: distortion * DRIVE_DB_PER_STEP,
            distortion_wet: (distortion / DISTORTION_FULL_WET).min(1.0),
            azimuth_deg: get(Knob::SpatialPosition),
            pan: get(Knob::StereoPan),
        }
    }

    /// Whether the distortion stage is in the signal path.
    pub fn distortion_connected(&self) -> bool {
        self.distortion_wet > 0.0
    }
}
