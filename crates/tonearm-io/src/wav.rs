//! 16-bit PCM WAV export.

use std::io::Cursor;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::{Error, Result};

/// RIFF + fmt + data header size for plain PCM.
pub const WAV_HEADER_LEN: usize = 44;

/// Header fields read back from an encoded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavInfo {
    /// Number of channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bits per sample.
    pub bits_per_sample: u16,
    /// Frames per channel.
    pub frames: u32,
}

/// Convert one float sample to 16-bit PCM.
///
/// Clamped to [-1, 1]; negative values scale by 32768, positive by 32767.
#[inline]
pub fn sample_to_i16(sample: f32) -> i16 {
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Encode planar channels as an interleaved 16-bit PCM WAV file in memory.
///
/// ```rust
/// let left = vec![0.0f32; 100];
/// let right = vec![0.5f32; 100];
/// let bytes = tonearm_io::encode_pcm16(&[left, right], 44100).unwrap();
/// assert_eq!(bytes.len(), 100 * 2 * 2 + tonearm_io::WAV_HEADER_LEN);
/// assert_eq!(&bytes[0..4], b"RIFF");
/// ```
pub fn encode_pcm16(channels: &[Vec<f32>], sample_rate: u32) -> Result<Vec<u8>> {
    let count = channels.len();
    if count == 0 || count > 2 {
        return Err(Error::InvalidAudio(format!(
            "export needs 1 or 2 channels, got {count}"
        )));
    }
    let frames = channels[0].len();
    if channels.iter().any(|c| c.len() != frames) {
        return Err(Error::InvalidAudio("channel lengths differ".to_string()));
    }

    let spec = WavSpec {
        channels: count as u16,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut bytes = Vec::with_capacity(WAV_HEADER_LEN + frames * count * 2);
    {
        let mut writer = WavWriter::new(Cursor::new(&mut bytes), spec)?;
        let mut pcm = writer.get_i16_writer((frames * count) as u32);
        for i in 0..frames {
            for channel in channels {
                pcm.write_sample(sample_to_i16(channel[i]));
            }
        }
        pcm.flush()?;
        writer.finalize()?;
    }

    tracing::debug!(frames, channels = count, sample_rate, "encoded pcm16 wav");
    Ok(bytes)
}

/// Read the header of an encoded WAV file.
pub fn read_wav_info(bytes: &[u8]) -> Result<WavInfo> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        frames: reader.duration(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_scaling_is_asymmetric() {
        assert_eq!(sample_to_i16(1.0), 32767);
        assert_eq!(sample_to_i16(-1.0), -32768);
        assert_eq!(sample_to_i16(0.0), 0);
        assert_eq!(sample_to_i16(0.5), 16383);
        assert_eq!(sample_to_i16(-0.5), -16384);
    }

    #[test]
    fn test_out_of_range_clamps() {
        assert_eq!(sample_to_i16(3.0), 32767);
        assert_eq!(sample_to_i16(-7.5), -32768);
        assert_eq!(sample_to_i16(f32::NAN), 0);
    }

    #[test]
    fn test_rejects_three_channels() {
        let err = encode_pcm16(&[vec![0.0], vec![0.0], vec![0.0]], 44100);
        assert!(matches!(err, Err(Error::InvalidAudio(_))));
    }
}
