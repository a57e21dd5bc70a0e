//! Compressed audio decoding via symphonia.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::{Error, Result};

/// Immutable planar sample matrix produced by decoding one track.
///
/// Holds one or two channels of equal length. Sources with more channels are
/// folded to their first two at decode time. The engine shares it behind an
/// `Arc` and replaces it wholesale on track change.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl DecodedAudio {
    /// Build from planar channels.
    ///
    /// Fails on zero or more than two channels, unequal lengths or a zero
    /// sample rate.
    pub fn from_planar(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if channels.is_empty() || channels.len() > 2 {
            return Err(Error::InvalidAudio(format!(
                "expected 1 or 2 channels, got {}",
                channels.len()
            )));
        }
        if channels.iter().any(|c| c.len() != channels[0].len()) {
            return Err(Error::InvalidAudio("channel lengths differ".to_string()));
        }
        if sample_rate == 0 {
            return Err(Error::InvalidAudio("sample rate is zero".to_string()));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Build from interleaved samples, keeping at most the first two channels.
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Result<Self> {
        if channel_count == 0 {
            return Err(Error::InvalidAudio("zero channels".to_string()));
        }
        let kept = channel_count.min(2);
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); kept];
        for frame in samples.chunks_exact(channel_count) {
            for (ch, out) in channels.iter_mut().enumerate() {
                out.push(frame[ch]);
            }
        }
        Self::from_planar(channels, sample_rate)
    }

    /// Number of channels (1 or 2).
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames per channel.
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// All channels, planar.
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Left channel (the only channel for mono).
    pub fn left(&self) -> &[f32] {
        &self.channels[0]
    }

    /// Right channel; mono sources return the left channel.
    pub fn right(&self) -> &[f32] {
        self.channels.get(1).unwrap_or(&self.channels[0])
    }

    /// Stereo frame at `index`, zero past the end.
    #[inline]
    pub fn frame(&self, index: usize) -> (f32, f32) {
        match (self.left().get(index), self.right().get(index)) {
            (Some(&l), Some(&r)) => (l, r),
            _ => (0.0, 0.0),
        }
    }

    /// Largest absolute sample over all channels.
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0f32, |m, s| m.max(s.abs()))
    }

    /// Wrap in an `Arc` for sharing with voices and export.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

/// Decode an in-memory encoded file.
///
/// `extension` is a probe hint such as `"mp3"`; the container is still
/// sniffed from the bytes when it is `None` or wrong.
pub fn decode(bytes: &[u8], extension: Option<&str>) -> Result<DecodedAudio> {
    let source = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(source), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::Decode(format!("unrecognised container: {e}")))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Decode("no audio track found".to_string()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("unsupported codec: {e}")))?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut channel_count = 0usize;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(Error::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::warn!(error = e, "skipping corrupt packet");
                continue;
            }
            Err(e) => return Err(Error::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        let needed = decoded.capacity() * spec.channels.count();
        if sample_buf.as_ref().is_none_or(|b| b.capacity() < needed) {
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }
        channel_count = spec.channels.count();
        sample_rate = spec.rate;

        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            interleaved.extend_from_slice(buf.samples());
        }
    }

    if channel_count == 0 || interleaved.is_empty() {
        return Err(Error::Decode("no audio frames decoded".to_string()));
    }

    let audio = DecodedAudio::from_interleaved(&interleaved, channel_count, sample_rate)?;
    tracing::debug!(
        channels = channel_count,
        sample_rate,
        frames = audio.frames(),
        "decoded track"
    );
    Ok(audio)
}

/// Read and decode a file, using its extension as the probe hint.
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<DecodedAudio> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    decode(&bytes, path.extension().and_then(|e| e.to_str()))
}
