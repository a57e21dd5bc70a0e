//! Audio I/O for the tonearm player engine.
//!
//! This crate provides:
//!
//! - **Decoding**: [`decode`] turns MP3/WAV/OGG/FLAC bytes into [`DecodedAudio`]
//! - **Export encoding**: [`encode_pcm16`] wraps planar samples in a 16-bit PCM WAV
//! - **Output**: the [`AudioBackend`] trait with [`CpalBackend`] and [`NullBackend`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tonearm_io::{decode, encode_pcm16};
//!
//! let bytes = std::fs::read("track.flac")?;
//! let audio = decode(&bytes, Some("flac"))?;
//! let wav = encode_pcm16(audio.channels(), audio.sample_rate())?;
//! std::fs::write("copy.wav", wav)?;
//! ```

pub mod backend;
pub mod cpal_backend;
mod decode;
mod wav;

pub use backend::{
    AudioBackend, AudioDevice, BackendStreamConfig, ErrorCallback, NullBackend, OutputCallback,
    StreamHandle,
};
pub use cpal_backend::CpalBackend;
pub use decode::{DecodedAudio, decode, decode_file};
pub use wav::{WAV_HEADER_LEN, WavInfo, encode_pcm16, read_wav_info, sample_to_i16};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV encode or header read error.
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// The input could not be probed or decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Sample data that cannot form a valid buffer.
    #[error("Invalid audio: {0}")]
    InvalidAudio(String),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
