//! Engine error type.

use tonearm_config::ConfigError;

/// Errors surfaced by the playback engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The input bytes could not be decoded. Engine state is unchanged.
    #[error("decode failed: {0}")]
    Decode(#[source] tonearm_io::Error),

    /// The output stream could not be opened. Fatal for the session.
    #[error("failed to start audio output: {0}")]
    GraphInit(String),

    /// Offline render or encoding failed; nothing was written.
    #[error("export failed: {0}")]
    Export(String),

    /// EQ band index outside 0..10.
    #[error("EQ band {0} out of range (0-9)")]
    InvalidBand(usize),

    /// No factory or user preset with that name.
    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    /// A graph topology that cannot be built.
    #[error("invalid topology: {0}")]
    Topology(String),

    /// Configuration lookup or validation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Engine result alias.
pub type Result<T> = std::result::Result<T, EngineError>;
