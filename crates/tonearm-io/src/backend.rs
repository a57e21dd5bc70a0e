//! Pluggable audio output.
//!
//! The engine renders into whatever [`AudioBackend`] it is started with:
//! [`CpalBackend`](crate::CpalBackend) for real devices, [`NullBackend`] when
//! there is no device or when a test wants to pull buffers by hand.
//!
//! Callbacks are boxed closures so the trait stays object-safe and the
//! engine can hold `Box<dyn AudioBackend>`. A [`StreamHandle`] keeps its
//! stream alive; dropping it stops output.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::Result;

/// Audio device information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Whether this is the system default output.
    pub is_default: bool,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
}

/// Configuration for building an output stream.
#[derive(Debug, Clone)]
pub struct BackendStreamConfig {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Preferred buffer size in frames.
    pub buffer_size: u32,
    /// Number of output channels.
    pub channels: u16,
    /// Optional device name filter (system default if `None`).
    pub device_name: Option<String>,
}

impl Default for BackendStreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 512,
            channels: 2,
            device_name: None,
        }
    }
}

/// Type-erased stream handle. Output runs while it is alive.
pub struct StreamHandle {
    _inner: Box<dyn Send>,
}

impl StreamHandle {
    /// Wrap a backend-specific stream object.
    pub fn new<T: Send + 'static>(stream: T) -> Self {
        Self {
            _inner: Box::new(stream),
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// Fills an interleaved `f32` buffer on the audio thread.
///
/// Runs in real time: no allocation, no blocking locks, no I/O.
pub type OutputCallback = Box<dyn FnMut(&mut [f32]) + Send>;

/// Receives stream errors as text.
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;

/// Audio output abstraction.
pub trait AudioBackend: Send {
    /// Backend name, e.g. `"cpal"`.
    fn name(&self) -> &str;

    /// Output devices available to this backend.
    fn list_devices(&self) -> Result<Vec<AudioDevice>>;

    /// The default output device, if any.
    fn default_output_device(&self) -> Result<Option<AudioDevice>>;

    /// Build and start an output stream.
    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        callback: OutputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;

    /// Sample rate the backend will actually run `config` at.
    fn actual_sample_rate(&self, config: &BackendStreamConfig) -> u32 {
        config.sample_rate
    }
}

type SharedCallback = Arc<Mutex<Option<OutputCallback>>>;

/// Backend with no device behind it.
///
/// The callback handed to [`build_output_stream`](AudioBackend::build_output_stream)
/// is parked until [`pull`](NullBackend::pull) asks it for a buffer, which is
/// how tests drive the live render path deterministically. Dropping the
/// returned [`StreamHandle`] detaches the callback.
#[derive(Clone, Default)]
pub struct NullBackend {
    callback: SharedCallback,
}

struct NullStream {
    callback: SharedCallback,
}

impl Drop for NullStream {
    fn drop(&mut self) {
        self.callback.lock().take();
    }
}

impl NullBackend {
    /// New backend with no stream attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the attached callback once. Returns `false` (and leaves `buffer`
    /// zeroed) when no stream is alive.
    pub fn pull(&self, buffer: &mut [f32]) -> bool {
        buffer.fill(0.0);
        match self.callback.lock().as_mut() {
            Some(callback) => {
                callback(buffer);
                true
            }
            None => false,
        }
    }

    /// Whether a stream is currently attached.
    pub fn is_streaming(&self) -> bool {
        self.callback.lock().is_some()
    }
}

impl std::fmt::Debug for NullBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NullBackend")
            .field("streaming", &self.is_streaming())
            .finish()
    }
}

impl AudioBackend for NullBackend {
    fn name(&self) -> &str {
        "null"
    }

    fn list_devices(&self) -> Result<Vec<AudioDevice>> {
        Ok(Vec::new())
    }

    fn default_output_device(&self) -> Result<Option<AudioDevice>> {
        Ok(None)
    }

    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        callback: OutputCallback,
        _error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        *self.callback.lock() = Some(callback);
        tracing::debug!(sample_rate = config.sample_rate, "null output stream attached");
        Ok(StreamHandle::new(NullStream {
            callback: Arc::clone(&self.callback),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BackendStreamConfig::default();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.channels, 2);
        assert!(config.device_name.is_none());
    }

    #[test]
    fn test_null_backend_pulls_until_handle_dropped() {
        let backend = NullBackend::new();
        let handle = backend
            .build_output_stream(
                &BackendStreamConfig::default(),
                Box::new(|buf: &mut [f32]| buf.fill(0.25)),
                Box::new(|_| {}),
            )
            .unwrap();

        let mut buf = [0.0; 8];
        assert!(backend.pull(&mut buf));
        assert!(buf.iter().all(|&s| s == 0.25));

        drop(handle);
        assert!(!backend.is_streaming());
        assert!(!backend.pull(&mut buf));
        assert!(buf.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_stream_handle_debug() {
        let handle = StreamHandle::new(42u32);
        assert!(format!("{handle:?}").contains("StreamHandle"));
    }
}
