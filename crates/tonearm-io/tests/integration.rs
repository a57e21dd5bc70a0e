//! Integration tests for tonearm-io export encoding and decoding.

use tempfile::NamedTempFile;
use tonearm_io::{
    AudioBackend, DecodedAudio, Error, NullBackend, WAV_HEADER_LEN, decode, decode_file,
    encode_pcm16, read_wav_info,
};

fn sine_wave(sample_rate: u32, freq_hz: f32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| (2.0 * std::f32::consts::PI * freq_hz * i as f32 / sample_rate as f32).sin() * 0.8)
        .collect()
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

#[test]
fn stereo_export_has_exact_size_and_headers() {
    let frames = 88200;
    let left = sine_wave(44100, 440.0, frames);
    let right = sine_wave(44100, 660.0, frames);
    let bytes = encode_pcm16(&[left, right], 44100).unwrap();

    assert_eq!(bytes.len(), frames * 2 * 2 + 44);
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(u32_at(&bytes, 4) as usize, bytes.len() - 8);
    assert_eq!(&bytes[8..12], b"WAVE");
    assert_eq!(&bytes[12..16], b"fmt ");
    assert_eq!(u32_at(&bytes, 16), 16);
    assert_eq!(u16_at(&bytes, 20), 1);
    assert_eq!(u16_at(&bytes, 22), 2);
    assert_eq!(u32_at(&bytes, 24), 44100);
    assert_eq!(u32_at(&bytes, 28), 44100 * 2 * 2);
    assert_eq!(u16_at(&bytes, 32), 4);
    assert_eq!(u16_at(&bytes, 34), 16);
    assert_eq!(&bytes[36..40], b"data");
    assert_eq!(u32_at(&bytes, 40) as usize, frames * 2 * 2);
}

#[test]
fn mono_export_header_matches_channel_count() {
    let bytes = encode_pcm16(&[vec![0.25; 1000]], 48000).unwrap();
    assert_eq!(bytes.len(), 1000 * 2 + WAV_HEADER_LEN);
    let info = read_wav_info(&bytes).unwrap();
    assert_eq!(info.channels, 1);
    assert_eq!(info.sample_rate, 48000);
    assert_eq!(info.bits_per_sample, 16);
    assert_eq!(info.frames, 1000);
}

#[test]
fn samples_are_interleaved_left_first() {
    let bytes = encode_pcm16(&[vec![1.0, 0.0], vec![-1.0, 0.5]], 44100).unwrap();
    let data = &bytes[WAV_HEADER_LEN..];
    let samples: Vec<i16> = data
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();
    assert_eq!(samples, vec![32767, -32768, 0, 16383]);
}

#[test]
fn exported_wav_decodes_back() {
    let sr = 44100;
    let left = sine_wave(sr, 220.0, 4410);
    let right: Vec<f32> = left.iter().map(|s| -s).collect();
    let bytes = encode_pcm16(&[left.clone(), right], sr).unwrap();

    let audio = decode(&bytes, Some("wav")).unwrap();
    assert_eq!(audio.channel_count(), 2);
    assert_eq!(audio.sample_rate(), sr);
    assert_eq!(audio.frames(), 4410);
    for (a, b) in left.iter().zip(audio.left()) {
        assert!((a - b).abs() < 2.0 / 32768.0, "{a} vs {b}");
    }
}

#[test]
fn decode_file_uses_extension_hint() {
    let bytes = encode_pcm16(&[sine_wave(22050, 100.0, 2205)], 22050).unwrap();
    let file = NamedTempFile::with_suffix(".wav").unwrap();
    std::fs::write(file.path(), &bytes).unwrap();

    let audio = decode_file(file.path()).unwrap();
    assert_eq!(audio.channel_count(), 1);
    assert!((audio.duration_secs() - 0.1).abs() < 1e-6);
}

#[test]
fn truncated_file_fails_cleanly() {
    let bytes = encode_pcm16(&[vec![0.1; 100]], 44100).unwrap();
    let result = decode(&bytes[..20], Some("wav"));
    assert!(matches!(result, Err(Error::Decode(_))));
}

#[test]
fn null_backend_reports_no_devices() {
    let backend = NullBackend::new();
    assert_eq!(backend.name(), "null");
    assert!(backend.list_devices().unwrap().is_empty());
    assert!(backend.default_output_device().unwrap().is_none());
}

#[test]
fn shared_audio_is_cheap_to_clone() {
    let audio = DecodedAudio::from_planar(vec![vec![0.0; 64]], 44100)
        .unwrap()
        .into_shared();
    let other = std::sync::Arc::clone(&audio);
    assert_eq!(std::sync::Arc::strong_count(&other), 2);
}
