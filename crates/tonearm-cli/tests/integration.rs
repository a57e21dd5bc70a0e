//! Integration tests for tonearm-cli.
//!
//! Tests run the `tonearm` binary against temporary config files and
//! generated audio; nothing here needs an audio device.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use tonearm_io::{encode_pcm16, read_wav_info};

/// Helper to get the path to the `tonearm` binary built by cargo.
fn tonearm_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tonearm"))
}

/// Temp dir holding a minimal config file.
fn workspace() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("engine.toml");
    std::fs::write(&config, "[reverb]\nroom = \"small\"\n").unwrap();
    (dir, config)
}

fn write_tone(path: &Path, channels: usize, frames: usize, sample_rate: u32) {
    let channel: Vec<f32> = (0..frames)
        .map(|i| 0.3 * (2.0 * std::f32::consts::PI * 330.0 * i as f32 / sample_rate as f32).sin())
        .collect();
    let bytes = encode_pcm16(&vec![channel; channels], sample_rate).unwrap();
    std::fs::write(path, bytes).unwrap();
}

// ---------------------------------------------------------------------------
// `tonearm presets`
// ---------------------------------------------------------------------------

#[test]
fn cli_presets_list_shows_factory_presets() {
    let (_dir, config) = workspace();
    let output = tonearm_bin()
        .arg("--config")
        .arg(&config)
        .args(["presets", "list"])
        .output()
        .expect("failed to run tonearm presets list");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["default", "concert", "studio", "radio", "nightcore", "slowed"] {
        assert!(stdout.contains(name), "listing should contain '{name}'");
    }
}

#[test]
fn cli_presets_show_nightcore() {
    let (_dir, config) = workspace();
    let output = tonearm_bin()
        .arg("--config")
        .arg(&config)
        .args(["presets", "show", "NIGHTCORE"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1.25x"), "{stdout}");
    assert!(stdout.contains("+4.0 semitones"), "{stdout}");
}

#[test]
fn cli_presets_unknown_fails() {
    let (_dir, config) = workspace();
    let output = tonearm_bin()
        .arg("--config")
        .arg(&config)
        .args(["presets", "show", "lofi"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn cli_presets_save_then_delete() {
    let (_dir, config) = workspace();
    let save = tonearm_bin()
        .arg("--config")
        .arg(&config)
        .args(["presets", "save", "lofi", "--reverb", "30", "--pitch", "-1", "--speed", "0.9"])
        .output()
        .unwrap();
    assert!(save.status.success(), "{}", String::from_utf8_lossy(&save.stderr));
    let text = std::fs::read_to_string(&config).unwrap();
    assert!(text.contains("lofi"));

    let show = tonearm_bin()
        .arg("--config")
        .arg(&config)
        .args(["presets", "show", "lofi"])
        .output()
        .unwrap();
    assert!(String::from_utf8_lossy(&show.stdout).contains("(user)"));

    let delete = tonearm_bin()
        .arg("--config")
        .arg(&config)
        .args(["presets", "delete", "lofi"])
        .output()
        .unwrap();
    assert!(delete.status.success());
    assert!(!std::fs::read_to_string(&config).unwrap().contains("lofi"));
}

// ---------------------------------------------------------------------------
// `tonearm export`
// ---------------------------------------------------------------------------

#[test]
fn cli_export_writes_exact_wav() {
    let (dir, config) = workspace();
    let input = dir.path().join("in.wav");
    let output_path = dir.path().join("out.wav");
    write_tone(&input, 2, 16000, 8000);

    let output = tonearm_bin()
        .arg("--config")
        .arg(&config)
        .arg("export")
        .arg(&input)
        .arg(&output_path)
        .args(["--preset", "studio"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let bytes = std::fs::read(&output_path).unwrap();
    assert_eq!(bytes.len(), 16000 * 2 * 2 + 44);
    let info = read_wav_info(&bytes).unwrap();
    assert_eq!(info.channels, 2);
    assert_eq!(info.sample_rate, 8000);
}

#[test]
fn cli_export_speed_shortens_output() {
    let (dir, config) = workspace();
    let input = dir.path().join("mono.wav");
    let output_path = dir.path().join("fast.wav");
    write_tone(&input, 1, 8000, 8000);

    let output = tonearm_bin()
        .arg("--config")
        .arg(&config)
        .arg("export")
        .arg(&input)
        .arg(&output_path)
        .args(["--set", "speed=2", "--set", "eq3=-6"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let info = read_wav_info(&std::fs::read(&output_path).unwrap()).unwrap();
    assert_eq!(info.channels, 1);
    assert_eq!(info.frames, 4000);
}

#[test]
fn cli_export_refuses_overwrite() {
    let (dir, config) = workspace();
    let input = dir.path().join("in.wav");
    let output_path = dir.path().join("out.wav");
    write_tone(&input, 1, 800, 8000);
    std::fs::write(&output_path, b"keep me").unwrap();

    let output = tonearm_bin()
        .arg("--config")
        .arg(&config)
        .arg("export")
        .arg(&input)
        .arg(&output_path)
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert_eq!(std::fs::read(&output_path).unwrap(), b"keep me");
}

#[test]
fn cli_export_rejects_unknown_knob() {
    let (dir, config) = workspace();
    let input = dir.path().join("in.wav");
    write_tone(&input, 1, 800, 8000);

    let output = tonearm_bin()
        .arg("--config")
        .arg(&config)
        .arg("export")
        .arg(&input)
        .arg(dir.path().join("out.wav"))
        .args(["--set", "wah=3"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

// ---------------------------------------------------------------------------
// `tonearm info` / `tonearm config`
// ---------------------------------------------------------------------------

#[test]
fn cli_info_reports_format() {
    let (dir, config) = workspace();
    let input = dir.path().join("tone.wav");
    write_tone(&input, 2, 12000, 8000);

    let output = tonearm_bin()
        .arg("--config")
        .arg(&config)
        .arg("info")
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Channels:    2"), "{stdout}");
    assert!(stdout.contains("8000 Hz"), "{stdout}");
    assert!(stdout.contains("12000 frames"), "{stdout}");
}

#[test]
fn cli_config_init_and_check() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("fresh.toml");

    let init = tonearm_bin()
        .arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .output()
        .unwrap();
    assert!(init.status.success());
    assert!(config.is_file());

    let again = tonearm_bin()
        .arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .output()
        .unwrap();
    assert!(!again.status.success());

    let check = tonearm_bin()
        .arg("--config")
        .arg(&config)
        .args(["config", "check"])
        .output()
        .unwrap();
    assert!(check.status.success());
    assert!(String::from_utf8_lossy(&check.stdout).contains("room hall"));
}

#[test]
fn cli_config_check_rejects_bad_room() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bad.toml");
    std::fs::write(&config, "[reverb]\nroom = \"closet\"\n").unwrap();

    let output = tonearm_bin()
        .arg("--config")
        .arg(&config)
        .args(["config", "check"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}
