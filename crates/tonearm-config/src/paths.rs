//! Platform-specific paths.
//!
//! - Linux: `~/.config/tonearm/engine.toml`
//! - macOS: `~/Library/Application Support/tonearm/engine.toml`
//! - Windows: `%APPDATA%\tonearm\engine.toml`

use std::path::PathBuf;

/// Application name used for directory paths.
const APP_NAME: &str = "tonearm";

/// Engine config file name.
const CONFIG_FILE: &str = "engine.toml";

/// The user configuration directory.
///
/// Falls back to the current directory if the platform config directory
/// cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the engine config file.
pub fn engine_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE)
}

/// Ensure the user config directory exists.
pub fn ensure_user_config_dir() -> Result<PathBuf, crate::ConfigError> {
    let dir = user_config_dir();

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| crate::ConfigError::create_dir(&dir, e))?;
    }

    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_config_dir() {
        let dir = user_config_dir();
        assert!(dir.to_string_lossy().contains("tonearm"));
    }

    #[test]
    fn test_engine_config_path() {
        let path = engine_config_path();
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("engine.toml"));
        assert_eq!(path.parent(), Some(user_config_dir().as_path()));
    }
}
