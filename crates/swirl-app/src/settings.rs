//! Startup configuration lookup.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use swirl_core::DispatcherConfig;
use tracing::{debug, info};

/// `<config dir>/config.json` for the current platform.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "swirl", "Swirl").map(|dirs| dirs.config_dir().join("config.json"))
}

/// Load the configuration from `explicit`, else the default location,
/// else fall back to built-in defaults.
pub fn load(explicit: Option<&Path>) -> Result<DispatcherConfig> {
    if let Some(path) = explicit {
        return read(path);
    }

    match default_path() {
        Some(path) if path.exists() => read(&path),
        _ => {
            debug!("No configuration file found, using defaults");
            Ok(DispatcherConfig::default())
        }
    }
}

fn read(path: &Path) -> Result<DispatcherConfig> {
    let config = DispatcherConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        assert!(load(Some(Path::new("/nonexistent/swirl.json"))).is_err());
    }

    #[test]
    fn test_explicit_file_is_read() {
        let path = std::env::temp_dir().join(format!("swirl-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "music_enabled": true, "master_volume": 0.5 }"#).unwrap();

        let config = load(Some(&path)).unwrap();
        assert!(config.music_enabled);
        assert!(config.effects_enabled);
        assert!((config.master_volume - 0.5).abs() < f32::EPSILON);

        let _ = std::fs::remove_file(path);
    }
}
