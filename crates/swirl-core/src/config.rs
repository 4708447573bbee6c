//! Dispatcher configuration.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Startup settings for the cue dispatcher.
///
/// Only read at startup; nothing is ever written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Whether sound effects start enabled.
    pub effects_enabled: bool,
    /// Whether background music starts enabled.
    pub music_enabled: bool,
    /// Initial value of the shared output gain (0.0 to 1.0).
    pub master_volume: f32,
    /// Capacity of the status event channel.
    pub event_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            effects_enabled: true,
            music_enabled: false,
            master_volume: 1.0,
            event_capacity: 64,
        }
    }
}

impl DispatcherConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.master_volume) {
            return Err(Error::Config(format!(
                "master_volume must be within 0.0..=1.0, got {}",
                self.master_volume
            )));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DispatcherConfig::default();
        assert!(config.effects_enabled);
        assert!(!config.music_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = DispatcherConfig::from_json(r#"{ "effects_enabled": false }"#).unwrap();
        assert!(!config.effects_enabled);
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let err = DispatcherConfig::from_json(r#"{ "master_volume": 2.0 }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = DispatcherConfig::from_json(r#"{ "event_capacity": 0 }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = DispatcherConfig::from_json("{ effects_enabled").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = DispatcherConfig::load(Path::new("/nonexistent/swirl/config.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
