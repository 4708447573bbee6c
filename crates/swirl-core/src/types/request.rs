//! Ephemeral synthesis requests.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Peak volume used when a caller does not pick one.
pub const DEFAULT_PEAK_VOLUME: f32 = 0.1;

/// A single sine tone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneRequest {
    /// Oscillator frequency in Hz.
    pub frequency_hz: f32,
    /// Length of the tone, including its envelope.
    pub duration_secs: f32,
    /// Envelope peak (0.0 to 1.0).
    pub peak_volume: f32,
}

impl ToneRequest {
    pub const fn new(frequency_hz: f32, duration_secs: f32, peak_volume: f32) -> Self {
        Self {
            frequency_hz,
            duration_secs,
            peak_volume,
        }
    }

    /// Tone at the default peak volume.
    pub const fn with_default_volume(frequency_hz: f32, duration_secs: f32) -> Self {
        Self::new(frequency_hz, duration_secs, DEFAULT_PEAK_VOLUME)
    }

    /// Check that the request can be synthesized.
    pub fn validate(&self) -> Result<()> {
        if !self.frequency_hz.is_finite() || self.frequency_hz <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "tone frequency must be positive, got {}",
                self.frequency_hz
            )));
        }
        validate_duration(self.duration_secs)?;
        validate_volume(self.peak_volume)
    }
}

/// A single burst of white noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseRequest {
    pub duration_secs: f32,
    pub peak_volume: f32,
}

impl NoiseRequest {
    pub const fn new(duration_secs: f32, peak_volume: f32) -> Self {
        Self {
            duration_secs,
            peak_volume,
        }
    }

    /// Burst at the default peak volume.
    pub const fn with_default_volume(duration_secs: f32) -> Self {
        Self::new(duration_secs, DEFAULT_PEAK_VOLUME)
    }

    /// Check that the request can be synthesized.
    pub fn validate(&self) -> Result<()> {
        validate_duration(self.duration_secs)?;
        validate_volume(self.peak_volume)
    }
}

fn validate_duration(duration_secs: f32) -> Result<()> {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Err(Error::InvalidArgument(format!(
            "duration must be positive, got {duration_secs}"
        )));
    }
    Ok(())
}

fn validate_volume(volume: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&volume) {
        return Err(Error::InvalidArgument(format!(
            "peak volume must be within 0.0..=1.0, got {volume}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_default_volume() {
        assert_eq!(ToneRequest::with_default_volume(440.0, 0.2).peak_volume, 0.1);
        assert_eq!(NoiseRequest::with_default_volume(0.2).peak_volume, 0.1);
    }

    #[test]
    fn test_invalid_requests() {
        assert!(ToneRequest::new(0.0, 0.2, 0.1).validate().is_err());
        assert!(ToneRequest::new(f32::NAN, 0.2, 0.1).validate().is_err());
        assert!(ToneRequest::new(440.0, -1.0, 0.1).validate().is_err());
        assert!(ToneRequest::new(440.0, 0.2, 1.5).validate().is_err());
        assert!(NoiseRequest::new(f32::INFINITY, 0.1).validate().is_err());
        assert!(NoiseRequest::new(0.8, 0.08).validate().is_ok());
    }

    proptest! {
        #[test]
        fn valid_tones_pass(
            freq in 1.0f32..20_000.0,
            dur in 0.001f32..10.0,
            vol in 0.0f32..=1.0,
        ) {
            prop_assert!(ToneRequest::new(freq, dur, vol).validate().is_ok());
        }
    }
}
