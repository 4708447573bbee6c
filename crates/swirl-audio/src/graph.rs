//! Audio graph model: gain automation, signal sources, and voices.
//!
//! Every sound is an independent [`Voice`] mixed into a single shared
//! output whose level is controlled by an [`OutputGain`].

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use parking_lot::Mutex;
use std::sync::Arc;
use swirl_core::{Error, Result};

/// How a gain automation event reaches its target value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampKind {
    /// Jump to the value at the event time.
    Set,
    /// Interpolate linearly from the previous event.
    Linear,
    /// Interpolate exponentially from the previous event.
    Exponential,
}

/// A single scheduled change of a gain value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Automation {
    pub kind: RampKind,
    pub value: f32,
    /// Seconds since the voice started.
    pub time: f64,
}

/// Time-varying gain, evaluated relative to the start of a voice.
///
/// Events must be appended in non-decreasing time order.
#[derive(Debug, Clone, PartialEq)]
pub struct GainParam {
    default_value: f32,
    events: Vec<Automation>,
}

impl GainParam {
    /// Create a parameter that holds `default_value` until the first event.
    pub const fn new(default_value: f32) -> Self {
        Self {
            default_value,
            events: Vec::new(),
        }
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) -> Result<&mut Self> {
        self.push(RampKind::Set, value, time)
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, time: f64) -> Result<&mut Self> {
        self.push(RampKind::Linear, value, time)
    }

    /// Exponential ramps can only target strictly positive values.
    pub fn exponential_ramp_to_value_at_time(
        &mut self,
        value: f32,
        time: f64,
    ) -> Result<&mut Self> {
        if value <= 0.0 {
            return Err(Error::Synthesis(format!(
                "exponential ramp target must be positive, got {value}"
            )));
        }
        self.push(RampKind::Exponential, value, time)
    }

    /// Scheduled events in time order.
    pub fn events(&self) -> &[Automation] {
        &self.events
    }

    /// Gain value at `t` seconds after the voice started.
    pub fn value_at(&self, t: f64) -> f32 {
        let mut prev_time = 0.0;
        let mut prev_value = self.default_value;

        for event in &self.events {
            if t < event.time {
                return match event.kind {
                    RampKind::Set => prev_value,
                    RampKind::Linear => {
                        let progress = ((t - prev_time) / (event.time - prev_time)) as f32;
                        (event.value - prev_value).mul_add(progress, prev_value)
                    }
                    RampKind::Exponential => {
                        if prev_value <= 0.0 {
                            // Exponential curves cannot leave zero
                            return prev_value;
                        }
                        let progress = (t - prev_time) / (event.time - prev_time);
                        let ratio = f64::from(event.value / prev_value);
                        (f64::from(prev_value) * ratio.powf(progress)) as f32
                    }
                };
            }
            prev_time = event.time;
            prev_value = event.value;
        }

        prev_value
    }

    fn push(&mut self, kind: RampKind, value: f32, time: f64) -> Result<&mut Self> {
        if !value.is_finite() {
            return Err(Error::Synthesis(format!("gain value is not finite: {value}")));
        }
        if !time.is_finite() || time < 0.0 {
            return Err(Error::Synthesis(format!("invalid automation time: {time}")));
        }
        if let Some(last) = self.events.last() {
            if time < last.time {
                return Err(Error::Synthesis(format!(
                    "automation at {time}s precedes previous event at {}s",
                    last.time
                )));
            }
        }
        self.events.push(Automation { kind, value, time });
        Ok(self)
    }
}

impl Default for GainParam {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Signal generator feeding a voice.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Sine oscillator.
    Sine { frequency_hz: f32 },
    /// Pre-rendered mono samples, played once at the output sample rate.
    Buffer(Arc<[f32]>),
}

/// One independent sound: a source shaped by its own gain envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    pub source: Source,
    pub gain: GainParam,
    /// Seconds after start at which the voice stops.
    pub stop_at: f64,
}

impl Voice {
    pub fn new(source: Source, gain: GainParam, stop_at: f64) -> Result<Self> {
        if !stop_at.is_finite() || stop_at <= 0.0 {
            return Err(Error::Synthesis(format!("invalid stop time: {stop_at}")));
        }
        Ok(Self {
            source,
            gain,
            stop_at,
        })
    }
}

/// Shared gain applied to the sum of all voices.
#[derive(Debug, Clone)]
pub struct OutputGain(Arc<Mutex<f32>>);

impl OutputGain {
    pub fn new(value: f32) -> Self {
        Self(Arc::new(Mutex::new(value.clamp(0.0, 1.0))))
    }

    pub fn get(&self) -> f32 {
        *self.0.lock()
    }

    /// Set the gain (clamped to 0.0 to 1.0).
    pub fn set(&self, value: f32) {
        *self.0.lock() = value.clamp(0.0, 1.0);
    }
}

impl Default for OutputGain {
    fn default() -> Self {
        Self::new(1.0)
    }
}
