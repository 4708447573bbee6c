//! Core domain types for Swirl.

pub mod cue;
pub mod request;

pub use cue::{on_off, Cue, CueEvent};
pub use request::{NoiseRequest, ToneRequest, DEFAULT_PEAK_VOLUME};
