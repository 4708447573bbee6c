//! # swirl-audio
//!
//! Sound cue engine for the Swirl puzzle game.
//!
//! Features:
//! - Fire-and-forget cue triggers with effects/music toggles
//! - Synthesized sine tones and white-noise bursts with gain envelopes
//! - Injectable scheduling (tokio timers or a virtual clock)
//! - Low-latency cpal output with graceful fallback when no device exists

pub mod backend;
pub mod cues;
pub mod dispatcher;
pub mod graph;
pub mod output;
pub mod scheduler;
pub mod synth;

pub use backend::AudioBackend;
pub use dispatcher::CueDispatcher;
pub use graph::{GainParam, OutputGain, Source, Voice};
pub use output::CpalBackend;
pub use scheduler::{ManualScheduler, Scheduler, TimerId, TokioScheduler};
