//! # swirl-core
//!
//! Core types, configuration, and error handling for the Swirl cue engine.

pub mod config;
pub mod error;
pub mod types;

pub use config::DispatcherConfig;
pub use error::{Error, Result};
pub use types::*;
