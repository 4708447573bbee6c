//! Cue identifiers and status events.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A gameplay event that has a sound attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cue {
    /// A pipe piece was rotated.
    Rotate,
    /// A closed loop was completed.
    LoopComplete,
    /// A new block spawned on the board.
    BlockAppear,
    /// The board is close to overflowing.
    Emergency,
    GameOver,
}

impl Cue {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rotate => "rotate",
            Self::LoopComplete => "loop-complete",
            Self::BlockAppear => "block-appear",
            Self::Emergency => "emergency",
            Self::GameOver => "game-over",
        }
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Status notifications emitted by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CueEvent {
    /// Sound effects were switched on or off.
    EffectsChanged(bool),
    /// Background music was switched on or off.
    MusicChanged(bool),
    /// No backend is available; the sound was only described.
    Fallback(String),
    /// Building or starting a sound failed; the cue was dropped.
    SynthesisFailed(String),
    /// The backend could not be acquired at initialization.
    BackendUnavailable(String),
    EmergencyStarted,
    EmergencyStopped,
}

/// Human-readable ON/OFF label used in status lines.
pub const fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "ON"
    } else {
        "OFF"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cue_display() {
        assert_eq!(Cue::GameOver.to_string(), "game-over");
        assert_eq!(Cue::LoopComplete.name(), "loop-complete");
    }

    #[test]
    fn test_on_off() {
        assert_eq!(on_off(true), "ON");
        assert_eq!(on_off(false), "OFF");
    }
}
