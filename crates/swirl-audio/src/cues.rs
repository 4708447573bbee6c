//! Sound design for every gameplay cue.
//!
//! Staggered cues are expressed as `(delay, request)` lists that the
//! dispatcher hands to its scheduler.

use std::time::Duration;
use swirl_core::{NoiseRequest, ToneRequest};

/// Short click played when a piece rotates.
pub const ROTATE_NOISE: NoiseRequest = NoiseRequest::new(0.03, 0.05);

/// Low wood-block knock played when a block spawns.
pub const BLOCK_APPEAR_TONE: ToneRequest = ToneRequest::new(150.0, 0.1, 0.03);

/// Fundamental of the loop-complete harmonic series.
pub const LOOP_BASE_FREQUENCY_HZ: f32 = 200.0;

/// Highest harmonic a loop can reach.
pub const LOOP_MAX_HARMONICS: u32 = 16;

/// Step between harmonics; matches the loop highlight animation.
pub const LOOP_STEP: Duration = Duration::from_millis(150);

pub const LOOP_TONE_SECS: f32 = 0.3;
pub const LOOP_BASE_VOLUME: f32 = 0.1;

/// Period of the emergency beep cycle.
pub const EMERGENCY_PERIOD: Duration = Duration::from_millis(800);

/// Delay between the high and low beep of one cycle.
pub const EMERGENCY_LOW_DELAY: Duration = Duration::from_millis(250);

pub const EMERGENCY_HIGH_TONE: ToneRequest = ToneRequest::new(880.0, 0.2, 0.06);
pub const EMERGENCY_LOW_TONE: ToneRequest = ToneRequest::new(440.0, 0.2, 0.06);

/// Layered low frequencies of the game-over rumble.
pub const GAME_OVER_FREQUENCIES_HZ: [f32; 5] = [60.0, 80.0, 120.0, 150.0, 200.0];
pub const GAME_OVER_TONE_SECS: f32 = 1.0;
pub const GAME_OVER_VOLUME: f32 = 0.12;
pub const GAME_OVER_STAGGER: Duration = Duration::from_millis(30);

/// Explosion texture layered over the rumble.
pub const GAME_OVER_NOISE: NoiseRequest = NoiseRequest::new(0.8, 0.08);
pub const GAME_OVER_NOISE_DELAY: Duration = Duration::from_millis(100);

/// Ascending harmonic arpeggio for a completed loop of `loop_length` pipes.
///
/// Harmonic `i` (1-based) plays at `200 * i` Hz with volume `0.1 / sqrt(i)`,
/// `(i - 1) * 150` ms after the call. At most 16 harmonics are produced.
pub fn loop_complete_sequence(loop_length: u32) -> Vec<(Duration, ToneRequest)> {
    let harmonics = loop_length.min(LOOP_MAX_HARMONICS);

    (1..=harmonics)
        .map(|i| {
            let index = i as f32;
            let tone = ToneRequest::new(
                LOOP_BASE_FREQUENCY_HZ * index,
                LOOP_TONE_SECS,
                LOOP_BASE_VOLUME / index.sqrt(),
            );
            (LOOP_STEP * (i - 1), tone)
        })
        .collect()
}

/// The five staggered rumble tones of the game-over cue.
pub fn game_over_tones() -> Vec<(Duration, ToneRequest)> {
    GAME_OVER_FREQUENCIES_HZ
        .iter()
        .zip(0u32..)
        .map(|(&frequency, i)| {
            (
                GAME_OVER_STAGGER * i,
                ToneRequest::new(frequency, GAME_OVER_TONE_SECS, GAME_OVER_VOLUME),
            )
        })
        .collect()
}

/// The noise burst layered on the game-over rumble.
pub const fn game_over_noise() -> (Duration, NoiseRequest) {
    (GAME_OVER_NOISE_DELAY, GAME_OVER_NOISE)
}
