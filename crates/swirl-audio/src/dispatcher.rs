//! Cue dispatcher: turns gameplay events into sounds.
//!
//! Every trigger is fire-and-forget. Failures are logged and reported as
//! [`CueEvent`]s, never returned to the caller.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use crate::backend::AudioBackend;
use crate::cues::{
    self, BLOCK_APPEAR_TONE, EMERGENCY_HIGH_TONE, EMERGENCY_LOW_DELAY, EMERGENCY_LOW_TONE,
    EMERGENCY_PERIOD, ROTATE_NOISE,
};
use crate::graph::OutputGain;
use crate::output::CpalBackend;
use crate::scheduler::{Scheduler, TimerId};
use crate::synth;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use swirl_core::{on_off, Cue, CueEvent, DispatcherConfig, Error, NoiseRequest, Result, ToneRequest};
use tracing::{debug, error, info, trace, warn};

/// Backend handle and the gain node every voice goes through.
///
/// Both exist together or not at all.
struct AudioContext {
    backend: Arc<dyn AudioBackend>,
    output_gain: OutputGain,
}

/// What happened to a single sound.
enum CueOutcome {
    Played,
    /// No backend; the sound was only logged.
    Fallback,
    Failed(Error),
}

struct Inner {
    effects_enabled: AtomicBool,
    music_enabled: AtomicBool,
    output: Option<AudioContext>,
    /// The active emergency cycle, if any.
    emergency: Mutex<Option<TimerId>>,
    scheduler: Arc<dyn Scheduler>,
    event_tx: Sender<CueEvent>,
    event_rx: Receiver<CueEvent>,
}

/// Plays sound cues for gameplay events.
///
/// Create one at startup and clone it into every component that needs to
/// trigger cues; clones share all state.
#[derive(Clone)]
pub struct CueDispatcher {
    inner: Arc<Inner>,
}

impl CueDispatcher {
    /// Acquire an audio backend and build the dispatcher.
    ///
    /// If `open_backend` fails the dispatcher runs in fallback mode for
    /// its whole lifetime: cues are logged instead of played.
    pub fn initialize<F>(
        config: &DispatcherConfig,
        scheduler: Arc<dyn Scheduler>,
        open_backend: F,
    ) -> Self
    where
        F: FnOnce() -> Result<Arc<dyn AudioBackend>>,
    {
        let (event_tx, event_rx) = bounded(config.event_capacity.max(1));

        let output = match open_backend().and_then(|backend| {
            let output_gain = backend.output_gain()?;
            output_gain.set(config.master_volume);
            Ok(AudioContext {
                backend,
                output_gain,
            })
        }) {
            Ok(context) => {
                debug!(
                    "Cue output ready at {} Hz, gain {:.2}",
                    context.backend.sample_rate(),
                    context.output_gain.get()
                );
                Some(context)
            }
            Err(e) => {
                warn!("Audio backend unavailable, cues will only be logged: {e}");
                let _ = event_tx.try_send(CueEvent::BackendUnavailable(e.to_string()));
                None
            }
        };

        Self {
            inner: Arc::new(Inner {
                effects_enabled: AtomicBool::new(config.effects_enabled),
                music_enabled: AtomicBool::new(config.music_enabled),
                output,
                emergency: Mutex::new(None),
                scheduler,
                event_tx,
                event_rx,
            }),
        }
    }

    /// Build the dispatcher on the default cpal output device.
    pub fn with_default_output(config: &DispatcherConfig, scheduler: Arc<dyn Scheduler>) -> Self {
        Self::initialize(config, scheduler, || {
            let backend = CpalBackend::open(config.master_volume)?;
            Ok(Arc::new(backend) as Arc<dyn AudioBackend>)
        })
    }

    /// A piece was rotated: short noise click.
    pub fn play_rotate(&self) {
        if !self.inner.effects_enabled() {
            return;
        }
        debug!("Cue {}", Cue::Rotate);
        self.inner.emit_noise(ROTATE_NOISE);
    }

    /// A loop of `loop_length` pipes was closed: ascending harmonic arpeggio.
    pub fn play_loop_complete(&self, loop_length: u32) {
        if !self.inner.effects_enabled() {
            return;
        }
        debug!("Cue {} (length {loop_length})", Cue::LoopComplete);
        for (delay, tone) in cues::loop_complete_sequence(loop_length) {
            self.inner.schedule_tone(delay, tone);
        }
    }

    /// A block spawned: low percussive knock.
    pub fn play_block_appear(&self) {
        if !self.inner.effects_enabled() {
            return;
        }
        debug!("Cue {}", Cue::BlockAppear);
        self.inner.emit_tone(BLOCK_APPEAR_TONE);
    }

    /// Start (or restart) the repeating emergency beeps.
    pub fn play_emergency(&self) {
        if !self.inner.effects_enabled() {
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        {
            let mut emergency = self.inner.emergency.lock();
            if let Some(previous) = emergency.take() {
                self.inner.scheduler.cancel(previous);
                debug!("Replacing emergency cycle {:?}", previous);
            }
            let id = self.inner.scheduler.schedule_repeating(
                EMERGENCY_PERIOD,
                Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.emergency_cycle();
                    }
                }),
            );
            *emergency = Some(id);
        }

        info!("Cue {} started", Cue::Emergency);
        self.inner.notify(CueEvent::EmergencyStarted);
    }

    /// Stop the emergency beeps. Does nothing if none are running.
    pub fn stop_emergency(&self) {
        let active = self.inner.emergency.lock().take();
        if let Some(id) = active {
            self.inner.scheduler.cancel(id);
            info!("Cue {} stopped", Cue::Emergency);
            self.inner.notify(CueEvent::EmergencyStopped);
        }
    }

    /// Game over: layered low rumble plus an explosion burst.
    pub fn play_game_over(&self) {
        if !self.inner.effects_enabled() {
            return;
        }
        debug!("Cue {}", Cue::GameOver);
        for (delay, tone) in cues::game_over_tones() {
            self.inner.schedule_tone(delay, tone);
        }
        let (delay, noise) = cues::game_over_noise();
        let inner = Arc::clone(&self.inner);
        self.inner
            .scheduler
            .schedule_once(delay, Box::new(move || inner.emit_noise(noise)));
    }

    /// Switch sound effects on or off.
    ///
    /// Sounds that are already playing or scheduled are not stopped.
    pub fn set_effects_enabled(&self, enabled: bool) {
        self.inner.effects_enabled.store(enabled, Ordering::Release);
        info!("Sound effects: {}", on_off(enabled));
        self.inner.notify(CueEvent::EffectsChanged(enabled));
    }

    /// Switch background music on or off.
    pub fn set_music_enabled(&self, enabled: bool) {
        self.inner.music_enabled.store(enabled, Ordering::Release);
        info!("Background music: {}", on_off(enabled));
        self.inner.notify(CueEvent::MusicChanged(enabled));
        self.toggle_music();
    }

    /// Returns whether background music was requested.
    fn toggle_music(&self) -> bool {
        if !self.music_enabled() {
            return false;
        }
        // No music tracks ship with the game yet
        info!("Background music requested, but no tracks are available");
        true
    }

    pub fn effects_enabled(&self) -> bool {
        self.inner.effects_enabled()
    }

    pub fn music_enabled(&self) -> bool {
        self.inner.music_enabled.load(Ordering::Acquire)
    }

    /// Whether an emergency cycle is currently repeating.
    pub fn is_emergency_active(&self) -> bool {
        self.inner.emergency.lock().is_some()
    }

    /// Whether a backend was acquired at initialization.
    pub fn has_output(&self) -> bool {
        self.inner.output.is_some()
    }

    /// The shared output gain, when a backend is available.
    pub fn output_gain(&self) -> Option<OutputGain> {
        self.inner
            .output
            .as_ref()
            .map(|context| context.output_gain.clone())
    }

    /// Try to receive a status event without blocking.
    pub fn try_recv_event(&self) -> Option<CueEvent> {
        self.inner.event_rx.try_recv().ok()
    }
}

impl Inner {
    fn effects_enabled(&self) -> bool {
        self.effects_enabled.load(Ordering::Acquire)
    }

    fn emergency_cycle(self: &Arc<Self>) {
        if !self.effects_enabled() {
            trace!("Emergency cycle skipped, effects are off");
            return;
        }
        self.emit_tone(EMERGENCY_HIGH_TONE);
        self.schedule_tone(EMERGENCY_LOW_DELAY, EMERGENCY_LOW_TONE);
    }

    fn schedule_tone(self: &Arc<Self>, delay: Duration, tone: ToneRequest) {
        let inner = Arc::clone(self);
        self.scheduler
            .schedule_once(delay, Box::new(move || inner.emit_tone(tone)));
    }

    fn emit_tone(&self, tone: ToneRequest) {
        let outcome = match &self.output {
            None => CueOutcome::Fallback,
            Some(context) => match synth::tone_voice(&tone)
                .and_then(|voice| context.backend.start(voice))
            {
                Ok(()) => CueOutcome::Played,
                Err(e) => CueOutcome::Failed(e),
            },
        };
        self.report(
            outcome,
            || format!("tone {}Hz, {}s", tone.frequency_hz, tone.duration_secs),
        );
    }

    fn emit_noise(&self, noise: NoiseRequest) {
        let outcome = match &self.output {
            None => CueOutcome::Fallback,
            Some(context) => {
                let sample_rate = context.backend.sample_rate();
                match synth::noise_voice(&noise, sample_rate, &mut rand::thread_rng())
                    .and_then(|voice| context.backend.start(voice))
                {
                    Ok(()) => CueOutcome::Played,
                    Err(e) => CueOutcome::Failed(e),
                }
            }
        };
        self.report(outcome, || format!("white noise {}s", noise.duration_secs));
    }

    fn report(&self, outcome: CueOutcome, describe: impl FnOnce() -> String) {
        match outcome {
            CueOutcome::Played => trace!("Started {}", describe()),
            CueOutcome::Fallback => {
                let what = describe();
                debug!("No audio output, skipped {what}");
                self.notify(CueEvent::Fallback(what));
            }
            CueOutcome::Failed(e) => {
                let what = describe();
                if e.is_per_cue() {
                    warn!("Failed to play {what}: {e}");
                } else {
                    error!("Audio output failed while playing {what}: {e}");
                }
                self.notify(CueEvent::SynthesisFailed(format!("{what}: {e}")));
            }
        }
    }

    fn notify(&self, event: CueEvent) {
        if self.event_tx.try_send(event).is_err() {
            trace!("Status event dropped, channel full");
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(id) = self.emergency.get_mut().take() {
            self.scheduler.cancel(id);
            debug!("Emergency cycle {:?} cancelled on shutdown", id);
        }
    }
}
