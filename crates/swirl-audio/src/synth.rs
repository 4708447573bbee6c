//! Tone and noise synthesis, per-voice rendering, and the output mixer.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use crate::graph::{GainParam, OutputGain, Source, Voice};
use crossbeam_channel::Receiver;
use rand::Rng;
use std::f64::consts::TAU;
use swirl_core::{NoiseRequest, Result, ToneRequest};
use tracing::trace;

/// Fade-in length of a tone envelope.
pub const TONE_ATTACK_SECS: f64 = 0.01;

/// Fade-in length of a noise envelope.
pub const NOISE_ATTACK_SECS: f64 = 0.005;

/// Level the exponential fade-out reaches at the end of a sound.
pub const ENVELOPE_FLOOR: f32 = 0.001;

/// Build a sine voice for a tone request.
///
/// The envelope ramps linearly from silence to the peak volume over
/// [`TONE_ATTACK_SECS`], then decays exponentially to [`ENVELOPE_FLOOR`]
/// at the end of the tone.
pub fn tone_voice(request: &ToneRequest) -> Result<Voice> {
    request.validate()?;

    let duration = f64::from(request.duration_secs);
    let gain = attack_decay(request.peak_volume, TONE_ATTACK_SECS, duration)?;

    Voice::new(
        Source::Sine {
            frequency_hz: request.frequency_hz,
        },
        gain,
        duration,
    )
}

/// Build a white-noise voice for a noise request.
///
/// The samples carry the peak volume; the envelope fades them in over
/// [`NOISE_ATTACK_SECS`] and out to [`ENVELOPE_FLOOR`].
pub fn noise_voice<R: Rng + ?Sized>(
    request: &NoiseRequest,
    sample_rate: u32,
    rng: &mut R,
) -> Result<Voice> {
    request.validate()?;

    let duration = f64::from(request.duration_secs);
    let len = (f64::from(sample_rate) * duration).round() as usize;
    let samples = white_noise(len, request.peak_volume, rng);
    let gain = attack_decay(1.0, NOISE_ATTACK_SECS, duration)?;

    Voice::new(Source::Buffer(samples.into()), gain, duration)
}

/// Uniform random samples in `-volume..=volume`.
pub fn white_noise<R: Rng + ?Sized>(len: usize, volume: f32, rng: &mut R) -> Vec<f32> {
    (0..len)
        .map(|_| rng.gen_range(-1.0f32..=1.0) * volume)
        .collect()
}

fn attack_decay(peak: f32, attack: f64, duration: f64) -> Result<GainParam> {
    let mut gain = GainParam::new(1.0);
    gain.set_value_at_time(0.0, 0.0)?
        .linear_ramp_to_value_at_time(peak, attack)?
        .exponential_ramp_to_value_at_time(ENVELOPE_FLOOR, duration.max(attack))?;
    Ok(gain)
}

/// Renders a single voice at a fixed sample rate.
#[derive(Debug)]
pub struct VoiceRenderer {
    voice: Voice,
    sample_rate: f64,
    frame: u64,
    phase: f64,
}

impl VoiceRenderer {
    pub fn new(voice: Voice, sample_rate: u32) -> Self {
        Self {
            voice,
            sample_rate: f64::from(sample_rate),
            frame: 0,
            phase: 0.0,
        }
    }

    /// Next mono sample, or `None` once the voice has stopped.
    #[allow(clippy::cast_precision_loss)]
    pub fn next_sample(&mut self) -> Option<f32> {
        let t = self.frame as f64 / self.sample_rate;
        if t >= self.voice.stop_at {
            return None;
        }

        let raw = match &self.voice.source {
            Source::Sine { frequency_hz } => {
                let value = (self.phase * TAU).sin() as f32;
                self.phase = (self.phase + f64::from(*frequency_hz) / self.sample_rate).fract();
                value
            }
            Source::Buffer(samples) => samples.get(self.frame as usize).copied().unwrap_or(0.0),
        };

        self.frame += 1;
        Some(raw * self.voice.gain.value_at(t))
    }

    pub fn is_finished(&self) -> bool {
        #[allow(clippy::cast_precision_loss)]
        let t = self.frame as f64 / self.sample_rate;
        t >= self.voice.stop_at
    }
}

/// Sums active voices into interleaved output frames.
pub struct Mixer {
    incoming: Receiver<Voice>,
    voices: Vec<VoiceRenderer>,
    gain: OutputGain,
    sample_rate: u32,
    channels: usize,
}

impl Mixer {
    pub fn new(incoming: Receiver<Voice>, gain: OutputGain, sample_rate: u32, channels: u16) -> Self {
        Self {
            incoming,
            voices: Vec::new(),
            gain,
            sample_rate,
            channels: usize::from(channels.max(1)),
        }
    }

    /// Number of voices still producing sound.
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Fill `out` with interleaved frames, picking up newly started voices.
    pub fn fill(&mut self, out: &mut [f32]) {
        for voice in self.incoming.try_iter() {
            trace!("Voice started, stops after {:.3}s", voice.stop_at);
            self.voices.push(VoiceRenderer::new(voice, self.sample_rate));
        }

        let gain = self.gain.get();

        for frame in out.chunks_mut(self.channels) {
            let mixed: f32 = self
                .voices
                .iter_mut()
                .filter_map(VoiceRenderer::next_sample)
                .sum();

            let s = mixed * gain;
            // Soft clipping using tanh for smooth limiting
            let limited = if s.abs() > 0.9 { s.tanh() } else { s };
            frame.fill(limited);
        }

        self.voices.retain(|voice| !voice.is_finished());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn render_all(voice: Voice, sample_rate: u32) -> Vec<f32> {
        let mut renderer = VoiceRenderer::new(voice, sample_rate);
        std::iter::from_fn(|| renderer.next_sample()).collect()
    }

    #[test]
    fn test_tone_envelope_shape() {
        let voice = tone_voice(&ToneRequest::new(880.0, 0.2, 0.06)).unwrap();
        let events = voice.gain.events();
        assert_eq!(events.len(), 3);
        assert!((voice.gain.value_at(TONE_ATTACK_SECS) - 0.06).abs() < 1e-6);
        assert!((voice.gain.value_at(0.2) - ENVELOPE_FLOOR).abs() < 1e-6);
        assert!((voice.stop_at - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_tone_length_and_bounds() {
        let samples = render_all(tone_voice(&ToneRequest::new(440.0, 0.1, 0.1)).unwrap(), 48000);
        assert!((4799..=4801).contains(&samples.len()));
        assert!(samples.iter().all(|s| s.abs() <= 0.1 + 1e-6));
        assert!(samples[0].abs() < 1e-6);
    }

    #[test]
    fn test_noise_buffer_size_and_scale() {
        let mut rng = StdRng::seed_from_u64(7);
        let voice = noise_voice(&NoiseRequest::new(0.8, 0.08), 48000, &mut rng).unwrap();
        let Source::Buffer(samples) = &voice.source else {
            panic!("noise voice must carry a buffer");
        };
        assert_eq!(samples.len(), 38400);
        assert!(samples.iter().all(|s| s.abs() <= 0.08));
        assert!(samples.iter().any(|s| *s != 0.0));
        assert!((voice.gain.value_at(NOISE_ATTACK_SECS) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_white_noise_is_deterministic_for_seed() {
        let a = white_noise(64, 0.5, &mut StdRng::seed_from_u64(1));
        let b = white_noise(64, 0.5, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_request_is_rejected() {
        assert!(tone_voice(&ToneRequest::new(f32::NAN, 0.2, 0.1)).is_err());
        let mut rng = StdRng::seed_from_u64(0);
        assert!(noise_voice(&NoiseRequest::new(0.0, 0.1), 48000, &mut rng).is_err());
    }

    #[test]
    fn test_mixer_sums_voices_and_applies_gain() {
        let (tx, rx) = unbounded();
        let gain = OutputGain::new(0.5);
        let mut mixer = Mixer::new(rx, gain, 100, 2);

        let flat = |level: f32| {
            let mut param = GainParam::new(1.0);
            param.set_value_at_time(1.0, 0.0).unwrap();
            Voice::new(Source::Buffer(vec![level; 10].into()), param, 0.1).unwrap()
        };
        tx.send(flat(0.2)).unwrap();
        tx.send(flat(0.4)).unwrap();

        let mut out = [0.0f32; 4];
        mixer.fill(&mut out);
        assert_eq!(mixer.active_voices(), 2);
        for sample in out {
            assert!((sample - 0.3).abs() < 1e-6);
        }

        let mut rest = [0.0f32; 40];
        mixer.fill(&mut rest);
        assert_eq!(mixer.active_voices(), 0);
        assert!(rest[16..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_mixer_soft_limits() {
        let (tx, rx) = unbounded();
        let mut mixer = Mixer::new(rx, OutputGain::new(1.0), 100, 1);
        let mut param = GainParam::new(1.0);
        param.set_value_at_time(1.0, 0.0).unwrap();
        for _ in 0..4 {
            let voice =
                Voice::new(Source::Buffer(vec![0.9; 4].into()), param.clone(), 0.04).unwrap();
            tx.send(voice).unwrap();
        }

        let mut out = [0.0f32; 2];
        mixer.fill(&mut out);
        assert!(out.iter().all(|s| *s <= 1.0 && *s > 0.9));
    }
}
