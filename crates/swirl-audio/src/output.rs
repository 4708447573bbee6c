//! Audio output using cpal.

use crate::backend::AudioBackend;
use crate::graph::{OutputGain, Voice};
use crate::synth::Mixer;
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Device, SampleFormat, Stream, StreamConfig,
};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use swirl_core::{Error, Result};
use tracing::{debug, error, info};

/// Format the output stream settled on.
#[derive(Debug, Clone, Copy)]
struct OutputConfig {
    sample_rate: u32,
    channels: u16,
}

/// Backend that plays voices on the default cpal output device.
///
/// The stream lives on its own thread because `cpal::Stream` is not `Send`.
/// Dropping the backend stops the stream.
pub struct CpalBackend {
    voice_tx: Sender<Voice>,
    gain: OutputGain,
    sample_rate: u32,
    /// Closing this channel tells the output thread to shut down.
    _shutdown_tx: Sender<()>,
}

impl CpalBackend {
    /// Open the default output device.
    pub fn open(master_volume: f32) -> Result<Self> {
        let (voice_tx, voice_rx) = unbounded();
        let (ready_tx, ready_rx) = bounded::<Result<(OutputConfig, String)>>(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let gain = OutputGain::new(master_volume);
        let stream_gain = gain.clone();

        std::thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || match open_stream(voice_rx, stream_gain) {
                Ok((stream, config, device_name)) => {
                    let _ = ready_tx.send(Ok((config, device_name)));
                    // Park until the backend is dropped
                    let _ = shutdown_rx.recv();
                    debug!("Audio output thread shutting down");
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| {
                Error::BackendUnavailable(format!("Failed to spawn output thread: {e}"))
            })?;

        let (config, device_name) = ready_rx.recv().map_err(|e| {
            Error::BackendUnavailable(format!("Output thread exited during startup: {e}"))
        })??;

        info!(
            "Audio output initialized: {} Hz, {} channels, device: {}",
            config.sample_rate, config.channels, device_name
        );

        Ok(Self {
            voice_tx,
            gain,
            sample_rate: config.sample_rate,
            _shutdown_tx: shutdown_tx,
        })
    }
}

impl AudioBackend for CpalBackend {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn output_gain(&self) -> Result<OutputGain> {
        Ok(self.gain.clone())
    }

    fn start(&self, voice: Voice) -> Result<()> {
        self.voice_tx
            .send(voice)
            .map_err(|e| Error::Synthesis(format!("Output stream is gone: {e}")))
    }
}

fn open_stream(
    voice_rx: Receiver<Voice>,
    gain: OutputGain,
) -> Result<(Stream, OutputConfig, String)> {
    let host = cpal::default_host();

    let device = host
        .default_output_device()
        .ok_or_else(|| Error::BackendUnavailable("No output device found".to_string()))?;

    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

    let supported_config = device.default_output_config().map_err(|e| {
        Error::BackendUnavailable(format!("Failed to get output config: {e}"))
    })?;

    debug!("Supported output config: {:?}", supported_config);

    let sample_format = supported_config.sample_format();
    let config: StreamConfig = supported_config.into();

    let output_config = OutputConfig {
        sample_rate: config.sample_rate.0,
        channels: config.channels,
    };

    let mixer = Mixer::new(voice_rx, gain, output_config.sample_rate, config.channels);

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, mixer)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, mixer)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, mixer)?,
        _ => {
            return Err(Error::BackendUnavailable(format!(
                "Unsupported sample format: {sample_format:?}"
            )));
        }
    };

    stream
        .play()
        .map_err(|e| Error::BackendUnavailable(format!("Failed to start stream: {e}")))?;

    Ok((stream, output_config, device_name))
}

fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
    device: &Device,
    config: &StreamConfig,
    mut mixer: Mixer,
) -> Result<Stream> {
    let err_fn = |err| {
        error!("Audio stream error: {err}");
    };

    let mut mix_buffer: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                mix_buffer.resize(data.len(), 0.0);
                mixer.fill(&mut mix_buffer);
                for (sample, mixed) in data.iter_mut().zip(&mix_buffer) {
                    *sample = T::from_sample(*mixed);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| Error::BackendUnavailable(format!("Failed to build stream: {e}")))
}
