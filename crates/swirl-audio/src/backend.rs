//! Platform audio backend capability.

use crate::graph::{OutputGain, Voice};
use swirl_core::Result;

/// Something that can render voices to an output device.
///
/// Implementations mix every started voice additively into one
/// destination whose level is the shared [`OutputGain`].
pub trait AudioBackend: Send + Sync {
    /// Output sample rate in Hz, used to size noise buffers.
    fn sample_rate(&self) -> u32;

    /// The gain node every voice is wired through.
    fn output_gain(&self) -> Result<OutputGain>;

    /// Start playing a voice immediately.
    fn start(&self, voice: Voice) -> Result<()>;
}
