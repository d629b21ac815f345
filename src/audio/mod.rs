//! Fixed-window microphone capture.
//!
//! Audio is recorded via CPAL in the device's native format, downmixed to
//! mono, resampled to 16 kHz, and returned as 16-bit signed samples sized to
//! exactly the requested window. No voice activity detection: the full window
//! is captured whether or not anyone is speaking.

/// Sample rate of every captured window.
pub const TARGET_RATE: u32 = 16_000;

/// Channel count of every captured window.
pub const TARGET_CHANNELS: u32 = 1;

mod recorder;
mod resample;
#[cfg(test)]
mod tests;

pub use recorder::Recorder;

/// Convert normalized f32 samples to the 16-bit signed form the transcription
/// layer consumes.
pub(crate) fn to_i16_samples(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * 32_767.0) as i16)
        .collect()
}

/// Pad with silence or truncate so a capture window always holds exactly
/// `len` samples.
pub(crate) fn fit_window(mut samples: Vec<i16>, len: usize) -> Vec<i16> {
    samples.resize(len, 0);
    samples
}
