//! System microphone recording via CPAL.
//!
//! Handles device selection and format conversion. Whatever the hardware
//! delivers is normalized to the 16 kHz mono i16 window the rest of the
//! pipeline expects.

use super::resample::to_target_rate;
use super::{fit_window, to_i16_samples, TARGET_RATE};
use crate::log_debug;
use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Audio input device wrapper.
pub struct Recorder {
    device: cpal::Device,
}

impl Recorder {
    /// List microphone names so the CLI can expose a human-friendly selector.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().context("no input devices available")?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Create a recorder, optionally forcing a specific device so users can
    /// pick the right microphone when a laptop exposes several inputs.
    ///
    /// # Errors
    ///
    /// Fails when the named device does not exist or no default input device
    /// is available. Capture cannot proceed without one, so this is fatal.
    pub fn new(preferred_device: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();
        let device = match preferred_device {
            Some(name) => {
                let mut devices = host.input_devices().context("no input devices available")?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| anyhow!("input device '{name}' not found"))?
            }
            None => host
                .default_input_device()
                .context("no default input device available")?,
        };
        Ok(Self { device })
    }

    /// Get the name of the active recording device.
    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string())
    }

    /// Record exactly `duration` of audio and return it as 16 kHz mono i16.
    ///
    /// Blocks for the full window; there is no early stop on silence.
    pub fn record_window(&self, duration: Duration) -> Result<Vec<i16>> {
        let default_config = self.device.default_input_config()?;
        let format = default_config.sample_format();
        let device_config: StreamConfig = default_config.clone().into();
        let device_sample_rate = device_config.sample_rate.0;
        let channels = usize::from(device_config.channels.max(1));
        let device_name = self.device_name();

        log_debug(&format!(
            "recorder config: format={format:?} sample_rate={device_sample_rate}Hz channels={channels}"
        ));

        // cpal delivers samples on a callback thread; collect them in a shared
        // buffer so ownership stays on the caller side.
        let expected_samples =
            (duration.as_secs_f64() * device_sample_rate as f64 * channels as f64).ceil() as usize;
        let buffer = Arc::new(Mutex::new(Vec::<f32>::with_capacity(expected_samples)));
        let buffer_clone = buffer.clone();

        let err_fn = |err| log_debug(&format!("audio stream error: {err}"));

        // Convert every supported sample type to f32 up front so the rest of
        // the pipeline stays format-agnostic.
        let stream = match format {
            SampleFormat::F32 => self.device.build_input_stream(
                &device_config,
                move |data: &[f32], _| {
                    if let Ok(mut buf) = buffer_clone.lock() {
                        extend_mono(&mut buf, data, channels, |sample| sample);
                    }
                },
                err_fn,
                None,
            )?,
            SampleFormat::I16 => self.device.build_input_stream(
                &device_config,
                move |data: &[i16], _| {
                    if let Ok(mut buf) = buffer_clone.lock() {
                        extend_mono(&mut buf, data, channels, |sample| {
                            f32::from(sample) / 32_768.0
                        });
                    }
                },
                err_fn,
                None,
            )?,
            SampleFormat::U16 => self.device.build_input_stream(
                &device_config,
                move |data: &[u16], _| {
                    if let Ok(mut buf) = buffer_clone.lock() {
                        extend_mono(&mut buf, data, channels, |sample| {
                            (f32::from(sample) - 32_768.0) / 32_768.0
                        });
                    }
                },
                err_fn,
                None,
            )?,
            other => return Err(anyhow!("unsupported sample format: {other:?}")),
        };

        stream.play()?;
        std::thread::sleep(duration);
        if let Err(err) = stream.pause() {
            log_debug(&format!("failed to pause audio stream: {err}"));
        }
        drop(stream);

        let samples = buffer
            .lock()
            .map_err(|_| anyhow!("audio buffer lock poisoned"))?;

        if samples.is_empty() {
            return Err(anyhow!(
                "no samples captured from '{device_name}'; check microphone permissions and availability. {}",
                mic_permission_hint()
            ));
        }

        let resampled = to_target_rate(&samples, device_sample_rate);
        let window_len = (duration.as_secs_f64() * f64::from(TARGET_RATE)).round() as usize;
        Ok(fit_window(to_i16_samples(&resampled), window_len))
    }
}

impl crate::session::AudioSource for Recorder {
    fn record_window(&self, window: Duration) -> Result<Vec<i16>> {
        Recorder::record_window(self, window)
    }
}

/// Append `data` to `buf` as mono f32, averaging interleaved channels.
pub(super) fn extend_mono<T, F>(buf: &mut Vec<f32>, data: &[T], channels: usize, convert: F)
where
    T: Copy,
    F: Fn(T) -> f32,
{
    if channels <= 1 {
        buf.extend(data.iter().copied().map(convert));
        return;
    }
    for frame in data.chunks(channels) {
        let sum: f32 = frame.iter().copied().map(&convert).sum();
        buf.push(sum / frame.len() as f32);
    }
}

fn mic_permission_hint() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "macOS: System Settings > Privacy & Security > Microphone (enable your terminal)."
    }
    #[cfg(target_os = "linux")]
    {
        "Linux: check PipeWire/PulseAudio permissions and ensure the device is not muted."
    }
    #[cfg(target_os = "windows")]
    {
        "Windows: Settings > Privacy & Security > Microphone (allow access for your terminal)."
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        "Check OS microphone permissions."
    }
}
