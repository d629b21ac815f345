//! Sample-rate conversion from the device rate down to the capture format.
//!
//! The `high-quality-audio` feature selects a sinc resampler; without it (or
//! when it fails) a linear interpolator with an anti-alias FIR low-pass is
//! used. Speech snippets this short tolerate the cheaper path well.

use super::TARGET_RATE;
#[cfg(feature = "high-quality-audio")]
use crate::log_debug;
#[cfg(feature = "high-quality-audio")]
use anyhow::{anyhow, Result};
#[cfg(feature = "high-quality-audio")]
use rubato::{InterpolationParameters, InterpolationType, Resampler, SincFixedIn, WindowFunction};
use std::f32::consts::PI;

const MIN_DEVICE_RATE: u32 = 2_000;
const MAX_DEVICE_RATE: u32 = 192_000;
const MAX_FIR_TAPS: usize = 129;

/// Resample `input` from `device_rate` to [`TARGET_RATE`].
pub(super) fn to_target_rate(input: &[f32], device_rate: u32) -> Vec<f32> {
    if input.is_empty() || device_rate == 0 || device_rate == TARGET_RATE {
        return input.to_vec();
    }

    #[cfg(feature = "high-quality-audio")]
    {
        match sinc_resample(input, device_rate) {
            Ok(output) => return output,
            Err(err) => {
                log_debug(&format!("sinc resampler failed ({err}); using linear fallback"));
            }
        }
    }

    linear_resample(input, device_rate)
}

#[cfg(feature = "high-quality-audio")]
fn sinc_resample(input: &[f32], device_rate: u32) -> Result<Vec<f32>> {
    if !(MIN_DEVICE_RATE..=MAX_DEVICE_RATE).contains(&device_rate) {
        return Err(anyhow!("unsupported device sample rate {device_rate}Hz"));
    }
    let ratio = f64::from(TARGET_RATE) / f64::from(device_rate);

    const CHUNK: usize = 256;
    let params = InterpolationParameters {
        sinc_len: 64,
        f_cutoff: 0.90,
        interpolation: InterpolationType::Cubic,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK, 1)
        .map_err(|e| anyhow!("failed to construct sinc resampler: {e:?}"))?;

    let expect = ((input.len() as f64) * ratio).round().max(1.0) as usize;
    let mut out = Vec::with_capacity(expect + CHUNK);
    let mut chunk = vec![0.0f32; CHUNK];
    for block in input.chunks(CHUNK) {
        // The resampler wants full chunks; pad the tail with its last sample.
        let pad = *block.last().unwrap_or(&0.0);
        chunk.fill(pad);
        chunk[..block.len()].copy_from_slice(block);
        let produced = resampler
            .process(std::slice::from_ref(&chunk), None)
            .map_err(|e| anyhow!("resampler process failed: {e:?}"))?;
        out.extend_from_slice(&produced[0]);
    }

    let last = *out.last().unwrap_or(&0.0);
    out.resize(expect, last);
    Ok(out)
}

/// Linear interpolation, preceded by a FIR low-pass when decimating so
/// 44.1/48 kHz microphones don't alias speech into the 16 kHz output.
pub(super) fn linear_resample(input: &[f32], device_rate: u32) -> Vec<f32> {
    if input.is_empty() || device_rate == 0 {
        return input.to_vec();
    }
    if !(MIN_DEVICE_RATE..=MAX_DEVICE_RATE).contains(&device_rate) {
        return input.to_vec();
    }

    let ratio = TARGET_RATE as f32 / device_rate as f32;
    let source = if device_rate > TARGET_RATE {
        low_pass(input, device_rate)
    } else {
        input.to_vec()
    };

    let out_len = (source.len() as f32 * ratio).round() as usize;
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let pos = i as f32 / ratio;
        let idx = pos.floor() as usize;
        let frac = pos - idx as f32;
        let a = source[idx.min(source.len() - 1)];
        let b = source[(idx + 1).min(source.len() - 1)];
        out.push(a * (1.0 - frac) + b * frac);
    }
    out
}

fn low_pass(input: &[f32], device_rate: u32) -> Vec<f32> {
    // Longer filters for harder decimation, always an odd tap count.
    let decimation = device_rate as f32 / TARGET_RATE as f32;
    let mut taps = (decimation * 4.0).ceil().max(11.0) as usize;
    if taps % 2 == 0 {
        taps += 1;
    }
    let taps = taps.min(MAX_FIR_TAPS);
    let cutoff = (TARGET_RATE as f32 * 0.5 / device_rate as f32).min(0.499);
    let coeffs = sinc_taps(cutoff, taps);
    let half = (taps / 2) as isize;

    let mut out = Vec::with_capacity(input.len());
    for n in 0..input.len() as isize {
        let mut acc = 0.0;
        for (k, coeff) in coeffs.iter().enumerate() {
            let idx = n + k as isize - half;
            if idx >= 0 && (idx as usize) < input.len() {
                acc += input[idx as usize] * coeff;
            }
        }
        out.push(acc);
    }
    out
}

/// Hamming-windowed sinc taps, normalized to unity gain.
pub(super) fn sinc_taps(normalized_cutoff: f32, taps: usize) -> Vec<f32> {
    let m = (taps - 1) as f32;
    let mut coeffs: Vec<f32> = (0..taps)
        .map(|n| {
            let centered = n as f32 - m / 2.0;
            let x = 2.0 * PI * normalized_cutoff * centered;
            let sinc = if centered == 0.0 {
                2.0 * normalized_cutoff
            } else {
                (2.0 * normalized_cutoff * x.sin()) / x
            };
            let window = 0.54 - 0.46 * ((2.0 * PI * n as f32) / m).cos();
            sinc * window
        })
        .collect();

    let sum: f32 = coeffs.iter().sum();
    if sum != 0.0 {
        for coeff in coeffs.iter_mut() {
            *coeff /= sum;
        }
    }
    coeffs
}
