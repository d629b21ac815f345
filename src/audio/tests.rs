use super::recorder::extend_mono;
use super::resample::{linear_resample, sinc_taps};
use super::{fit_window, to_i16_samples, TARGET_RATE};

#[test]
fn extend_mono_passes_single_channel_through() {
    let mut buf = Vec::new();
    extend_mono(&mut buf, &[16_384i16, -16_384], 1, |s| f32::from(s) / 32_768.0);
    assert_eq!(buf, vec![0.5, -0.5]);
}

#[test]
fn extend_mono_averages_stereo_frames() {
    let mut buf = Vec::new();
    extend_mono(&mut buf, &[0.2f32, 0.4, 0.6, 0.8], 2, |s| s);
    assert!((buf[0] - 0.3).abs() < 1e-6);
    assert!((buf[1] - 0.7).abs() < 1e-6);
}

#[test]
fn extend_mono_averages_trailing_partial_frame() {
    let mut buf = Vec::new();
    extend_mono(&mut buf, &[0.0f32, 1.0, 0.5], 2, |s| s);
    assert_eq!(buf.len(), 2);
    assert!((buf[1] - 0.5).abs() < 1e-6);
}

#[test]
fn linear_resample_halves_length_from_32k() {
    let input = vec![0.25f32; 1000];
    let out = linear_resample(&input, 2 * TARGET_RATE);
    assert_eq!(out.len(), 500);
}

#[test]
fn linear_resample_doubles_length_from_8k() {
    let input = vec![0.1f32; 100];
    let out = linear_resample(&input, TARGET_RATE / 2);
    assert_eq!(out.len(), 200);
}

#[test]
fn linear_resample_preserves_dc_level() {
    let input = vec![0.5f32; 4800];
    let out = linear_resample(&input, 48_000);
    // Ignore FIR edge effects at either end.
    let mid = &out[100..out.len() - 100];
    for sample in mid {
        assert!((sample - 0.5).abs() < 0.01, "sample drifted: {sample}");
    }
}

#[test]
fn sinc_taps_sum_to_unity() {
    let coeffs = sinc_taps(0.25, 33);
    let sum: f32 = coeffs.iter().sum();
    assert!((sum - 1.0).abs() < 1e-3);
}

#[test]
fn fit_window_pads_with_silence() {
    assert_eq!(fit_window(vec![1, 2, 3], 5), vec![1, 2, 3, 0, 0]);
}

#[test]
fn fit_window_truncates_excess() {
    assert_eq!(fit_window(vec![1, 2, 3, 4], 2), vec![1, 2]);
}

#[test]
fn to_i16_samples_clamps_out_of_range_input() {
    let out = to_i16_samples(&[1.5, -1.5, 0.0, 0.5]);
    assert_eq!(out[0], i16::MAX);
    assert_eq!(out[1], -i16::MAX);
    assert_eq!(out[2], 0);
    assert_eq!(out[3], 16_383);
}
