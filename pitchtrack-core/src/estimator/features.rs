//! Cheap frame features used to steer the estimator.

use std::f32::consts::PI;

/// Mix of DC-removed signal and its first difference in the voice emphasis.
const EMPHASIS_DRY: f32 = 0.7;
const EMPHASIS_DIFF: f32 = 0.3;

/// Root-mean-square energy of `signal`.
pub fn rms_energy(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    (signal.iter().map(|s| s * s).sum::<f32>() / signal.len() as f32).sqrt()
}

/// Rough spectral centroid in Hz from the ratio of mean first-difference
/// magnitude to mean amplitude. For a pure tone this lands on the tone's
/// frequency; broadband or bright signals push it up. No FFT involved.
pub fn approximate_centroid(signal: &[f32], sample_rate: u32) -> f32 {
    if signal.len() < 2 {
        return 0.0;
    }
    let amplitude: f32 = signal.iter().map(|s| s.abs()).sum();
    if amplitude <= f32::EPSILON {
        return 0.0;
    }
    let diff: f32 = signal.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    let ratio = diff / amplitude * signal.len() as f32 / (signal.len() - 1) as f32;
    ratio * sample_rate as f32 / (2.0 * PI)
}

/// Removes the local mean over a centred window of `window` samples and
/// blends the result with its first difference (70/30) into `out`.
pub fn voice_emphasis(signal: &[f32], window: usize, out: &mut Vec<f32>) {
    out.clear();
    let n = signal.len();
    if n == 0 {
        return;
    }

    // Prefix sums keep the sliding mean O(n).
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0_f64);
    let mut acc = 0.0_f64;
    for &s in signal {
        acc += s as f64;
        prefix.push(acc);
    }

    // The window slides inward at the frame edges so it always spans `width` samples.
    let width = window.clamp(1, n);
    let half = width / 2;
    let mut previous = 0.0_f32;
    for i in 0..n {
        let start = i.saturating_sub(half).min(n - width);
        let end = start + width;
        let mean = ((prefix[end] - prefix[start]) / width as f64) as f32;
        let centred = signal[i] - mean;
        let diff = if i == 0 { 0.0 } else { centred - previous };
        out.push(EMPHASIS_DRY * centred + EMPHASIS_DIFF * diff);
        previous = centred;
    }
}
