//! FFT-accelerated autocorrelation used as the estimator's secondary detector.
//!
//! The autocorrelation is computed as `IFFT(|FFT(x)|²)` over a zero-padded
//! buffer (so there is no circular wrap-around), then rescaled per lag to
//! remove the triangular bias of the finite window and normalised by the
//! lag-0 energy.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Peaks within this fraction of the best peak count as equally good; the
/// shortest such lag wins, which keeps sub-octave errors out.
const KEY_PEAK_RATIO: f32 = 0.9;

/// A peak picked from the normalised autocorrelation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutocorrPeak {
    /// Refined lag in samples.
    pub lag: f32,
    /// Normalised peak height in [0, 1].
    pub confidence: f32,
}

/// Holds FFT plans and scratch buffers sized for one frame length.
pub struct Autocorrelator {
    frame_size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    result: Vec<f32>,
}

impl Autocorrelator {
    pub fn new(frame_size: usize) -> Self {
        let fft_size = (2 * frame_size).next_power_of_two();
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        Self {
            frame_size,
            forward,
            inverse,
            spectrum: vec![Complex::new(0.0, 0.0); fft_size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            result: Vec::with_capacity(frame_size),
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Normalised, bias-corrected autocorrelation of `signal` for lags `0..signal.len()`.
    ///
    /// Returns an all-zero slice for silent input.
    pub fn compute(&mut self, signal: &[f32]) -> &[f32] {
        let n = signal.len().min(self.frame_size);
        let signal = &signal[..n];

        for (slot, &s) in self.spectrum.iter_mut().zip(signal) {
            *slot = Complex::new(s, 0.0);
        }
        for slot in self.spectrum[n..].iter_mut() {
            *slot = Complex::new(0.0, 0.0);
        }

        self.forward
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);
        for bin in self.spectrum.iter_mut() {
            *bin = Complex::new(bin.norm_sqr(), 0.0);
        }
        self.inverse
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);

        self.result.clear();
        let energy = self.spectrum[0].re;
        if energy <= f32::EPSILON {
            self.result.resize(n, 0.0);
            return &self.result;
        }

        // r[τ] * N / (N - τ) undoes the shrinking overlap; dividing by r[0]
        // (the FFT scale factor cancels) normalises to unit energy.
        self.result.extend(self.spectrum[..n].iter().enumerate().map(|(tau, c)| {
            let unbiased = c.re * n as f32 / (n - tau) as f32;
            unbiased / energy
        }));
        &self.result
    }

    /// Picks the fundamental period from the autocorrelation within `min_lag..=max_lag`.
    pub fn pick_peak(&mut self, signal: &[f32], min_lag: usize, max_lag: usize) -> Option<AutocorrPeak> {
        let acf = self.compute(signal);
        let max_lag = max_lag.min(acf.len().checked_sub(2)?);
        if min_lag < 1 || min_lag > max_lag {
            return None;
        }

        let peaks: Vec<(usize, f32)> = (min_lag..=max_lag)
            .filter(|&tau| acf[tau] > 0.0 && acf[tau] >= acf[tau - 1] && acf[tau] >= acf[tau + 1])
            .map(|tau| (tau, acf[tau]))
            .collect();

        let best = peaks.iter().map(|p| p.1).fold(f32::MIN, f32::max);
        let (tau, height) = peaks
            .into_iter()
            .find(|&(_, height)| height >= best * KEY_PEAK_RATIO)?;

        Some(AutocorrPeak {
            lag: refine_peak(acf, tau),
            confidence: height.clamp(0.0, 1.0),
        })
    }
}

/// Quadratic interpolation of a maximum at `idx`.
fn refine_peak(data: &[f32], idx: usize) -> f32 {
    let (left, center, right) = (data[idx - 1], data[idx], data[idx + 1]);
    let denominator = 2.0 * center - left - right;
    if denominator.abs() <= f32::EPSILON {
        return idx as f32;
    }
    let shift = 0.5 * (right - left) / denominator;
    if shift.is_finite() && shift.abs() < 1.0 {
        idx as f32 + shift
    } else {
        idx as f32
    }
}
