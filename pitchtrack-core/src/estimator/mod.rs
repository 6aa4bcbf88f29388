//! # Pitch Estimation Module
//!
//! Turns one analysis frame into a [`PitchSample`]. YIN is the primary
//! detector; an FFT autocorrelation cross-checks bright, energetic frames
//! where YIN tends to lose confidence.
//!
//! ## Per-frame flow
//! 1. Optional voice emphasis (local DC removal + first-difference mix)
//! 2. YIN difference function, CMND, absolute threshold, parabolic refinement
//! 3. Confidence from the CMND dip depth and clarity from period similarity
//! 4. Hybrid cross-check against autocorrelation when energy and brightness are high
//! 5. Optional blend with the last few accepted pitches
//!
//! Low-confidence results are returned as-is. Gating on confidence is the
//! temporal filter's job, not the estimator's.

pub mod autocorr;
pub mod features;
pub mod yin;

use tracing::{debug, trace};

use crate::config::DetectionConfig;
use crate::error::Result;
use crate::ring::RingBuffer;
use crate::{Algorithm, PitchSample};
use autocorr::Autocorrelator;

/// Number of accepted pitches kept for the estimator's own smoothing pass.
pub const PITCH_HISTORY_LEN: usize = 5;

/// History entries further than this (relative) from the current estimate are ignored.
const HISTORY_PROXIMITY: f32 = 0.2;

/// Per-step weight decay for older history entries.
const HISTORY_DECAY: f32 = 0.8;

#[derive(Debug, Clone, Copy, Default)]
struct HistoryEntry {
    pitch: f32,
    confidence: f32,
}

/// Outcome of the YIN stage before any cross-check.
#[derive(Debug, Clone, Copy)]
struct YinEstimate {
    pitch: f32,
    period: f32,
    confidence: f32,
}

pub struct PitchEstimator {
    config: DetectionConfig,
    history: RingBuffer<HistoryEntry>,
    autocorrelator: Autocorrelator,
    emphasized: Vec<f32>,
    difference: Vec<f32>,
}

impl PitchEstimator {
    pub fn new(config: DetectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            autocorrelator: Autocorrelator::new(config.frame_size),
            history: RingBuffer::with_capacity(PITCH_HISTORY_LEN),
            emphasized: Vec::with_capacity(config.frame_size),
            difference: Vec::with_capacity(config.frame_size / 2 + 1),
            config,
        })
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Forgets the short pitch history.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Estimates the pitch of `frame`.
    ///
    /// # Returns
    /// A sample whose `pitch` is either 0 (nothing found) or inside
    /// `[min_pitch_hz, max_pitch_hz]`, with confidence and clarity in [0, 1].
    pub fn detect_pitch(&mut self, frame: &[f32], timestamp_ms: f64) -> PitchSample {
        let frame = if frame.len() > self.config.frame_size {
            &frame[frame.len() - self.config.frame_size..]
        } else {
            frame
        };

        let energy = features::rms_energy(frame);
        if energy <= f32::EPSILON || !energy.is_finite() {
            return PitchSample::silent(timestamp_ms);
        }

        let mut emphasized = std::mem::take(&mut self.emphasized);
        let analysed: &[f32] = if self.config.voice_optimized {
            features::voice_emphasis(frame, self.config.max_lag(), &mut emphasized);
            &emphasized
        } else {
            frame
        };

        let yin = self.run_yin(analysed);
        let mut sample = match yin {
            Some(estimate) => PitchSample {
                pitch: estimate.pitch,
                confidence: estimate.confidence,
                clarity: yin::period_clarity(frame, estimate.period),
                algorithm: Algorithm::Yin,
                timestamp_ms,
            },
            None => PitchSample::silent(timestamp_ms),
        };

        let centroid = features::approximate_centroid(frame, self.config.sample_rate);
        if energy > self.config.hybrid_energy_threshold && centroid > self.config.hybrid_centroid_hz
        {
            self.cross_check(frame, &mut sample);
        }
        self.emphasized = emphasized;

        if !sample.is_voiced() {
            return PitchSample::silent(timestamp_ms);
        }

        if self.config.temporal_smoothing {
            let raw = sample.pitch;
            sample.pitch = self.smooth_with_history(raw, sample.confidence);
            if sample.confidence >= self.config.confidence_threshold {
                self.history.push(HistoryEntry {
                    pitch: raw,
                    confidence: sample.confidence,
                });
            }
        }

        trace!(
            "[estimator] {:.1} Hz conf {:.2} clarity {:.2} ({:?})",
            sample.pitch, sample.confidence, sample.clarity, sample.algorithm
        );
        sample
    }

    fn run_yin(&mut self, signal: &[f32]) -> Option<YinEstimate> {
        let window = signal.len() / 2;
        let min_lag = self.config.min_lag();
        // One extra lag on each side of the search range for interpolation.
        let max_lag = self.config.max_lag().min(window.checked_sub(1)?);
        if min_lag >= max_lag {
            return None;
        }

        yin::difference_function(signal, max_lag + 2, &mut self.difference);
        yin::cumulative_mean_normalize(&mut self.difference);

        let tau = yin::absolute_threshold(
            &self.difference,
            min_lag,
            max_lag,
            self.config.yin_threshold,
        )?;
        let period = yin::parabolic_interpolation(&self.difference, tau);
        if period <= 0.0 {
            return None;
        }

        let pitch = self.config.sample_rate as f32 / period;
        if !pitch.is_finite() || !self.config.in_band(pitch) {
            return None;
        }

        let confidence = yin::confidence_from_cmnd(
            self.difference[tau],
            self.config.yin_threshold,
            self.config.confidence_boost,
        );
        Some(YinEstimate {
            pitch,
            period,
            confidence,
        })
    }

    /// Lets the autocorrelation detector override a weak or missing YIN result.
    /// Works on the raw frame, the same input the clarity measure uses.
    fn cross_check(&mut self, frame: &[f32], sample: &mut PitchSample) {
        let Some(peak) = self.autocorrelator.pick_peak(
            frame,
            self.config.min_lag(),
            self.config.max_lag(),
        ) else {
            return;
        };

        let pitch = self.config.sample_rate as f32 / peak.lag;
        if !pitch.is_finite() || !self.config.in_band(pitch) {
            return;
        }

        if !sample.is_voiced() {
            debug!("[estimator] YIN found nothing, autocorrelation found {pitch:.1} Hz");
            sample.pitch = pitch;
            sample.confidence = peak.confidence;
            sample.clarity = yin::period_clarity(frame, peak.lag);
            sample.algorithm = Algorithm::Autocorr;
        } else if peak.confidence > sample.confidence * (1.0 + self.config.hybrid_margin) {
            debug!(
                "[estimator] hybrid switch: autocorr {pitch:.1} Hz ({:.2}) over YIN {:.1} Hz ({:.2})",
                peak.confidence, sample.pitch, sample.confidence
            );
            sample.pitch = pitch;
            sample.confidence = peak.confidence;
            sample.algorithm = Algorithm::Hybrid;
        }
    }

    /// Confidence- and proximity-weighted average of `pitch` with recent accepted pitches.
    fn smooth_with_history(&self, pitch: f32, confidence: f32) -> f32 {
        let mut weighted_sum = pitch * confidence;
        let mut weight_total = confidence;

        for (age, entry) in self.history.iter().rev().enumerate() {
            let relative = (entry.pitch - pitch).abs() / pitch;
            if relative > HISTORY_PROXIMITY {
                continue;
            }
            let proximity = 1.0 - relative / HISTORY_PROXIMITY;
            let weight = entry.confidence * proximity * HISTORY_DECAY.powi(age as i32 + 1);
            weighted_sum += entry.pitch * weight;
            weight_total += weight;
        }

        if weight_total <= f32::EPSILON {
            pitch
        } else {
            weighted_sum / weight_total
        }
    }
}
