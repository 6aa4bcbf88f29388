//! # Temporal Filter Module
//!
//! Smooths the estimator's per-frame output into a stable pitch track. Each
//! call runs one `(pitch, confidence, timestamp)` sample through a fixed
//! sequence:
//!
//! 1. **Silence reset**: `pitch <= 0` clears every stage and yields 0
//! 2. **Outlier rejection**: z-score test against recent raw pitches; a
//!    rejected sample holds the previous estimate
//! 3. **Confidence gate**: below the threshold the previous estimate is held
//!    and no stage state changes
//! 4. **Median**: drops isolated single-frame glitches
//! 5. **Adaptive smoothing**: confidence-tiered exponential smoothing
//! 6. **Kalman**: final scalar estimate
//!
//! Before the Kalman stage has seen a measurement, "previous estimate" is 0.

pub mod adaptive;
pub mod kalman;
pub mod median;
pub mod outlier;

use tracing::debug;

use crate::config::FilterConfig;
use crate::error::Result;
use adaptive::AdaptiveSmoother;
use kalman::ScalarKalman;
use median::MedianFilter;
use outlier::OutlierDetector;

/// Quality metrics derived from the Kalman stage.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FilterMetrics {
    pub error_covariance: f32,
    /// `1 - P / estimate`, clamped to [0, 1]. Zero when there is no estimate.
    pub stability: f32,
    /// `1 - min(P, 1)`.
    pub confidence: f32,
}

/// What happened to the most recent sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterVerdict {
    #[default]
    Silence,
    Outlier,
    LowConfidence,
    Accepted,
}

pub struct TemporalFilter {
    config: FilterConfig,
    outlier: OutlierDetector,
    median: MedianFilter,
    adaptive: AdaptiveSmoother,
    kalman: ScalarKalman,
    last_verdict: FilterVerdict,
}

impl TemporalFilter {
    pub fn new(config: FilterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            outlier: OutlierDetector::new(config.outlier_threshold, config.outlier_window),
            median: MedianFilter::new(config.median_window),
            adaptive: AdaptiveSmoother::new(
                config.adaptive_window,
                config.sensitivity_threshold,
                config.confidence_weighting,
            ),
            kalman: ScalarKalman::new(
                config.process_noise,
                config.measurement_noise,
                config.initial_error_covariance,
            ),
            config,
            last_verdict: FilterVerdict::Silence,
        })
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Runs one sample through all stages and returns the filtered pitch.
    pub fn process(&mut self, pitch: f32, confidence: f32, timestamp_ms: f64) -> f32 {
        if pitch <= 0.0 || !pitch.is_finite() {
            self.reset();
            return 0.0;
        }

        if self.config.outlier_rejection && self.outlier.is_outlier(pitch) {
            debug!(
                "[filter] rejected outlier {pitch:.1} Hz, holding {:.1} Hz",
                self.kalman.estimate()
            );
            self.last_verdict = FilterVerdict::Outlier;
            return self.kalman.estimate();
        }

        if confidence < self.config.confidence_threshold {
            self.last_verdict = FilterVerdict::LowConfidence;
            return self.kalman.estimate();
        }

        let median = self.median.process(pitch);
        let smoothed = self.adaptive.process(median, confidence, timestamp_ms);
        self.last_verdict = FilterVerdict::Accepted;
        self.kalman.update(smoothed, confidence)
    }

    /// Current Kalman estimate (0 when unseeded).
    pub fn estimate(&self) -> f32 {
        self.kalman.estimate()
    }

    pub fn last_verdict(&self) -> FilterVerdict {
        self.last_verdict
    }

    pub fn metrics(&self) -> FilterMetrics {
        let error_covariance = self.kalman.error_covariance();
        let estimate = self.kalman.estimate();
        let stability = if estimate > 0.0 {
            (1.0 - error_covariance / estimate).clamp(0.0, 1.0)
        } else {
            0.0
        };
        FilterMetrics {
            error_covariance,
            stability,
            confidence: 1.0 - error_covariance.min(1.0),
        }
    }

    /// Clears every stage. Also used on silence, and safe to call at any time.
    pub fn reset(&mut self) {
        self.outlier.reset();
        self.median.reset();
        self.adaptive.reset();
        self.kalman.reset();
        self.last_verdict = FilterVerdict::Silence;
    }
}
