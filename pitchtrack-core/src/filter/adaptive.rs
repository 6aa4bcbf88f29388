//! Confidence-aware exponential smoothing.
//!
//! The smoothing factor depends on how much the current sample can be
//! trusted, but jumps up whenever the pitch moves faster than the configured
//! sensitivity so real glides and octave leaps are not smeared away.

use crate::ring::RingBuffer;

/// Factor used when the pitch changes faster than the sensitivity allows.
const FAST_CHANGE_FACTOR: f32 = 0.4;

/// Per-step decay of history weights (newest entry weighs 1).
const HISTORY_WEIGHT_DECAY: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    High,
    Medium,
    #[default]
    Low,
}

impl Quality {
    pub fn from_confidence(confidence: f32) -> Self {
        if confidence > 0.8 {
            Quality::High
        } else if confidence > 0.5 {
            Quality::Medium
        } else {
            Quality::Low
        }
    }

    pub fn smoothing_factor(self) -> f32 {
        match self {
            Quality::High => 0.3,
            Quality::Medium => 0.15,
            Quality::Low => 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryEntry {
    pub value: f32,
    pub confidence: f32,
    pub timestamp_ms: f64,
    pub quality: Quality,
}

#[derive(Debug, Clone)]
pub struct AdaptiveSmoother {
    history: RingBuffer<HistoryEntry>,
    sensitivity: f32,
    confidence_weighting: bool,
    previous: Option<f32>,
}

impl AdaptiveSmoother {
    pub fn new(window: usize, sensitivity: f32, confidence_weighting: bool) -> Self {
        Self {
            history: RingBuffer::with_capacity(window),
            sensitivity,
            confidence_weighting,
            previous: None,
        }
    }

    pub fn process(&mut self, value: f32, confidence: f32, timestamp_ms: f64) -> f32 {
        let quality = Quality::from_confidence(confidence);
        self.history.push(HistoryEntry {
            value,
            confidence,
            timestamp_ms,
            quality,
        });

        let Some(previous) = self.previous else {
            self.previous = Some(value);
            return value;
        };

        let mut factor = quality.smoothing_factor();
        if let (Some(latest), Some(before)) =
            (self.history.get_from_latest(0), self.history.get_from_latest(1))
        {
            if (latest.value - before.value).abs() > self.sensitivity * 100.0 {
                factor = factor.max(FAST_CHANGE_FACTOR);
            }
        }
        if self.confidence_weighting {
            factor *= confidence;
        }

        let average = self.weighted_average().unwrap_or(value);
        let smoothed = previous * (1.0 - factor) + average * factor;
        self.previous = Some(smoothed);
        smoothed
    }

    /// Confidence-scaled average with weights halving per step back in time.
    fn weighted_average(&self) -> Option<f32> {
        let mut weight = 1.0_f32;
        let mut sum = 0.0_f32;
        let mut total = 0.0_f32;
        for entry in self.history.iter().rev() {
            let w = weight * entry.confidence;
            sum += entry.value * w;
            total += w;
            weight *= HISTORY_WEIGHT_DECAY;
        }
        (total > f32::EPSILON).then(|| sum / total)
    }

    pub fn latest(&self) -> Option<HistoryEntry> {
        self.history.latest()
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.previous = None;
    }
}
