//! Z-score outlier rejection over a rolling window of raw pitches.

use crate::ring::RingBuffer;

/// Samples needed before any verdict is issued.
pub const MIN_HISTORY: usize = 3;

/// Standard deviation floor in Hz. Keeps a perfectly steady tone from turning
/// every tiny wobble into an outlier, and avoids dividing by zero.
const STDDEV_FLOOR: f32 = 1.0;

#[derive(Debug, Clone)]
pub struct OutlierDetector {
    threshold: f32,
    window: RingBuffer<f32>,
}

impl OutlierDetector {
    pub fn new(threshold: f32, window: usize) -> Self {
        Self {
            threshold,
            window: RingBuffer::with_capacity(window),
        }
    }

    /// Judges `value` against the window, then records it whatever the verdict.
    ///
    /// Recording rejected values lets the statistics follow a genuine drift
    /// while a lone spike is still refused.
    pub fn is_outlier(&mut self, value: f32) -> bool {
        let verdict = self.z_score(value).is_some_and(|z| z > self.threshold);
        self.window.push(value);
        verdict
    }

    /// Z-score of `value` against the current window, once enough history exists.
    pub fn z_score(&self, value: f32) -> Option<f32> {
        let n = self.window.len();
        if n < MIN_HISTORY {
            return None;
        }
        let mean = self.window.iter().sum::<f32>() / n as f32;
        let variance = self
            .window
            .iter()
            .map(|v| (v - mean) * (v - mean))
            .sum::<f32>()
            / n as f32;
        let stddev = variance.sqrt().max(STDDEV_FLOOR);
        Some((value - mean).abs() / stddev)
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_three_samples() {
        let mut detector = OutlierDetector::new(2.5, 20);
        assert!(!detector.is_outlier(100.0));
        assert!(!detector.is_outlier(100.0));
        assert!(!detector.is_outlier(900.0));
        assert_eq!(detector.len(), 3);
    }

    #[test]
    fn rejects_spike_in_stable_run() {
        let mut detector = OutlierDetector::new(2.5, 20);
        for i in 0..10 {
            assert!(!detector.is_outlier(150.0 + (i % 3) as f32 - 1.0));
        }
        assert!(detector.is_outlier(400.0));
        // The spike is still recorded.
        assert_eq!(detector.len(), 11);
        assert!(!detector.is_outlier(151.0));
    }

    #[test]
    fn window_is_bounded() {
        let mut detector = OutlierDetector::new(2.5, 20);
        for _ in 0..100 {
            detector.is_outlier(200.0);
        }
        assert_eq!(detector.len(), 20);
    }

    #[test]
    fn drift_is_eventually_accepted() {
        let mut detector = OutlierDetector::new(2.5, 5);
        for _ in 0..5 {
            detector.is_outlier(150.0);
        }
        let mut verdicts = Vec::new();
        for _ in 0..5 {
            verdicts.push(detector.is_outlier(180.0));
        }
        assert!(verdicts[0]);
        assert!(!verdicts[4]);
    }
}
