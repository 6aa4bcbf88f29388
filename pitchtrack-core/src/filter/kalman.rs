//! Scalar Kalman filter, the last stage of the temporal filter.

/// Lowest confidence used to scale measurement noise.
const MIN_CONFIDENCE: f32 = 1e-3;

#[derive(Debug, Clone)]
pub struct ScalarKalman {
    process_noise: f32,
    measurement_noise: f32,
    initial_covariance: f32,
    estimate: f32,
    error_covariance: f32,
    seeded: bool,
}

impl ScalarKalman {
    pub fn new(process_noise: f32, measurement_noise: f32, initial_covariance: f32) -> Self {
        Self {
            process_noise,
            measurement_noise,
            initial_covariance,
            estimate: 0.0,
            error_covariance: initial_covariance,
            seeded: false,
        }
    }

    /// Folds in `measurement`. The first call after construction or
    /// [`reset`](Self::reset) adopts the measurement as-is.
    pub fn update(&mut self, measurement: f32, confidence: f32) -> f32 {
        if !self.seeded {
            self.estimate = measurement;
            self.seeded = true;
            return self.estimate;
        }

        let predicted = self.error_covariance + self.process_noise;
        let noise = self.measurement_noise / confidence.max(MIN_CONFIDENCE);
        let gain = predicted / (predicted + noise);
        self.estimate += gain * (measurement - self.estimate);
        self.error_covariance = predicted * (1.0 - gain);
        self.estimate
    }

    /// Current estimate, 0 before the first measurement.
    pub fn estimate(&self) -> f32 {
        self.estimate
    }

    pub fn error_covariance(&self) -> f32 {
        self.error_covariance
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn reset(&mut self) {
        self.estimate = 0.0;
        self.error_covariance = self.initial_covariance;
        self.seeded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_update_seeds_estimate() {
        let mut kalman = ScalarKalman::new(0.01, 0.1, 1.0);
        assert_eq!(kalman.update(187.3, 0.2), 187.3);
        assert_eq!(kalman.error_covariance(), 1.0);
    }

    #[test]
    fn converges_and_shrinks_covariance() {
        let mut kalman = ScalarKalman::new(0.01, 0.1, 1.0);
        kalman.update(100.0, 0.9);
        for _ in 0..50 {
            kalman.update(110.0, 0.9);
        }
        assert!((kalman.estimate() - 110.0).abs() < 0.5);
        assert!(kalman.error_covariance() < 0.1);
    }

    #[test]
    fn low_confidence_moves_less() {
        let mut sure = ScalarKalman::new(0.01, 0.1, 1.0);
        let mut unsure = ScalarKalman::new(0.01, 0.1, 1.0);
        sure.update(100.0, 1.0);
        unsure.update(100.0, 1.0);
        let a = sure.update(120.0, 1.0);
        let b = unsure.update(120.0, 0.1);
        assert!(a > b);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut kalman = ScalarKalman::new(0.01, 0.1, 1.0);
        kalman.update(100.0, 1.0);
        kalman.update(101.0, 1.0);
        kalman.reset();
        assert!(!kalman.is_seeded());
        assert_eq!(kalman.estimate(), 0.0);
        assert_eq!(kalman.error_covariance(), 1.0);
    }
}
