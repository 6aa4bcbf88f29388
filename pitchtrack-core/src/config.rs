//! # Configuration Module
//!
//! Tuning knobs for every stage of the signal chain. Each struct is an
//! immutable snapshot: a session takes a copy at start, and changes are applied
//! by building a new snapshot (see [`ProcessingConfig::merged`]) rather than by
//! mutating the one in use.
//!
//! All structs deserialize with `#[serde(default)]`, so a settings file only
//! needs to name the values it overrides.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PitchError, Result};

/// Settings for the preprocessing chain (band filters, noise gate, AGC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Gate threshold in dBFS. Envelopes below this are expanded downwards.
    pub noise_gate_threshold_db: f32,
    /// Expansion ratio below the gate threshold.
    pub noise_gate_ratio: f32,
    pub noise_gate_attack_ms: f32,
    pub noise_gate_release_ms: f32,
    pub high_pass_hz: f32,
    pub high_pass_q: f32,
    pub low_pass_hz: f32,
    pub low_pass_q: f32,
    /// RMS level the AGC steers towards.
    pub target_rms: f32,
    pub max_gain: f32,
    /// Blend factor for new gain targets, in (0, 1].
    pub gain_smoothing: f32,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            noise_gate_threshold_db: -50.0,
            noise_gate_ratio: 4.0,
            noise_gate_attack_ms: 3.0,
            noise_gate_release_ms: 100.0,
            high_pass_hz: 60.0,
            high_pass_q: 0.7,
            low_pass_hz: 2000.0,
            low_pass_q: 0.7,
            target_rms: 0.1,
            max_gain: 10.0,
            gain_smoothing: 0.1,
        }
    }
}

/// A partial change to a [`ProcessingConfig`]. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfigUpdate {
    pub noise_gate_threshold_db: Option<f32>,
    pub noise_gate_ratio: Option<f32>,
    pub noise_gate_attack_ms: Option<f32>,
    pub noise_gate_release_ms: Option<f32>,
    pub high_pass_hz: Option<f32>,
    pub low_pass_hz: Option<f32>,
    pub target_rms: Option<f32>,
    pub max_gain: Option<f32>,
    pub gain_smoothing: Option<f32>,
}

impl ProcessingConfig {
    /// Checks the snapshot against the sample rate it will run at.
    pub fn validate(&self, sample_rate: u32) -> Result<()> {
        let nyquist = sample_rate as f32 / 2.0;
        require_finite("noise_gate_threshold_db", self.noise_gate_threshold_db)?;
        if self.noise_gate_threshold_db > 0.0 {
            return Err(PitchError::config("noise_gate_threshold_db must be <= 0 dBFS"));
        }
        require_at_least("noise_gate_ratio", self.noise_gate_ratio, 1.0)?;
        require_positive("noise_gate_attack_ms", self.noise_gate_attack_ms)?;
        require_positive("noise_gate_release_ms", self.noise_gate_release_ms)?;
        require_positive("high_pass_hz", self.high_pass_hz)?;
        require_positive("low_pass_hz", self.low_pass_hz)?;
        require_positive("high_pass_q", self.high_pass_q)?;
        require_positive("low_pass_q", self.low_pass_q)?;
        if self.low_pass_hz <= self.high_pass_hz {
            return Err(PitchError::config(format!(
                "low_pass_hz ({}) must be above high_pass_hz ({})",
                self.low_pass_hz, self.high_pass_hz
            )));
        }
        if self.low_pass_hz >= nyquist {
            return Err(PitchError::config(format!(
                "low_pass_hz ({}) must be below Nyquist ({nyquist})",
                self.low_pass_hz
            )));
        }
        require_positive("target_rms", self.target_rms)?;
        require_at_least("max_gain", self.max_gain, 1.0)?;
        require_unit_open_closed("gain_smoothing", self.gain_smoothing)?;
        Ok(())
    }

    /// Returns a new snapshot with `update` applied, validated against `sample_rate`.
    pub fn merged(&self, update: &ProcessingConfigUpdate, sample_rate: u32) -> Result<Self> {
        let next = Self {
            noise_gate_threshold_db: update
                .noise_gate_threshold_db
                .unwrap_or(self.noise_gate_threshold_db),
            noise_gate_ratio: update.noise_gate_ratio.unwrap_or(self.noise_gate_ratio),
            noise_gate_attack_ms: update.noise_gate_attack_ms.unwrap_or(self.noise_gate_attack_ms),
            noise_gate_release_ms: update
                .noise_gate_release_ms
                .unwrap_or(self.noise_gate_release_ms),
            high_pass_hz: update.high_pass_hz.unwrap_or(self.high_pass_hz),
            low_pass_hz: update.low_pass_hz.unwrap_or(self.low_pass_hz),
            target_rms: update.target_rms.unwrap_or(self.target_rms),
            max_gain: update.max_gain.unwrap_or(self.max_gain),
            gain_smoothing: update.gain_smoothing.unwrap_or(self.gain_smoothing),
            ..self.clone()
        };
        next.validate(sample_rate)?;
        Ok(next)
    }
}

/// Settings for the pitch estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub sample_rate: u32,
    /// Number of samples analysed per tick.
    pub frame_size: usize,
    /// Absolute threshold on the cumulative mean normalized difference.
    pub yin_threshold: f32,
    pub min_pitch_hz: f32,
    pub max_pitch_hz: f32,
    /// Estimates below this confidence are returned but not kept in the
    /// estimator's short pitch history.
    pub confidence_threshold: f32,
    /// DC removal plus first-difference emphasis before YIN.
    pub voice_optimized: bool,
    /// Blend each estimate with the estimator's short pitch history.
    pub temporal_smoothing: bool,
    /// RMS energy above which the autocorrelation cross-check runs.
    pub hybrid_energy_threshold: f32,
    /// Approximate spectral centroid (Hz) above which the cross-check runs.
    pub hybrid_centroid_hz: f32,
    /// Fraction by which autocorrelation confidence must beat YIN's.
    pub hybrid_margin: f32,
    /// Multiplier applied to YIN confidence for very clear periods.
    pub confidence_boost: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            frame_size: 2048,
            yin_threshold: 0.1,
            min_pitch_hz: 60.0,
            max_pitch_hz: 1000.0,
            confidence_threshold: 0.3,
            voice_optimized: true,
            temporal_smoothing: true,
            hybrid_energy_threshold: 0.1,
            hybrid_centroid_hz: 1000.0,
            hybrid_margin: 0.2,
            confidence_boost: 1.2,
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(PitchError::config("sample_rate must be greater than 0"));
        }
        if self.frame_size < 4 {
            return Err(PitchError::config("frame_size must be at least 4 samples"));
        }
        require_unit_open("yin_threshold", self.yin_threshold)?;
        require_positive("min_pitch_hz", self.min_pitch_hz)?;
        require_positive("max_pitch_hz", self.max_pitch_hz)?;
        if self.min_pitch_hz >= self.max_pitch_hz {
            return Err(PitchError::config(format!(
                "min_pitch_hz ({}) must be below max_pitch_hz ({})",
                self.min_pitch_hz, self.max_pitch_hz
            )));
        }
        let nyquist = self.sample_rate as f32 / 2.0;
        if self.max_pitch_hz >= nyquist {
            return Err(PitchError::config(format!(
                "max_pitch_hz ({}) must be below Nyquist ({nyquist})",
                self.max_pitch_hz
            )));
        }
        require_unit_closed("confidence_threshold", self.confidence_threshold)?;
        require_finite("hybrid_energy_threshold", self.hybrid_energy_threshold)?;
        require_finite("hybrid_centroid_hz", self.hybrid_centroid_hz)?;
        require_finite("hybrid_margin", self.hybrid_margin)?;
        require_at_least("confidence_boost", self.confidence_boost, 1.0)?;
        Ok(())
    }

    /// Longest lag (in samples) the search has to cover.
    pub fn max_lag(&self) -> usize {
        (self.sample_rate as f32 / self.min_pitch_hz).ceil() as usize
    }

    /// Shortest lag (in samples) the search has to cover.
    pub fn min_lag(&self) -> usize {
        ((self.sample_rate as f32 / self.max_pitch_hz).floor() as usize).max(2)
    }

    pub fn in_band(&self, pitch: f32) -> bool {
        pitch >= self.min_pitch_hz && pitch <= self.max_pitch_hz
    }
}

/// Settings for the four-stage temporal filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub process_noise: f32,
    pub measurement_noise: f32,
    pub initial_error_covariance: f32,
    pub median_window: usize,
    pub adaptive_window: usize,
    /// Relative change (x100 Hz) that forces fast smoothing.
    pub sensitivity_threshold: f32,
    /// Samples below this confidence hold the previous estimate.
    pub confidence_threshold: f32,
    pub confidence_weighting: bool,
    /// Z-score above which a sample is treated as an outlier.
    pub outlier_threshold: f32,
    pub outlier_rejection: bool,
    /// Capacity of the raw-value window used for outlier statistics.
    pub outlier_window: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            process_noise: 0.01,
            measurement_noise: 0.1,
            initial_error_covariance: 1.0,
            median_window: 5,
            adaptive_window: 3,
            sensitivity_threshold: 0.1,
            confidence_threshold: 0.4,
            confidence_weighting: true,
            outlier_threshold: 2.5,
            outlier_rejection: true,
            outlier_window: 20,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<()> {
        require_positive("process_noise", self.process_noise)?;
        require_positive("measurement_noise", self.measurement_noise)?;
        require_positive("initial_error_covariance", self.initial_error_covariance)?;
        if self.median_window == 0 {
            return Err(PitchError::config("median_window must be greater than 0"));
        }
        if self.adaptive_window == 0 {
            return Err(PitchError::config("adaptive_window must be greater than 0"));
        }
        if self.outlier_window < 3 || self.outlier_window > 20 {
            return Err(PitchError::config("outlier_window must be between 3 and 20"));
        }
        require_positive("sensitivity_threshold", self.sensitivity_threshold)?;
        require_unit_closed("confidence_threshold", self.confidence_threshold)?;
        require_positive("outlier_threshold", self.outlier_threshold)?;
        Ok(())
    }
}

/// Settings for the detection loop cadence and silence decay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Requested minimum time between updates.
    pub response_time_ms: u64,
    /// Hard lower bound on the update interval, whatever `response_time_ms` says.
    pub floor_interval_ms: u64,
    /// Per-tick multiplier applied to the displayed pitch during silence.
    pub decay_factor: f32,
    /// Displayed pitch below this is cleared to "no pitch".
    pub decay_floor_hz: f32,
    /// Stop the session automatically after this long, if set.
    pub max_duration_ms: Option<u64>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            response_time_ms: 50,
            floor_interval_ms: 16,
            decay_factor: 0.98,
            decay_floor_hz: 10.0,
            max_duration_ms: None,
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> Result<()> {
        if self.floor_interval_ms == 0 {
            return Err(PitchError::config("floor_interval_ms must be greater than 0"));
        }
        require_unit_open("decay_factor", self.decay_factor)?;
        require_positive("decay_floor_hz", self.decay_floor_hz)?;
        if self.max_duration_ms == Some(0) {
            return Err(PitchError::config("max_duration_ms must be greater than 0"));
        }
        Ok(())
    }

    /// Effective minimum interval between two updates.
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.floor_interval_ms.max(self.response_time_ms))
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_ms.map(Duration::from_millis)
    }
}

/// Everything a detection session needs, as one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub processing: ProcessingConfig,
    pub detection: DetectionConfig,
    pub filter: FilterConfig,
    pub detection_loop: LoopConfig,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        self.detection.validate()?;
        self.processing.validate(self.detection.sample_rate)?;
        self.filter.validate()?;
        self.detection_loop.validate()
    }

    /// Consumes the config and returns it only if every section is valid.
    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validated()
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

fn require_finite(name: &str, value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PitchError::config(format!("{name} must be finite (got {value})")))
    }
}

fn require_positive(name: &str, value: f32) -> Result<()> {
    require_finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(PitchError::config(format!("{name} must be positive (got {value})")))
    }
}

fn require_at_least(name: &str, value: f32, min: f32) -> Result<()> {
    require_finite(name, value)?;
    if value >= min {
        Ok(())
    } else {
        Err(PitchError::config(format!("{name} must be >= {min} (got {value})")))
    }
}

fn require_unit_open(name: &str, value: f32) -> Result<()> {
    require_finite(name, value)?;
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(PitchError::config(format!("{name} must lie in (0, 1) (got {value})")))
    }
}

fn require_unit_open_closed(name: &str, value: f32) -> Result<()> {
    require_finite(name, value)?;
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(PitchError::config(format!("{name} must lie in (0, 1] (got {value})")))
    }
}

fn require_unit_closed(name: &str, value: f32) -> Result<()> {
    require_finite(name, value)?;
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PitchError::config(format!("{name} must lie in [0, 1] (got {value})")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        SessionConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_inverted_pitch_band() {
        let config = DetectionConfig {
            min_pitch_hz: 500.0,
            max_pitch_hz: 100.0,
            ..DetectionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PitchError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn rejects_zero_windows() {
        let config = FilterConfig {
            median_window: 0,
            ..FilterConfig::default()
        };
        assert!(config.validate().is_err());

        let config = FilterConfig {
            adaptive_window: 0,
            ..FilterConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn merged_builds_new_snapshot() {
        let base = ProcessingConfig::default();
        let update = ProcessingConfigUpdate {
            high_pass_hz: Some(80.0),
            low_pass_hz: Some(1500.0),
            ..Default::default()
        };
        let next = base.merged(&update, 44_100).unwrap();
        assert_eq!(next.high_pass_hz, 80.0);
        assert_eq!(next.low_pass_hz, 1500.0);
        assert_eq!(next.target_rms, base.target_rms);
        assert_eq!(base.high_pass_hz, 60.0);
    }

    #[test]
    fn merged_rejects_crossed_cutoffs() {
        let update = ProcessingConfigUpdate {
            high_pass_hz: Some(3000.0),
            ..Default::default()
        };
        assert!(ProcessingConfig::default().merged(&update, 44_100).is_err());
    }

    #[test]
    fn update_interval_respects_floor() {
        let config = LoopConfig {
            response_time_ms: 5,
            ..LoopConfig::default()
        };
        assert_eq!(config.update_interval(), Duration::from_millis(16));
        assert_eq!(
            LoopConfig::default().update_interval(),
            Duration::from_millis(50)
        );
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config =
            SessionConfig::from_json_str(r#"{ "detection": { "min_pitch_hz": 80.0 } }"#).unwrap();
        assert_eq!(config.detection.min_pitch_hz, 80.0);
        assert_eq!(config.detection.max_pitch_hz, 1000.0);
        assert_eq!(config.filter, FilterConfig::default());
    }

    #[test]
    fn json_rejects_invalid_values() {
        let result = SessionConfig::from_json_str(r#"{ "filter": { "median_window": 0 } }"#);
        assert!(matches!(result, Err(PitchError::InvalidConfiguration(_))));
    }
}
