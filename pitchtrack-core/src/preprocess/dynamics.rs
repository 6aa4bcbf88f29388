//! Noise gate and automatic gain control applied after band limiting.

use crate::config::ProcessingConfig;

/// Converts a dBFS level to linear amplitude.
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// One-pole smoothing coefficient for a time constant in milliseconds.
fn time_constant_coeff(time_ms: f32, sample_rate: u32) -> f32 {
    let samples = time_ms / 1000.0 * sample_rate as f32;
    if samples <= 0.0 {
        return 0.0;
    }
    (-1.0 / samples).exp()
}

/// Downward expander driven by a peak envelope follower.
#[derive(Debug, Clone)]
pub struct NoiseGate {
    threshold: f32,
    exponent: f32,
    attack_coeff: f32,
    release_coeff: f32,
    envelope: f32,
}

impl NoiseGate {
    pub fn new(config: &ProcessingConfig, sample_rate: u32) -> Self {
        Self {
            threshold: db_to_linear(config.noise_gate_threshold_db),
            exponent: 1.0 - 1.0 / config.noise_gate_ratio,
            attack_coeff: time_constant_coeff(config.noise_gate_attack_ms, sample_rate),
            release_coeff: time_constant_coeff(config.noise_gate_release_ms, sample_rate),
            envelope: 0.0,
        }
    }

    /// Applies new thresholds and time constants, keeping the envelope.
    pub fn reconfigure(&mut self, config: &ProcessingConfig, sample_rate: u32) {
        let envelope = self.envelope;
        *self = Self::new(config, sample_rate);
        self.envelope = envelope;
    }

    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    #[inline]
    fn gain_for(&self, envelope: f32) -> f32 {
        if envelope >= self.threshold {
            1.0
        } else {
            (envelope / self.threshold).powf(self.exponent)
        }
    }

    pub fn process(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            let level = sample.abs();
            let coeff = if level > self.envelope {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.envelope = coeff * self.envelope + (1.0 - coeff) * level;
            *sample *= self.gain_for(self.envelope);
        }
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }
}

/// Frame-level RMS normaliser with a smoothed, bounded gain.
#[derive(Debug, Clone)]
pub struct AutomaticGain {
    target_rms: f32,
    max_gain: f32,
    smoothing: f32,
    gain: f32,
}

impl AutomaticGain {
    pub fn new(config: &ProcessingConfig) -> Self {
        Self {
            target_rms: config.target_rms,
            max_gain: config.max_gain,
            smoothing: config.gain_smoothing,
            gain: 1.0,
        }
    }

    pub fn reconfigure(&mut self, config: &ProcessingConfig) {
        self.target_rms = config.target_rms;
        self.max_gain = config.max_gain;
        self.smoothing = config.gain_smoothing;
        self.gain = self.gain.min(self.max_gain);
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn process(&mut self, samples: &mut [f32]) {
        let rms = rms(samples);
        // True silence: hold the current gain.
        if rms > 0.0 {
            let target = (self.target_rms / rms).min(self.max_gain);
            self.gain = self.gain * (1.0 - self.smoothing) + target * self.smoothing;
        }
        for sample in samples.iter_mut() {
            *sample *= self.gain;
        }
    }

    pub fn reset(&mut self) {
        self.gain = 1.0;
    }
}

pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}
