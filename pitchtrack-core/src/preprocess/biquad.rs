//! Second-order band-limiting filters (RBJ audio EQ cookbook).

use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiquadKind {
    HighPass,
    LowPass,
}

/// Transposed direct form II biquad with `f64` state.
#[derive(Debug, Clone)]
pub struct Biquad {
    kind: BiquadKind,
    sample_rate: f64,
    q: f64,
    cutoff_hz: f64,
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

impl Biquad {
    pub fn new(kind: BiquadKind, cutoff_hz: f32, q: f32, sample_rate: u32) -> Self {
        let mut filter = Self {
            kind,
            sample_rate: sample_rate as f64,
            q: q as f64,
            cutoff_hz: cutoff_hz as f64,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
        };
        filter.update_coefficients();
        filter
    }

    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff_hz as f32
    }

    /// Moves the cutoff. Delay state is kept so a running stream does not click.
    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        if (cutoff_hz as f64 - self.cutoff_hz).abs() <= f64::EPSILON {
            return;
        }
        self.cutoff_hz = cutoff_hz as f64;
        self.update_coefficients();
    }

    fn update_coefficients(&mut self) {
        let w0 = 2.0 * PI * self.cutoff_hz / self.sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * self.q);

        let (b0, b1, b2) = match self.kind {
            BiquadKind::LowPass => {
                let b = (1.0 - cos_w0) / 2.0;
                (b, 1.0 - cos_w0, b)
            }
            BiquadKind::HighPass => {
                let b = (1.0 + cos_w0) / 2.0;
                (b, -(1.0 + cos_w0), b)
            }
        };
        let a0 = 1.0 + alpha;
        let inv_a0 = 1.0 / a0;

        self.b0 = b0 * inv_a0;
        self.b1 = b1 * inv_a0;
        self.b2 = b2 * inv_a0;
        self.a1 = -2.0 * cos_w0 * inv_a0;
        self.a2 = (1.0 - alpha) * inv_a0;
    }

    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        let x = sample as f64;
        let y = x * self.b0 + self.z1;
        self.z1 = x * self.b1 + self.z2 - self.a1 * y;
        self.z2 = x * self.b2 - self.a2 * y;
        y as f32
    }

    pub fn process_in_place(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| (2.0 * std::f32::consts::PI * freq * n as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn steady_rms(filter: &mut Biquad, mut signal: Vec<f32>) -> f32 {
        filter.process_in_place(&mut signal);
        let tail = &signal[signal.len() / 2..];
        (tail.iter().map(|s| s * s).sum::<f32>() / tail.len() as f32).sqrt()
    }

    #[test]
    fn high_pass_removes_rumble_keeps_voice() {
        let mut hp = Biquad::new(BiquadKind::HighPass, 60.0, 0.7, 44_100);
        let rumble = steady_rms(&mut hp, sine(10.0, 44_100, 44_100));
        hp.reset();
        let voice = steady_rms(&mut hp, sine(220.0, 44_100, 44_100));
        assert!(rumble < 0.05, "rumble rms {rumble}");
        assert!(voice > 0.6, "voice rms {voice}");
    }

    #[test]
    fn low_pass_attenuates_hiss() {
        let mut lp = Biquad::new(BiquadKind::LowPass, 2000.0, 0.7, 44_100);
        let hiss = steady_rms(&mut lp, sine(12_000.0, 44_100, 8192));
        lp.reset();
        let voice = steady_rms(&mut lp, sine(220.0, 44_100, 8192));
        assert!(hiss < 0.05, "hiss rms {hiss}");
        assert!(voice > 0.6, "voice rms {voice}");
    }

    #[test]
    fn set_cutoff_keeps_state() {
        let mut lp = Biquad::new(BiquadKind::LowPass, 2000.0, 0.7, 44_100);
        lp.process(1.0);
        let state = (lp.z1, lp.z2);
        lp.set_cutoff(1500.0);
        assert_eq!((lp.z1, lp.z2), state);
        assert_eq!(lp.cutoff_hz(), 1500.0);
    }
}
