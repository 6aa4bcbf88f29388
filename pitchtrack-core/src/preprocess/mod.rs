//! # Preprocessing Module
//!
//! Conditions the raw microphone signal before pitch estimation. The chain is
//! fixed for the life of a session:
//!
//! ```text
//! raw -> high-pass -> low-pass -> noise gate -> AGC -> analysis window
//! ```
//!
//! The high-pass removes rumble and DC, the low-pass keeps the voice band and
//! drops hiss, the gate pushes room noise down, and the AGC brings quiet and
//! loud speakers to a comparable level so the estimator's confidence does not
//! depend on microphone distance.

pub mod biquad;
pub mod dynamics;

use crossbeam_channel::Receiver;
use tracing::debug;

use crate::audio::CaptureStream;
use crate::config::{ProcessingConfig, ProcessingConfigUpdate};
use crate::error::{PitchError, Result};
use crate::ring::RingBuffer;
use biquad::{Biquad, BiquadKind};
use dynamics::{AutomaticGain, NoiseGate};

/// Read side of a connected capture stream.
///
/// Each tick drains everything queued since the previous one, so the
/// preprocessor sees the signal without gaps.
#[derive(Debug)]
pub struct FrameTap {
    frames: Receiver<Vec<f32>>,
}

impl FrameTap {
    /// Returns every pending raw frame in arrival order.
    pub fn drain(&self) -> Vec<Vec<f32>> {
        self.frames.try_iter().collect()
    }
}

pub struct Preprocessor {
    config: ProcessingConfig,
    sample_rate: u32,
    high_pass: Biquad,
    low_pass: Biquad,
    gate: NoiseGate,
    agc: AutomaticGain,
    window: RingBuffer<f32>,
    output: Vec<f32>,
    scratch: Vec<f32>,
    connected: bool,
    disposed: bool,
}

impl Preprocessor {
    /// Builds the chain for frames of `frame_size` samples at `sample_rate`.
    pub fn new(config: ProcessingConfig, sample_rate: u32, frame_size: usize) -> Result<Self> {
        config.validate(sample_rate)?;
        if frame_size == 0 {
            return Err(PitchError::config("frame_size must be greater than 0"));
        }
        Ok(Self {
            high_pass: Biquad::new(
                BiquadKind::HighPass,
                config.high_pass_hz,
                config.high_pass_q,
                sample_rate,
            ),
            low_pass: Biquad::new(
                BiquadKind::LowPass,
                config.low_pass_hz,
                config.low_pass_q,
                sample_rate,
            ),
            gate: NoiseGate::new(&config, sample_rate),
            agc: AutomaticGain::new(&config),
            window: RingBuffer::with_capacity(frame_size),
            output: Vec::with_capacity(frame_size),
            scratch: Vec::with_capacity(frame_size),
            config,
            sample_rate,
            connected: false,
            disposed: false,
        })
    }

    /// Attaches the chain to a live source and returns the tap the loop reads from.
    ///
    /// # Errors
    /// * `UnsupportedSource` if the stream has no audio track, or if its sample
    ///   rate differs from the rate the chain was built for
    pub fn connect(&mut self, stream: CaptureStream) -> Result<FrameTap> {
        if !stream.has_audio_track() {
            return Err(PitchError::UnsupportedSource(
                "capture stream has no audio track".into(),
            ));
        }
        if stream.sample_rate != self.sample_rate {
            return Err(PitchError::UnsupportedSource(format!(
                "stream runs at {} Hz, chain expects {} Hz",
                stream.sample_rate, self.sample_rate
            )));
        }
        self.connected = true;
        self.disposed = false;
        Ok(FrameTap {
            frames: stream.into_receiver(),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Current AGC gain.
    pub fn current_gain(&self) -> f32 {
        self.agc.gain()
    }

    /// Applies the noise gate and then the AGC to `frame` in place.
    pub fn process(&mut self, frame: &mut [f32]) {
        self.gate.process(frame);
        self.agc.process(frame);
    }

    /// Runs a raw chunk through the whole chain and appends it to the analysis window.
    pub fn ingest(&mut self, raw: &[f32]) {
        if self.disposed || raw.is_empty() {
            return;
        }
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        scratch.extend_from_slice(raw);

        self.high_pass.process_in_place(&mut scratch);
        self.low_pass.process_in_place(&mut scratch);
        self.process(&mut scratch);

        for &sample in scratch.iter() {
            self.window.push(sample.clamp(-1.0, 1.0));
        }
        self.scratch = scratch;
    }

    /// Latest normalised frame, or an empty slice before the window first fills.
    ///
    /// An empty result is a cold start, not an error: callers fall back to
    /// the raw input.
    pub fn processed_frame(&mut self) -> &[f32] {
        self.output.clear();
        if self.disposed || !self.window.is_full() {
            return &self.output;
        }
        self.output.extend(self.window.iter());
        &self.output
    }

    /// Swaps in a new config snapshot. Filter cutoffs change without
    /// rebuilding the chain or losing filter state.
    pub fn update_config(&mut self, update: &ProcessingConfigUpdate) -> Result<()> {
        let next = self.config.merged(update, self.sample_rate)?;
        debug!(
            "[preprocess] config update: high-pass {} Hz, low-pass {} Hz",
            next.high_pass_hz, next.low_pass_hz
        );
        self.high_pass.set_cutoff(next.high_pass_hz);
        self.low_pass.set_cutoff(next.low_pass_hz);
        self.gate.reconfigure(&next, self.sample_rate);
        self.agc.reconfigure(&next);
        self.config = next;
        Ok(())
    }

    /// Releases chain state. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.high_pass.reset();
        self.low_pass.reset();
        self.gate.reset();
        self.agc.reset();
        self.window.clear();
        self.output = Vec::new();
        self.scratch = Vec::new();
        self.connected = false;
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| amplitude * (2.0 * std::f32::consts::PI * freq * n as f32 / 44_100.0).sin())
            .collect()
    }

    #[test]
    fn connect_rejects_stream_without_track() {
        let mut pre = Preprocessor::new(ProcessingConfig::default(), 44_100, 1024).unwrap();
        let (_tx, rx) = crossbeam_channel::bounded(1);
        let result = pre.connect(CaptureStream::new(44_100, 0, rx));
        assert!(matches!(result, Err(PitchError::UnsupportedSource(_))));
        assert!(!pre.is_connected());
    }

    #[test]
    fn connect_rejects_rate_mismatch() {
        let mut pre = Preprocessor::new(ProcessingConfig::default(), 44_100, 1024).unwrap();
        let (_tx, stream) = CaptureStream::channel(48_000, 1);
        assert!(matches!(
            pre.connect(stream),
            Err(PitchError::UnsupportedSource(_))
        ));
    }

    #[test]
    fn tap_drains_frames_in_order() {
        let mut pre = Preprocessor::new(ProcessingConfig::default(), 44_100, 4).unwrap();
        let (tx, stream) = CaptureStream::channel(44_100, 4);
        let tap = pre.connect(stream).unwrap();
        tx.send(vec![1.0]).unwrap();
        tx.send(vec![2.0, 3.0]).unwrap();
        assert_eq!(tap.drain(), vec![vec![1.0], vec![2.0, 3.0]]);
        assert!(tap.drain().is_empty());
    }

    #[test]
    fn cold_start_returns_empty_frame() {
        let mut pre = Preprocessor::new(ProcessingConfig::default(), 44_100, 1024).unwrap();
        assert!(pre.processed_frame().is_empty());
        pre.ingest(&sine(220.0, 0.3, 512));
        assert!(pre.processed_frame().is_empty());
        pre.ingest(&sine(220.0, 0.3, 512));
        assert_eq!(pre.processed_frame().len(), 1024);
    }

    #[test]
    fn processed_frame_is_normalised() {
        let mut pre = Preprocessor::new(ProcessingConfig::default(), 44_100, 2048).unwrap();
        for _ in 0..20 {
            pre.ingest(&sine(220.0, 0.9, 2048));
        }
        let frame = pre.processed_frame();
        assert!(frame.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!(pre.current_gain() <= ProcessingConfig::default().max_gain);
    }

    #[test]
    fn update_config_hot_swaps_cutoffs() {
        let mut pre = Preprocessor::new(ProcessingConfig::default(), 44_100, 256).unwrap();
        pre.ingest(&sine(220.0, 0.3, 256));
        let update = ProcessingConfigUpdate {
            high_pass_hz: Some(90.0),
            ..Default::default()
        };
        pre.update_config(&update).unwrap();
        assert_eq!(pre.config().high_pass_hz, 90.0);
        // The analysis window survives a config change.
        assert_eq!(pre.processed_frame().len(), 256);
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut pre = Preprocessor::new(ProcessingConfig::default(), 44_100, 64).unwrap();
        pre.ingest(&sine(220.0, 0.3, 64));
        pre.dispose();
        pre.dispose();
        assert!(pre.is_disposed());
        assert!(pre.processed_frame().is_empty());
        pre.ingest(&sine(220.0, 0.3, 64));
        assert!(pre.processed_frame().is_empty());
    }
}
