// pitchtrack-core/src/lib.rs

//! The core logic for the real-time voice pitch tracker.
//! This crate turns a live microphone stream into a smoothed,
//! confidence-scored pitch signal. It is completely headless
//! and contains no UI code.
//!
//! Data flows one way per tick:
//!
//! ```text
//! raw frame -> Preprocessor -> PitchEstimator -> TemporalFilter -> PitchPublisher
//! ```
//!
//! [`session::PitchSession`] owns one instance of each stage and drives them
//! from the host's per-frame callback.

pub mod audio;
pub mod config;
pub mod error;
pub mod estimator;
pub mod filter;
pub mod preprocess;
pub mod ring;
pub mod session;
pub mod summary;
pub mod tuning;

use serde::{Deserialize, Serialize};

pub use config::{DetectionConfig, FilterConfig, LoopConfig, ProcessingConfig, SessionConfig};
pub use error::{PitchError, Result};

/// Which detector produced a [`PitchSample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    Yin,
    /// Plain autocorrelation, used when YIN found nothing in range.
    Autocorr,
    /// Autocorrelation result preferred over a weaker YIN result.
    Hybrid,
}

/// One raw per-frame estimate from the pitch estimator.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PitchSample {
    /// Fundamental frequency in Hz, or 0 when no pitch was found.
    pub pitch: f32,
    /// Detector confidence in [0, 1].
    pub confidence: f32,
    /// Period-to-period similarity of the waveform in [0, 1].
    pub clarity: f32,
    pub algorithm: Algorithm,
    /// Milliseconds since the session started.
    pub timestamp_ms: f64,
}

impl PitchSample {
    pub fn silent(timestamp_ms: f64) -> Self {
        Self {
            timestamp_ms,
            ..Self::default()
        }
    }

    pub fn is_voiced(&self) -> bool {
        self.pitch > 0.0
    }
}

/// The value exposed to consumers once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PublishedPitch {
    /// Smoothed (and possibly decaying) pitch in Hz, 0 for "no pitch".
    pub pitch: f32,
    pub confidence: f32,
    pub clarity: f32,
    /// Filter stability in [0, 1].
    pub stability: f32,
    /// Milliseconds since the session started.
    pub timestamp_ms: f64,
}

impl PublishedPitch {
    pub fn is_voiced(&self) -> bool {
        self.pitch > 0.0
    }
}
