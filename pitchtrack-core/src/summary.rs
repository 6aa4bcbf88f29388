//! Running statistics over a session's published pitches.
//!
//! A [`SessionSummary`] is fed every value the session publishes and turns
//! them into one [`PitchReport`] when the session ends. Reports are plain
//! serde types so the host can store them next to its other progress data.

use serde::{Deserialize, Serialize};

use crate::PublishedPitch;
use crate::tuning::{self, Note};

/// What a finished session looked like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchReport {
    pub total_samples: u64,
    pub voiced_samples: u64,
    /// Share of samples that carried a pitch, in [0, 1].
    pub voiced_ratio: f32,
    pub min_pitch_hz: f32,
    pub max_pitch_hz: f32,
    pub mean_pitch_hz: f32,
    pub mean_confidence: f32,
    pub mean_stability: f32,
    /// Nearest note to the mean pitch.
    pub nearest_note: Option<Note>,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SessionSummary {
    total: u64,
    voiced: u64,
    min_pitch: f32,
    max_pitch: f32,
    pitch_sum: f64,
    confidence_sum: f64,
    stability_sum: f64,
    first_timestamp_ms: Option<f64>,
    last_timestamp_ms: f64,
}

impl SessionSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, value: &PublishedPitch) {
        self.total += 1;
        self.first_timestamp_ms.get_or_insert(value.timestamp_ms);
        self.last_timestamp_ms = value.timestamp_ms;

        if !value.is_voiced() {
            return;
        }
        if self.voiced == 0 {
            self.min_pitch = value.pitch;
            self.max_pitch = value.pitch;
        } else {
            self.min_pitch = self.min_pitch.min(value.pitch);
            self.max_pitch = self.max_pitch.max(value.pitch);
        }
        self.voiced += 1;
        self.pitch_sum += f64::from(value.pitch);
        self.confidence_sum += f64::from(value.confidence);
        self.stability_sum += f64::from(value.stability);
    }

    pub fn total_samples(&self) -> u64 {
        self.total
    }

    pub fn voiced_samples(&self) -> u64 {
        self.voiced
    }

    /// Builds the report, or `None` if no voiced sample was ever recorded.
    pub fn finish(&self) -> Option<PitchReport> {
        if self.voiced == 0 {
            return None;
        }
        let voiced = self.voiced as f64;
        let mean_pitch = (self.pitch_sum / voiced) as f32;
        Some(PitchReport {
            total_samples: self.total,
            voiced_samples: self.voiced,
            voiced_ratio: (self.voiced as f64 / self.total as f64) as f32,
            min_pitch_hz: self.min_pitch,
            max_pitch_hz: self.max_pitch,
            mean_pitch_hz: mean_pitch,
            mean_confidence: (self.confidence_sum / voiced) as f32,
            mean_stability: (self.stability_sum / voiced) as f32,
            nearest_note: tuning::nearest_note(mean_pitch),
            duration_ms: self.last_timestamp_ms - self.first_timestamp_ms.unwrap_or(0.0),
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
