//! # Error Module
//!
//! Error taxonomy for the pitch tracking core. Only conditions a caller can act
//! on are errors: an unusable capture source, a rejected configuration, or an
//! I/O/serialization failure while loading or saving settings. Numerical edge
//! cases (silence, zero variance, flat interpolation windows) are handled
//! inline and never surface here.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PitchError>;

#[derive(Debug, Error)]
pub enum PitchError {
    /// The capture stream carries no usable audio track.
    #[error("unsupported audio source: {0}")]
    UnsupportedSource(String),
    /// A configuration value failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// The capture backend reported a failure.
    #[error("capture backend error: {0}")]
    Capture(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PitchError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        PitchError::InvalidConfiguration(msg.into())
    }
}
