//! # Audio Capture Module
//!
//! This module describes the live audio source the detection loop consumes
//! ([`CaptureStream`]) and provides a CPAL-backed way to open one on the
//! default input device.
//!
//! The core never talks to CPAL directly outside of [`start_default_capture`]:
//! any producer that can push mono `f32` frames into a crossbeam channel (a
//! test, a file reader, a different audio backend) is a valid source.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use crossbeam_channel::{Receiver, Sender};
use tracing::{info, warn};

use crate::error::{PitchError, Result};

/// Preferred capture rate. Devices that cannot do it get the closest rate.
pub const PREFERRED_SAMPLE_RATE: u32 = 44_100;

/// Number of raw frames the capture callback may queue before dropping.
const CAPTURE_QUEUE_DEPTH: usize = 8;

/// A live, mono, time-domain sample stream.
#[derive(Debug)]
pub struct CaptureStream {
    /// Sample rate of the frames in Hz.
    pub sample_rate: u32,
    /// Channel count of the underlying track. Zero means "no audio track".
    pub channels: u16,
    frames: Receiver<Vec<f32>>,
}

impl CaptureStream {
    pub fn new(sample_rate: u32, channels: u16, frames: Receiver<Vec<f32>>) -> Self {
        Self {
            sample_rate,
            channels,
            frames,
        }
    }

    /// Creates a stream together with the sender feeding it.
    ///
    /// Useful for hosts that produce frames themselves, and for tests.
    pub fn channel(sample_rate: u32, capacity: usize) -> (Sender<Vec<f32>>, Self) {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        (tx, Self::new(sample_rate, 1, rx))
    }

    pub fn has_audio_track(&self) -> bool {
        self.channels > 0 && self.sample_rate > 0
    }

    pub(crate) fn into_receiver(self) -> Receiver<Vec<f32>> {
        self.frames
    }
}

/// Starts audio capture from the default input device.
///
/// This function:
/// 1. Selects the default audio input device
/// 2. Picks an `f32` input configuration close to 44.1 kHz, preferring mono
/// 3. Down-mixes the callback data to mono and chunks it into `frame_size` frames
///
/// # Arguments
/// * `frame_size` - Number of samples per frame pushed to the stream
///
/// # Returns
/// * `Ok((stream, capture))` - CPAL stream handle (keep it alive) and the frame source
/// * `Err(PitchError::UnsupportedSource)` - No input device or no usable format
/// * `Err(PitchError::Capture)` - The backend failed to build or start the stream
pub fn start_default_capture(frame_size: usize) -> Result<(cpal::Stream, CaptureStream)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| PitchError::UnsupportedSource("no input device available".into()))?;

    let device_name = device
        .name()
        .unwrap_or_else(|_| String::from("<unnamed>"));
    info!("[capture] using input device: {device_name}");

    let configs = device
        .supported_input_configs()
        .map_err(|e| PitchError::Capture(e.to_string()))?
        .collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, PREFERRED_SAMPLE_RATE)
        .ok_or_else(|| PitchError::UnsupportedSource("no f32 input format found".into()))?;

    let sample_rate = PREFERRED_SAMPLE_RATE.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(sample_rate));
    let channels = config.channels();
    let config: cpal::StreamConfig = config.into();

    info!("[capture] {sample_rate} Hz, {channels} channel(s), {frame_size}-sample frames");

    let (sender, receiver) = crossbeam_channel::bounded::<Vec<f32>>(CAPTURE_QUEUE_DEPTH);
    let err_fn = |err| warn!("[capture] stream error: {err}");

    // Accumulates mono samples between callbacks.
    let mut audio_buffer: Vec<f32> = Vec::with_capacity(frame_size * 2);
    let channel_count = channels as usize;

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                downmix_into(data, channel_count, &mut audio_buffer);

                while audio_buffer.len() >= frame_size {
                    let frame: Vec<f32> = audio_buffer.drain(..frame_size).collect();
                    // A full queue means the loop is behind; newer audio wins.
                    let _ = sender.try_send(frame);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| PitchError::Capture(e.to_string()))?;

    stream
        .play()
        .map_err(|e| PitchError::Capture(e.to_string()))?;

    Ok((stream, CaptureStream::new(sample_rate, channels, receiver)))
}

/// Averages interleaved frames down to mono and appends them to `out`.
fn downmix_into(data: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(data);
        return;
    }
    let scale = 1.0 / channels as f32;
    out.extend(
        data.chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale),
    );
}

/// Finds the best supported audio configuration for the target sample rate.
///
/// Only 32-bit float formats qualify. Among those, mono configurations win,
/// then the one whose rate range lies closest to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32 && c.channels() > 0)
        .min_by_key(|c| {
            let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
            let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
            let in_range =
                c.min_sample_rate().0 <= target_rate && target_rate <= c.max_sample_rate().0;
            let rate_penalty = if in_range { 0 } else { min_diff.min(max_diff) };
            (c.channels() != 1, rate_penalty)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_channels() {
        let mut out = Vec::new();
        downmix_into(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2, &mut out);
        assert_eq!(out, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn downmix_passes_mono_through() {
        let mut out = vec![0.1];
        downmix_into(&[0.2, 0.3], 1, &mut out);
        assert_eq!(out, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn channel_stream_reports_track() {
        let (tx, stream) = CaptureStream::channel(44_100, 4);
        assert!(stream.has_audio_track());
        tx.send(vec![0.0; 8]).unwrap();
        assert_eq!(stream.into_receiver().recv().unwrap().len(), 8);

        let (_tx, rx) = crossbeam_channel::bounded(1);
        let silent = CaptureStream::new(44_100, 0, rx);
        assert!(!silent.has_audio_track());
    }
}
