//! # Detection Session Module
//!
//! Drives the whole pipeline from the host's per-frame callback. There is no
//! worker thread: the host calls [`PitchSession::on_frame`] as often as it
//! likes (typically once per display refresh) and the session decides whether
//! enough time has passed to run an update.
//!
//! ## State machine
//! ```text
//! Idle --start--> Running --stop--> Stopped --start--> Running
//!   \________________stop_______________/
//! ```
//!
//! Every tick re-reads the live cancellation token and session state, so a
//! stop (local or through a [`CancelToken`] clone held elsewhere) takes effect
//! on the very next call.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{debug, info, trace, warn};

use crate::PublishedPitch;
use crate::audio::CaptureStream;
use crate::config::{LoopConfig, ProcessingConfigUpdate, SessionConfig};
use crate::error::Result;
use crate::estimator::PitchEstimator;
use crate::filter::TemporalFilter;
use crate::preprocess::{FrameTap, Preprocessor};

/// Default queue depth for each subscriber channel.
pub const SUBSCRIBER_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Stopped,
}

/// Shared stop flag for one run of a session.
///
/// Each [`PitchSession::start`] mints a fresh token, so cancelling a token
/// from an earlier run never affects the current one.
#[derive(Debug, Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    generation: u64,
}

impl CancelToken {
    fn new(generation: u64) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            generation,
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Result of one host callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Too soon since the last update; nothing ran.
    Skipped,
    /// An update ran and this value was published.
    Published(PublishedPitch),
    /// The session is not running (never started, stopped, or cancelled).
    Inactive,
}

/// Fan-out of published pitches to any number of bounded subscribers.
#[derive(Debug)]
pub struct PitchPublisher {
    latest: PublishedPitch,
    subscribers: Vec<Sender<PublishedPitch>>,
    queue_depth: usize,
}

impl Default for PitchPublisher {
    fn default() -> Self {
        Self::new(SUBSCRIBER_QUEUE_DEPTH)
    }
}

impl PitchPublisher {
    pub fn new(queue_depth: usize) -> Self {
        Self {
            latest: PublishedPitch::default(),
            subscribers: Vec::new(),
            queue_depth: queue_depth.max(1),
        }
    }

    /// Opens a new subscription. Values published from now on are delivered to it.
    pub fn subscribe(&mut self) -> Receiver<PublishedPitch> {
        let (tx, rx) = crossbeam_channel::bounded(self.queue_depth);
        self.subscribers.push(tx);
        rx
    }

    pub fn publish(&mut self, value: PublishedPitch) {
        self.latest = value;
        self.subscribers.retain(|tx| match tx.try_send(value) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("[session] subscriber queue full, dropping sample");
                true
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("[session] subscriber disconnected, removing it");
                false
            }
        });
    }

    pub fn latest(&self) -> PublishedPitch {
        self.latest
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// Tracks the value shown to consumers, including the fade-out on silence.
#[derive(Debug, Clone, Copy, Default)]
struct PitchDisplay {
    current: PublishedPitch,
}

impl PitchDisplay {
    /// Shows a fresh filtered value.
    fn show(&mut self, value: PublishedPitch) -> PublishedPitch {
        self.current = value;
        self.current
    }

    /// One silent tick: shrink the shown pitch, clearing it below the floor.
    ///
    /// The fading value carries no measurement, so confidence, clarity and
    /// stability read 0 from the first silent tick on.
    fn decay(&mut self, config: &LoopConfig, timestamp_ms: f64) -> PublishedPitch {
        let pitch = self.current.pitch * config.decay_factor;
        if pitch < config.decay_floor_hz {
            return self.clear(timestamp_ms);
        }
        self.current = PublishedPitch {
            pitch,
            timestamp_ms,
            ..PublishedPitch::default()
        };
        self.current
    }

    fn clear(&mut self, timestamp_ms: f64) -> PublishedPitch {
        self.current = PublishedPitch {
            timestamp_ms,
            ..PublishedPitch::default()
        };
        self.current
    }
}

/// The per-run components, built by `start` and dropped by `stop`.
struct Pipeline {
    config: SessionConfig,
    preprocessor: Preprocessor,
    tap: FrameTap,
    estimator: PitchEstimator,
    filter: TemporalFilter,
    last_raw: Vec<f32>,
    started_at: Option<Instant>,
    last_update: Option<Instant>,
}

impl Pipeline {
    fn build(config: SessionConfig, stream: CaptureStream) -> Result<Self> {
        config.validate()?;
        let mut preprocessor = Preprocessor::new(
            config.processing.clone(),
            config.detection.sample_rate,
            config.detection.frame_size,
        )?;
        let tap = preprocessor.connect(stream)?;
        Ok(Self {
            estimator: PitchEstimator::new(config.detection.clone())?,
            filter: TemporalFilter::new(config.filter.clone())?,
            last_raw: Vec::with_capacity(config.detection.frame_size),
            config,
            preprocessor,
            tap,
            started_at: None,
            last_update: None,
        })
    }

    /// Feeds every frame that arrived since the last update through the preprocessor.
    fn pull_frames(&mut self) {
        for raw in self.tap.drain() {
            self.preprocessor.ingest(&raw);
            self.last_raw = raw;
        }
    }

    fn dispose(&mut self) {
        self.preprocessor.dispose();
        self.estimator.reset();
        self.filter.reset();
        self.last_raw = Vec::new();
    }
}

/// One live pitch-tracking session.
pub struct PitchSession {
    state: SessionState,
    token: Option<CancelToken>,
    generation: u64,
    pipeline: Option<Pipeline>,
    publisher: PitchPublisher,
    display: PitchDisplay,
    tick_count: u64,
    publish_count: u64,
}

impl Default for PitchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PitchSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            token: None,
            generation: 0,
            pipeline: None,
            publisher: PitchPublisher::default(),
            display: PitchDisplay::default(),
            tick_count: 0,
            publish_count: 0,
        }
    }

    /// Starts tracking `stream`, stopping any previous run first.
    ///
    /// The session clock starts at the first [`on_frame`](Self::on_frame)
    /// call after this returns.
    ///
    /// # Errors
    /// * `InvalidConfiguration` if any config section is invalid
    /// * `UnsupportedSource` if the stream cannot be connected
    ///
    /// On error the session is left stopped.
    pub fn start(&mut self, config: SessionConfig, stream: CaptureStream) -> Result<CancelToken> {
        self.stop();

        let pipeline = Pipeline::build(config, stream)?;
        self.generation += 1;
        let token = CancelToken::new(self.generation);

        info!(
            "[session] started run {} ({} Hz, frame {}, update every {:?})",
            self.generation,
            pipeline.config.detection.sample_rate,
            pipeline.config.detection.frame_size,
            pipeline.config.detection_loop.update_interval()
        );

        self.pipeline = Some(pipeline);
        self.token = Some(token.clone());
        self.display = PitchDisplay::default();
        self.state = SessionState::Running;
        Ok(token)
    }

    /// Stops the current run. Safe to call in any state and more than once.
    ///
    /// After this returns no tick does any work until the next `start`, and
    /// subscribers have received a cleared ("no pitch") value.
    pub fn stop(&mut self) {
        if self.state == SessionState::Stopped {
            return;
        }
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        if let Some(mut pipeline) = self.pipeline.take() {
            pipeline.dispose();
            let cleared = self.display.clear(self.display.current.timestamp_ms);
            self.publisher.publish(cleared);
            info!(
                "[session] stopped run {} after {} updates",
                self.generation, self.publish_count
            );
        }
        self.state = SessionState::Stopped;
    }

    /// Host per-frame callback.
    pub fn on_frame(&mut self, now: Instant) -> TickOutcome {
        if self.state != SessionState::Running {
            return TickOutcome::Inactive;
        }
        if self.token.as_ref().is_none_or(CancelToken::is_cancelled) {
            debug!("[session] run {} cancelled externally", self.generation);
            self.stop();
            return TickOutcome::Inactive;
        }
        let Some(pipeline) = self.pipeline.as_mut() else {
            return TickOutcome::Inactive;
        };
        self.tick_count += 1;

        let started_at = *pipeline.started_at.get_or_insert(now);
        let elapsed = now.saturating_duration_since(started_at);
        if pipeline
            .config
            .detection_loop
            .max_duration()
            .is_some_and(|limit| elapsed >= limit)
        {
            info!("[session] max duration reached after {elapsed:?}");
            self.stop();
            return TickOutcome::Inactive;
        }

        let interval = pipeline.config.detection_loop.update_interval();
        if let Some(last) = pipeline.last_update {
            if now.saturating_duration_since(last) < interval {
                return TickOutcome::Skipped;
            }
        }
        pipeline.last_update = Some(now);

        let value = Self::update(pipeline, &mut self.display, elapsed);
        self.publisher.publish(value);
        self.publish_count += 1;
        trace!(
            "[session] tick {} published {:.1} Hz",
            self.tick_count, value.pitch
        );
        TickOutcome::Published(value)
    }

    /// One full estimator + filter pass.
    fn update(pipeline: &mut Pipeline, display: &mut PitchDisplay, elapsed: Duration) -> PublishedPitch {
        let timestamp_ms = elapsed.as_secs_f64() * 1000.0;
        pipeline.pull_frames();

        let Pipeline {
            preprocessor,
            estimator,
            filter,
            last_raw,
            config,
            ..
        } = pipeline;

        let processed = preprocessor.processed_frame();
        let frame: &[f32] = if processed.is_empty() {
            last_raw.as_slice()
        } else {
            processed
        };

        let sample = estimator.detect_pitch(frame, timestamp_ms);
        let pitch = filter.process(sample.pitch, sample.confidence, timestamp_ms);

        if pitch > 0.0 {
            display.show(PublishedPitch {
                pitch,
                confidence: sample.confidence,
                clarity: sample.clarity,
                stability: filter.metrics().stability,
                timestamp_ms,
            })
        } else {
            display.decay(&config.detection_loop, timestamp_ms)
        }
    }

    /// Applies a partial preprocessing update to the running session.
    pub fn update_processing(&mut self, update: &ProcessingConfigUpdate) -> Result<()> {
        match self.pipeline.as_mut() {
            Some(pipeline) => {
                pipeline.preprocessor.update_config(update)?;
                pipeline.config.processing = pipeline.preprocessor.config().clone();
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Clears filter and estimator history without stopping.
    pub fn reset_filter(&mut self) {
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.filter.reset();
            pipeline.estimator.reset();
            debug!("[session] filter reset");
        }
    }

    pub fn subscribe(&mut self) -> Receiver<PublishedPitch> {
        self.publisher.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    /// Most recently published value.
    pub fn latest(&self) -> PublishedPitch {
        self.publisher.latest()
    }

    /// Current AGC gain, or `None` when not running.
    pub fn current_gain(&self) -> Option<f32> {
        self.pipeline.as_ref().map(|p| p.preprocessor.current_gain())
    }

    /// Number of runs started so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Callbacks received while running, including skipped ones.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn publish_count(&self) -> u64 {
        self.publish_count
    }
}

impl Drop for PitchSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionConfig;
    use crate::error::PitchError;
    use crate::filter::FilterVerdict;

    const RATE: f32 = 44_100.0;

    struct Tone {
        freq: f32,
        phase: usize,
    }

    impl Tone {
        fn next_frame(&mut self, len: usize) -> Vec<f32> {
            let frame = (0..len)
                .map(|n| {
                    let t = (self.phase + n) as f32 / RATE;
                    0.5 * (2.0 * std::f32::consts::PI * self.freq * t).sin()
                })
                .collect();
            self.phase += len;
            frame
        }
    }

    fn started(config: SessionConfig) -> (PitchSession, Sender<Vec<f32>>) {
        let (tx, stream) = CaptureStream::channel(config.detection.sample_rate, 16);
        let mut session = PitchSession::new();
        session.start(config, stream).unwrap();
        (session, tx)
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn idle_session_is_inactive() {
        let mut session = PitchSession::new();
        assert_eq!(session.on_frame(Instant::now()), TickOutcome::Inactive);
        assert_eq!(session.tick_count(), 0);
    }

    #[test]
    fn tracks_a_steady_tone() {
        let (mut session, tx) = started(SessionConfig::default());
        let mut tone = Tone { freq: 220.0, phase: 0 };
        let t0 = Instant::now();
        let mut last = PublishedPitch::default();
        for i in 0..12 {
            tx.send(tone.next_frame(2048)).unwrap();
            if let TickOutcome::Published(value) = session.on_frame(t0 + ms(i * 60)) {
                last = value;
            }
        }
        assert!((last.pitch - 220.0).abs() < 5.0, "pitch {}", last.pitch);
        assert!((0.0..=1.0).contains(&last.stability));
        assert_eq!(session.latest(), last);
    }

    #[test]
    fn cold_start_falls_back_to_raw_frame() {
        let (mut session, tx) = started(SessionConfig::default());
        let mut tone = Tone { freq: 220.0, phase: 0 };
        tx.send(tone.next_frame(1024)).unwrap();
        match session.on_frame(Instant::now()) {
            TickOutcome::Published(value) => {
                assert!((value.pitch - 220.0).abs() < 5.0, "pitch {}", value.pitch)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn respects_update_interval() {
        let (mut session, _tx) = started(SessionConfig::default());
        let t0 = Instant::now();
        assert!(matches!(session.on_frame(t0), TickOutcome::Published(_)));
        assert_eq!(session.on_frame(t0 + ms(16)), TickOutcome::Skipped);
        assert_eq!(session.on_frame(t0 + ms(49)), TickOutcome::Skipped);
        assert!(matches!(session.on_frame(t0 + ms(50)), TickOutcome::Published(_)));
        assert_eq!(session.tick_count(), 4);
        assert_eq!(session.publish_count(), 2);
    }

    #[test]
    fn floor_interval_caps_fast_response() {
        let mut config = SessionConfig::default();
        config.detection_loop.response_time_ms = 1;
        let (mut session, _tx) = started(config);
        let t0 = Instant::now();
        session.on_frame(t0);
        assert_eq!(session.on_frame(t0 + ms(10)), TickOutcome::Skipped);
        assert!(matches!(session.on_frame(t0 + ms(16)), TickOutcome::Published(_)));
    }

    #[test]
    fn restart_keeps_single_cadence() {
        let (tx, stream) = CaptureStream::channel(44_100, 16);
        let mut session = PitchSession::new();
        session.start(SessionConfig::default(), stream).unwrap();
        session.stop();
        drop(tx);

        let (_tx, stream) = CaptureStream::channel(44_100, 16);
        session.start(SessionConfig::default(), stream).unwrap();
        assert_eq!(session.generation(), 2);

        let t0 = Instant::now();
        for i in 0..=62 {
            session.on_frame(t0 + ms(i * 16));
        }
        // one second of 16 ms callbacks at a 50 ms interval
        assert!(session.publish_count() <= 21, "{}", session.publish_count());
        assert!(session.publish_count() >= 15, "{}", session.publish_count());
    }

    #[test]
    fn stop_is_idempotent_and_clears() {
        let (mut session, tx) = started(SessionConfig::default());
        let rx = session.subscribe();
        let mut tone = Tone { freq: 220.0, phase: 0 };
        tx.send(tone.next_frame(2048)).unwrap();
        session.on_frame(Instant::now());

        session.stop();
        session.stop();
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(session.latest().pitch, 0.0);
        assert_eq!(session.on_frame(Instant::now()), TickOutcome::Inactive);

        let received: Vec<PublishedPitch> = rx.try_iter().collect();
        assert_eq!(received.len(), 2);
        assert_eq!(received[1].pitch, 0.0);
    }

    #[test]
    fn external_cancel_stops_session() {
        let (mut session, _tx) = started(SessionConfig::default());
        let token = session.token.clone().unwrap();
        token.cancel();
        assert_eq!(session.on_frame(Instant::now()), TickOutcome::Inactive);
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[test]
    fn stale_token_does_not_stop_new_run() {
        let (tx, stream) = CaptureStream::channel(44_100, 16);
        let mut session = PitchSession::new();
        let old = session.start(SessionConfig::default(), stream).unwrap();
        drop(tx);
        let (_tx, stream) = CaptureStream::channel(44_100, 16);
        let current = session.start(SessionConfig::default(), stream).unwrap();

        assert!(old.is_cancelled());
        old.cancel();
        assert!(!current.is_cancelled());
        assert!(matches!(session.on_frame(Instant::now()), TickOutcome::Published(_)));
    }

    #[test]
    fn max_duration_stops_itself() {
        let mut config = SessionConfig::default();
        config.detection_loop.max_duration_ms = Some(200);
        let (mut session, _tx) = started(config);
        let t0 = Instant::now();
        assert!(matches!(session.on_frame(t0), TickOutcome::Published(_)));
        assert!(matches!(session.on_frame(t0 + ms(100)), TickOutcome::Published(_)));
        assert_eq!(session.on_frame(t0 + ms(200)), TickOutcome::Inactive);
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[test]
    fn invalid_config_leaves_session_stopped() {
        let mut config = SessionConfig::default();
        config.detection = DetectionConfig {
            min_pitch_hz: 500.0,
            max_pitch_hz: 100.0,
            ..DetectionConfig::default()
        };
        let (_tx, stream) = CaptureStream::channel(44_100, 4);
        let mut session = PitchSession::new();
        assert!(session.start(config, stream).is_err());
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(session.on_frame(Instant::now()), TickOutcome::Inactive);
    }

    #[test]
    fn silence_fades_then_clears() {
        let (mut session, tx) = started(SessionConfig::default());
        let mut tone = Tone { freq: 220.0, phase: 0 };
        let t0 = Instant::now();
        let mut t = 0;
        for _ in 0..8 {
            tx.send(tone.next_frame(2048)).unwrap();
            session.on_frame(t0 + ms(t));
            t += 60;
        }
        assert!(session.latest().pitch > 200.0);

        let mut cleared = false;
        for i in 0..400 {
            tx.send(vec![0.0; 2048]).unwrap();
            session.on_frame(t0 + ms(t));
            t += 60;
            if i == 3 {
                let fading = session.latest();
                assert!(fading.pitch > 0.0);
                assert_eq!(fading.stability, 0.0);
                assert_eq!(fading.confidence, 0.0);
            }
            if session.latest().pitch == 0.0 {
                cleared = true;
                break;
            }
        }
        assert!(cleared);
        assert_eq!(session.state(), SessionState::Running);
    }

    #[test]
    fn processing_update_applies_to_running_session() {
        let (mut session, tx) = started(SessionConfig::default());
        let mut tone = Tone { freq: 220.0, phase: 0 };
        let t0 = Instant::now();
        tx.send(tone.next_frame(2048)).unwrap();
        session.on_frame(t0);

        session
            .update_processing(&ProcessingConfigUpdate {
                high_pass_hz: Some(90.0),
                low_pass_hz: Some(1500.0),
                ..ProcessingConfigUpdate::default()
            })
            .unwrap();
        let pipeline = session.pipeline.as_mut().unwrap();
        assert_eq!(pipeline.config.processing.high_pass_hz, 90.0);
        assert_eq!(pipeline.config.processing.low_pass_hz, 1500.0);
        assert_eq!(pipeline.config.processing.target_rms, 0.1);
        // the analysis window survives the swap
        assert_eq!(pipeline.preprocessor.processed_frame().len(), 2048);

        let rejected = session.update_processing(&ProcessingConfigUpdate {
            low_pass_hz: Some(50.0),
            ..ProcessingConfigUpdate::default()
        });
        assert!(matches!(rejected, Err(PitchError::InvalidConfiguration(_))));
        let pipeline = session.pipeline.as_ref().unwrap();
        assert_eq!(pipeline.config.processing.low_pass_hz, 1500.0);
        assert_eq!(pipeline.preprocessor.config().low_pass_hz, 1500.0);

        tx.send(tone.next_frame(2048)).unwrap();
        match session.on_frame(t0 + ms(60)) {
            TickOutcome::Published(value) => {
                assert!((value.pitch - 220.0).abs() < 5.0, "pitch {}", value.pitch)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn processing_update_on_idle_session_is_ignored() {
        let mut session = PitchSession::new();
        let update = ProcessingConfigUpdate {
            high_pass_hz: Some(90.0),
            ..ProcessingConfigUpdate::default()
        };
        assert!(session.update_processing(&update).is_ok());
        session.reset_filter();
        assert!(!session.is_running());
    }

    #[test]
    fn reset_filter_reseeds_on_next_voiced_tick() {
        let (mut session, tx) = started(SessionConfig::default());
        let mut tone = Tone { freq: 220.0, phase: 0 };
        let t0 = Instant::now();
        let mut t = 0;
        for _ in 0..6 {
            tx.send(tone.next_frame(2048)).unwrap();
            session.on_frame(t0 + ms(t));
            t += 60;
        }
        let initial = session.pipeline.as_ref().unwrap().config.filter.initial_error_covariance;
        let settled = session.pipeline.as_ref().unwrap().filter.metrics();
        assert!(settled.error_covariance < initial);

        session.reset_filter();
        let filter = &session.pipeline.as_ref().unwrap().filter;
        assert_eq!(filter.estimate(), 0.0);
        assert_eq!(filter.metrics().error_covariance, initial);
        assert!(session.is_running());

        tx.send(tone.next_frame(2048)).unwrap();
        let value = match session.on_frame(t0 + ms(t)) {
            TickOutcome::Published(value) => value,
            other => panic!("unexpected {other:?}"),
        };
        let filter = &session.pipeline.as_ref().unwrap().filter;
        // a seed takes the measurement as-is and leaves the covariance alone
        assert_eq!(filter.last_verdict(), FilterVerdict::Accepted);
        assert_eq!(filter.metrics().error_covariance, initial);
        assert_eq!(value.pitch, filter.estimate());
        assert!((value.pitch - 220.0).abs() < 5.0, "pitch {}", value.pitch);
    }

    #[test]
    fn display_decays_geometrically() {
        let config = LoopConfig::default();
        let mut display = PitchDisplay::default();
        display.show(PublishedPitch {
            pitch: 200.0,
            confidence: 0.9,
            ..PublishedPitch::default()
        });
        let next = display.decay(&config, 10.0);
        assert!((next.pitch - 196.0).abs() < 1e-3);
        assert_eq!(next.confidence, 0.0);
        assert_eq!(next.clarity, 0.0);
        assert_eq!(next.stability, 0.0);
        assert_eq!(next.timestamp_ms, 10.0);

        display.show(PublishedPitch {
            pitch: 10.1,
            ..PublishedPitch::default()
        });
        let cleared = display.decay(&config, 20.0);
        assert_eq!(cleared.pitch, 0.0);
        assert_eq!(cleared.timestamp_ms, 20.0);
    }

    #[test]
    fn disconnected_subscribers_are_pruned() {
        let mut publisher = PitchPublisher::new(2);
        let keep = publisher.subscribe();
        let gone = publisher.subscribe();
        drop(gone);
        publisher.publish(PublishedPitch::default());
        assert_eq!(publisher.subscriber_count(), 1);

        // a full queue drops samples but keeps the subscriber
        publisher.publish(PublishedPitch::default());
        publisher.publish(PublishedPitch::default());
        assert_eq!(publisher.subscriber_count(), 1);
        assert_eq!(keep.try_iter().count(), 2);
    }
}
