use std::time::{Duration, Instant};

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use pitchtrack_core::audio::CaptureStream;
use pitchtrack_core::estimator::PitchEstimator;
use pitchtrack_core::filter::TemporalFilter;
use pitchtrack_core::session::PitchSession;
use pitchtrack_core::{DetectionConfig, FilterConfig, SessionConfig};

const SAMPLE_RATE: usize = 44_100;
const SIZE: usize = 2048;

fn voice_like(freq: f32, offset: usize) -> Vec<f32> {
    let dt = 1.0 / SAMPLE_RATE as f32;
    (offset..offset + SIZE)
        .map(|n| {
            let t = n as f32 * dt;
            0.4 * (2.0 * std::f32::consts::PI * freq * t).sin()
                + 0.2 * (4.0 * std::f32::consts::PI * freq * t).sin()
                + 0.1 * (6.0 * std::f32::consts::PI * freq * t).sin()
        })
        .collect()
}

pub fn estimator_benchmark(c: &mut Criterion) {
    let signal = voice_like(180.0, 0);
    let mut estimator = PitchEstimator::new(DetectionConfig::default()).unwrap();
    c.bench_function("detect_pitch voice-optimized", |b| {
        b.iter(|| estimator.detect_pitch(black_box(&signal), 0.0))
    });

    let mut plain = PitchEstimator::new(DetectionConfig {
        voice_optimized: false,
        temporal_smoothing: false,
        ..DetectionConfig::default()
    })
    .unwrap();
    c.bench_function("detect_pitch plain", |b| {
        b.iter(|| plain.detect_pitch(black_box(&signal), 0.0))
    });

    let mut filter = TemporalFilter::new(FilterConfig::default()).unwrap();
    let mut i = 0_u32;
    c.bench_function("temporal filter process", |b| {
        b.iter(|| {
            i = i.wrapping_add(1);
            let pitch = 180.0 + (i % 7) as f32;
            filter.process(black_box(pitch), 0.9, f64::from(i))
        })
    });
}

pub fn tick_benchmark(c: &mut Criterion) {
    let (tx, stream) = CaptureStream::channel(SAMPLE_RATE as u32, 4);
    let mut session = PitchSession::new();
    session.start(SessionConfig::default(), stream).unwrap();

    let t0 = Instant::now();
    let mut tick = 0_u64;
    c.bench_function("session tick", |b| {
        b.iter(|| {
            let _ = tx.try_send(voice_like(180.0, tick as usize * SIZE));
            tick += 1;
            session.on_frame(t0 + Duration::from_millis(tick * 50))
        })
    });
}

criterion_group!(benches, estimator_benchmark, tick_benchmark);
criterion_main!(benches);
