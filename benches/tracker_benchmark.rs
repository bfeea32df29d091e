use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pitch_tracker::{
    detector::{mcleod::McLeodDetector, yin::YINDetector, PitchDetector},
    utils::peak::detect_peaks,
    PitchTracker, TrackerConfig,
};

const SAMPLE_RATE: usize = 44100;
const SIZE: usize = 2048;

fn tone(freq: f64, size: usize) -> Vec<f64> {
    let dt = 1.0 / SAMPLE_RATE as f64;
    (0..size)
        .map(|x| (2.0 * std::f64::consts::PI * x as f64 * dt * freq).sin())
        .collect()
}

pub fn utils_benchmark(c: &mut Criterion) {
    let v = tone(300.0, 1024);
    let vv = v.as_slice();

    c.bench_function("detect_peaks", |b| {
        b.iter(|| detect_peaks(black_box(vv), 36, 735))
    });
}

pub fn pitch_detect_benchmark(c: &mut Criterion) {
    let config = TrackerConfig::new(SAMPLE_RATE, SIZE);
    let signal = tone(300.0, SIZE);

    let mut mcleod_detector =
        McLeodDetector::<f64>::new(SIZE, config.bounds(), &config.detector).unwrap();
    let mut yin_detector =
        YINDetector::<f64>::new(SIZE, config.bounds(), &config.detector).unwrap();

    c.bench_function("McLeod get_pitch", |b| {
        b.iter(|| mcleod_detector.get_pitch(black_box(&signal)).unwrap())
    });

    c.bench_function("YIN get_pitch", |b| {
        b.iter(|| yin_detector.get_pitch(black_box(&signal)).unwrap())
    });
}

pub fn tracker_benchmark(c: &mut Criterion) {
    let signal = tone(196.0, 16 * SIZE);
    let mut tracker = PitchTracker::<f64>::new(TrackerConfig::new(SAMPLE_RATE, SIZE)).unwrap();
    let mut frames = signal.chunks_exact(SIZE).cycle();

    c.bench_function("PitchTracker estimate", |b| {
        b.iter(|| {
            let frame = frames.next().unwrap_or(&[]);
            tracker.estimate(black_box(frame))
        })
    });
}

criterion_group!(
    benches,
    pitch_detect_benchmark,
    tracker_benchmark,
    utils_benchmark
);
criterion_main!(benches);
