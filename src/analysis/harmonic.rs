use crate::float::{to_f64, Float};
use crate::utils::stats::clamp_unit;

/// Divisors of f0 whose periods are checked: f0, f0/2 and f0/3.
const SUBDIVISIONS: [usize; 3] = [1, 2, 3];

/// Harmonic coherence of `signal` at `f0`: the mean absolute normalised
/// autocorrelation at the lags of f0, f0/2 and f0/3.
///
/// A periodic signal at f0 lines up with itself at every multiple of its
/// period, so a score near one means the frame really repeats at f0. Lags
/// that do not fit in the frame are skipped; a degenerate frame scores zero.
pub fn harmonic_score<T: Float>(signal: &[T], sample_rate: usize, f0: f64) -> f64 {
    if !(f0 > 0.0 && f0.is_finite()) || signal.len() < 2 {
        return 0.0;
    }
    let period = sample_rate as f64 / f0;

    let (total, count) = SUBDIVISIONS
        .iter()
        .map(|&k| (k as f64 * period).round() as usize)
        .filter(|&lag| lag > 0 && lag < signal.len())
        .filter_map(|lag| normalized_correlation(signal, lag))
        .fold((0.0, 0usize), |(total, count), score| {
            (total + score.abs(), count + 1)
        });

    if count == 0 {
        return 0.0;
    }
    clamp_unit(total / count as f64)
}

/// `sum x_i x_{i+lag} / sqrt(sum x_i^2 * sum x_{i+lag}^2)` over the overlap.
fn normalized_correlation<T: Float>(signal: &[T], lag: usize) -> Option<f64> {
    let (mut cross, mut head, mut tail) = (0.0, 0.0, 0.0);
    for (&a, &b) in signal.iter().zip(signal[lag..].iter()) {
        let (a, b) = (to_f64(a), to_f64(b));
        cross += a * b;
        head += a * a;
        tail += b * b;
    }
    let denominator = (head * tail).sqrt();
    if denominator > f64::EPSILON && denominator.is_finite() {
        Some(cross / denominator)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, size: usize) -> Vec<f64> {
        (0..size)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / 44100.0).sin())
            .collect()
    }

    #[test]
    fn periodic_signal_scores_high() {
        let score = harmonic_score(&sine(441.0, 2048), 44100, 441.0);
        assert!(score > 0.99, "{}", score);
    }

    #[test]
    fn wrong_f0_scores_lower() {
        let signal = sine(441.0, 2048);
        let right = harmonic_score(&signal, 44100, 441.0);
        let wrong = harmonic_score(&signal, 44100, 300.0);
        assert!(wrong < right);
    }

    #[test]
    fn degenerate_input_scores_zero() {
        assert_eq!(harmonic_score(&vec![0.0f32; 2048], 44100, 440.0), 0.0);
        assert_eq!(harmonic_score(&sine(440.0, 2048), 44100, 0.0), 0.0);
        // Every lag longer than the frame
        assert_eq!(harmonic_score(&sine(440.0, 64), 44100, 100.0), 0.0);
    }
}
