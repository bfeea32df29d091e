use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::float::{to_f64, Float};
use crate::utils::buffer::{copy_complex_to_real, copy_real_to_complex, modulus_squared};
use crate::utils::buffer::{new_complex_buffer, ComplexComponent};

/// Planned transforms and scratch buffers owned by a detector.
///
/// The pipeline may run next to an audio callback, so everything is allocated
/// once here and reused for every frame.
pub struct DetectorInternals<T>
where
    T: Float,
{
    pub size: usize,
    pub transform_size: usize,
    forward: Arc<dyn Fft<T>>,
    inverse: Arc<dyn Fft<T>>,
    signal_complex: Vec<Complex<T>>,
    truncated_complex: Vec<Complex<T>>,
    scratch: Vec<Complex<T>>,
}

impl<T> DetectorInternals<T>
where
    T: Float,
{
    pub fn new(size: usize, transform_size: usize) -> Self {
        assert!(transform_size >= size);
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(transform_size);
        let inverse = planner.plan_fft_inverse(transform_size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        DetectorInternals {
            size,
            transform_size,
            forward,
            inverse,
            signal_complex: new_complex_buffer(transform_size),
            truncated_complex: new_complex_buffer(transform_size),
            scratch: new_complex_buffer(scratch_len),
        }
    }

    /// Compute the linear autocorrelation of `signal` into `result` via the
    /// Wiener–Khinchin theorem. Lags are valid as long as
    /// `transform_size >= signal.len() + result.len()`.
    pub fn autocorrelation(&mut self, signal: &[T], result: &mut [f64]) {
        let normalization = 1.0 / self.transform_size as f64;

        copy_real_to_complex(signal, &mut self.signal_complex, ComplexComponent::Re);
        self.forward
            .process_with_scratch(&mut self.signal_complex, &mut self.scratch);
        modulus_squared(&mut self.signal_complex);
        self.inverse
            .process_with_scratch(&mut self.signal_complex, &mut self.scratch);
        copy_complex_to_real(
            &self.signal_complex,
            result,
            ComplexComponent::Re,
            normalization,
        );
    }

    /// Compute the windowed autocorrelation of `signal` and put the result in `result`.
    /// For a signal _x=(x_0,x_1,...)_, the windowed autocorrelation with window size _w_ is
    /// the function
    ///
    /// > r(t) = sum_{i=0}^{w-1} x_i*x_{i+t}
    ///
    /// Only lags with `window_size + t <= signal.len()` are meaningful.
    pub fn windowed_autocorrelation(
        &mut self,
        signal: &[T],
        window_size: usize,
        result: &mut [f64],
    ) {
        assert!(window_size + result.len() <= signal.len() + 1);
        let normalization = 1.0 / self.transform_size as f64;

        // The windowed autocorrelation is the cross correlation between the
        // original signal and the signal truncated to lie in `0..window_size`
        copy_real_to_complex(signal, &mut self.signal_complex, ComplexComponent::Re);
        copy_real_to_complex(
            &signal[..window_size],
            &mut self.truncated_complex,
            ComplexComponent::Re,
        );
        self.forward
            .process_with_scratch(&mut self.signal_complex, &mut self.scratch);
        self.forward
            .process_with_scratch(&mut self.truncated_complex, &mut self.scratch);
        self.signal_complex
            .iter_mut()
            .zip(self.truncated_complex.iter())
            .for_each(|(a, b)| *a = *a * b.conj());
        self.inverse
            .process_with_scratch(&mut self.signal_complex, &mut self.scratch);
        copy_complex_to_real(
            &self.signal_complex,
            result,
            ComplexComponent::Re,
            normalization,
        );
    }
}

/// Compute the windowed square error, _d(t)_, of `signal` from its windowed
/// autocorrelation. For a window size of _w_ and a signal _x=(x_0,x_1,...)_,
/// this is defined by
///
///  > d(t) = sum_{i=0}^{w-1} (x_i - x_{i+t})^2
///
/// `result` must not be longer than `windowed_autocorrelation`.
pub fn windowed_square_error<T: Float>(
    signal: &[T],
    window_size: usize,
    windowed_autocorrelation: &[f64],
    result: &mut [f64],
) {
    // d(t) = pow_0^w + pow_t^{t+w} - 2*windowed_autocorrelation(t)
    // where pow_a^b is the sum of the square of `signal` on the window `a..b`
    let power: f64 = signal[..window_size].iter().map(|&s| square(s)).sum();
    let mut windowed_power = power;

    for (i, (d, r)) in result
        .iter_mut()
        .zip(windowed_autocorrelation.iter())
        .enumerate()
    {
        // Rounding in the transform can leave tiny negative values.
        *d = (power + windowed_power - 2.0 * r).max(0.0);
        // Slide pow_t^{t+w} to pow_{t+1}^{t+1+w}
        if i + window_size < signal.len() {
            windowed_power = windowed_power - square(signal[i]) + square(signal[i + window_size]);
        }
    }
}

/// Calculate the "cumulative mean normalized difference function" as
/// specified in the YIN paper. If _d(t)_ is the square error function,
/// compute _d'(0) = 1_ and for _t > 0_
///
///  > d'(t) = d(t) / [ (1/t) * sum_{i=1}^t d(i) ]
///
/// Where the running sum vanishes the value is set to 1.
pub fn yin_normalize_square_error(square_error: &mut [f64]) {
    if square_error.is_empty() {
        return;
    }
    let mut sum = 0.0;
    square_error[0] = 1.0;
    square_error
        .iter_mut()
        .enumerate()
        .skip(1)
        .for_each(|(i, a)| {
            sum += *a;
            *a = if sum > f64::EPSILON {
                *a * i as f64 / sum
            } else {
                1.0
            };
        });
}

/// Normalise an autocorrelation into the NSDF
///
///  > n(t) = r(t) / sqrt(r(0) * sum_{i} x_{i+t}^2)
///
/// which lies in `[-1, 1]`. Lags whose denominator is negligible are zero.
pub fn normalized_square_difference<T: Float>(
    signal: &[T],
    autocorrelation: &[f64],
    result: &mut [f64],
) {
    let energy: f64 = signal.iter().map(|&s| square(s)).sum();
    let mut tail = energy;

    for (tau, (n, r)) in result.iter_mut().zip(autocorrelation.iter()).enumerate() {
        let denominator = (energy * tail).sqrt();
        *n = if denominator > f64::EPSILON && denominator.is_finite() {
            (r / denominator).clamp(-1.0, 1.0)
        } else {
            0.0
        };
        if tau < signal.len() {
            tail = (tail - square(signal[tau])).max(0.0);
        }
    }
}

#[inline]
fn square<T: Float>(s: T) -> f64 {
    let v = to_f64(s);
    v * v
}
