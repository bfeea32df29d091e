use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;

use crate::float::{to_f64, Float};

pub enum ComplexComponent {
    Re,
    Im,
}

pub fn new_real_buffer<T: Float>(size: usize) -> Vec<T> {
    vec![T::zero(); size]
}

pub fn new_complex_buffer<T: Float>(size: usize) -> Vec<Complex<T>> {
    vec![Complex::zero(); size]
}

/// Copy `input` into one component of `output`, zeroing the other component
/// and zero-padding whatever of `output` is left over.
pub fn copy_real_to_complex<T: Float>(
    input: &[T],
    output: &mut [Complex<T>],
    component: ComplexComponent,
) {
    assert!(input.len() <= output.len());
    match component {
        ComplexComponent::Re => input.iter().zip(output.iter_mut()).for_each(|(i, o)| {
            o.re = *i;
            o.im = T::zero();
        }),
        ComplexComponent::Im => input.iter().zip(output.iter_mut()).for_each(|(i, o)| {
            o.im = *i;
            o.re = T::zero();
        }),
    }
    output[input.len()..]
        .iter_mut()
        .for_each(|o| *o = Complex::zero())
}

/// Copy one component of `input` into `output`, widened to `f64` and multiplied
/// by `scale`. Only `output.len()` values are copied.
pub fn copy_complex_to_real<T: Float>(
    input: &[Complex<T>],
    output: &mut [f64],
    component: ComplexComponent,
    scale: f64,
) {
    assert!(output.len() <= input.len());
    match component {
        ComplexComponent::Re => input
            .iter()
            .map(|c| c.re)
            .zip(output.iter_mut())
            .for_each(|(i, o)| *o = to_f64(i) * scale),
        ComplexComponent::Im => input
            .iter()
            .map(|c| c.im)
            .zip(output.iter_mut())
            .for_each(|(i, o)| *o = to_f64(i) * scale),
    }
}

/// Computes |x|^2 for each complex value x in `arr`. This function
/// modifies `arr` in place and leaves the complex component zero.
pub fn modulus_squared<T: Float>(arr: &mut [Complex<T>]) {
    for s in arr {
        s.re = s.re * s.re + s.im * s.im;
        s.im = T::zero();
    }
}

/// Compute the sum of the square of each element of `arr`.
pub fn square_sum<T: Float>(arr: &[T]) -> f64 {
    arr.iter()
        .map(|&s| {
            let v = to_f64(s);
            v * v
        })
        .sum()
}

/// Root-mean-square level of `arr`; zero for an empty slice.
pub fn rms<T: Float>(arr: &[T]) -> f64 {
    if arr.is_empty() {
        return 0.0;
    }
    (square_sum(arr) / arr.len() as f64).sqrt()
}
