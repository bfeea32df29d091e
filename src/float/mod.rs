//! Generic [Float] type which acts as a stand-in for `f32` or `f64`.
use rustfft::num_traits::float::FloatCore as NumFloatCore;
use rustfft::FftNum;
use std::fmt::{Debug, Display};

use crate::error::{TrackerError, TrackerResult};

/// Signals are processed as arrays of [Float]s. A [Float] is normally `f32` or `f64`.
pub trait Float: Display + Debug + NumFloatCore + FftNum {}

impl Float for f64 {}
impl Float for f32 {}

/// Widen a sample to `f64`. Values that cannot be represented map to `NaN`,
/// which every caller treats as a degenerate frame.
#[inline]
pub fn to_f64<T: Float>(value: T) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

/// Convert a configuration constant into the sample type.
pub fn from_f64<T: Float>(value: f64) -> TrackerResult<T> {
    T::from_f64(value).ok_or_else(|| {
        TrackerError::InvalidParameter(format!("{} is not representable as a sample", value))
    })
}
