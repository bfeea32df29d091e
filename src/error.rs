//! Error types for tracker construction.
//!
//! Per-frame processing is total and never produces these; they are only
//! returned while validating a configuration or building a detector.

use thiserror::Error;

/// Convenience alias for construction results.
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Reasons a tracker or detector refuses to be built.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    /// The sample rate must be strictly positive.
    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(usize),

    /// Frequency bounds must be finite, positive and ordered.
    #[error("Invalid frequency bounds: min {min} Hz, max {max} Hz")]
    InvalidFrequencyBounds { min: f64, max: f64 },

    /// The maximum frequency must lie below the Nyquist frequency.
    #[error("Maximum frequency {max} Hz is not below Nyquist ({nyquist} Hz)")]
    FrequencyAboveNyquist { max: f64, nyquist: f64 },

    /// Frame and hop sizes must be non-zero.
    #[error("Invalid frame size: {0}")]
    InvalidFrameSize(usize),

    /// The frame cannot hold the longest period plus a comparison window.
    #[error("Frame of {frame_size} samples is too short, at least {required} are needed for the lowest frequency")]
    FrameTooShort { frame_size: usize, required: usize },

    /// Transform sizes are restricted to powers of two.
    #[error("Transform size {0} is not a power of two")]
    TransformSizeNotPowerOfTwo(usize),

    /// The transform cannot hold a linear autocorrelation of the frame.
    #[error("Transform size {size} is too small, at least {required} is needed")]
    TransformTooSmall { size: usize, required: usize },

    /// Any other out-of-range tuning parameter.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// At least one frequency band profile is required.
    #[error("Profile table has no frequency bands")]
    EmptyProfileTable,

    /// Bands must be sorted and must not overlap.
    #[error("Profile band '{0}' overlaps or is out of order")]
    OverlappingProfiles(String),
}
