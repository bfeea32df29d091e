//! Per-frame signal analysis feeding the stabilization pipeline: loudness
//! history, harmonic coherence and string-mute detection.

pub mod amplitude;
pub mod harmonic;
pub mod mute;
