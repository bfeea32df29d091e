use std::fmt;

use serde::{Deserialize, Serialize};

use crate::float::Float;

pub mod arbitration;
pub mod internals;
pub mod mcleod;
pub mod yin;

/// Which estimator produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    TimeDomain,
    FrequencyDomain,
    Silence,
}

impl Algorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::TimeDomain => "time-domain",
            Algorithm::FrequencyDomain => "frequency-domain",
            Algorithm::Silence => "silence",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-frame candidate from one detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub frequency: f64,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub algorithm: Algorithm,
}

/// A detector returns `None` when the frame has no acceptable candidate;
/// that is the normal "nothing here" answer, never an error.
pub trait PitchDetector<T>
where
    T: Float,
{
    fn get_pitch(&mut self, signal: &[T]) -> Option<Detection>;
}
