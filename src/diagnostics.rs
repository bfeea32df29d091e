//! Per-frame diagnostic snapshots.
//!
//! A snapshot is handed to the sink passed to
//! [PitchTracker::estimate_with_diagnostics](crate::PitchTracker::estimate_with_diagnostics)
//! once per frame. It only observes the pipeline; attaching a sink never
//! changes what the tracker emits.

use std::time::Duration;

use serde::Serialize;

use crate::analysis::mute::MuteSignals;
use crate::detector::Detection;
use crate::locker::LockAction;
use crate::stabilizer::octave::OctaveAction;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameDiagnostics<'a> {
    pub timestamp: Duration,
    /// The frame had the wrong length or non-finite samples.
    pub rejected: bool,
    pub rms: f64,
    pub recent_max: f64,
    pub threshold: f64,
    pub profile: &'a str,
    pub debounce_count: u32,
    /// Silence was declared on this frame.
    pub silent: bool,
    pub time_domain: Option<Detection>,
    pub frequency_domain: Option<Detection>,
    pub candidate: Option<Detection>,
    pub mute_transition: bool,
    pub mute_signals: MuteSignals,
    pub forced_silence: bool,
    pub previous_rms: Option<f64>,
    pub previous_frequency: Option<f64>,
    pub outlier: bool,
    pub filtered_frequency: Option<f64>,
    pub octave_action: Option<OctaveAction>,
    pub stabilized_frequency: Option<f64>,
    pub harmonic_score: Option<f64>,
    pub amplitude_factor: Option<f64>,
    pub raw_confidence: Option<f64>,
    pub refined_confidence: Option<f64>,
    pub smoothed_frequency: Option<f64>,
    pub smoothed_confidence: Option<f64>,
    pub lock_action: LockAction,
    pub locked: bool,
}

/// A single diagnostic value, for sinks that want flat key/value pairs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiagnosticValue<'a> {
    Flag(bool),
    Count(u64),
    Number(f64),
    Text(&'a str),
    Missing,
}

impl<'a> From<Option<f64>> for DiagnosticValue<'a> {
    fn from(value: Option<f64>) -> Self {
        value.map_or(DiagnosticValue::Missing, DiagnosticValue::Number)
    }
}

impl<'a> FrameDiagnostics<'a> {
    pub(crate) fn new(timestamp: Duration, profile: &'a str) -> Self {
        FrameDiagnostics {
            timestamp,
            rejected: false,
            rms: 0.0,
            recent_max: 0.0,
            threshold: 0.0,
            profile,
            debounce_count: 0,
            silent: false,
            time_domain: None,
            frequency_domain: None,
            candidate: None,
            mute_transition: false,
            mute_signals: MuteSignals::default(),
            forced_silence: false,
            previous_rms: None,
            previous_frequency: None,
            outlier: false,
            filtered_frequency: None,
            octave_action: None,
            stabilized_frequency: None,
            harmonic_score: None,
            amplitude_factor: None,
            raw_confidence: None,
            refined_confidence: None,
            smoothed_frequency: None,
            smoothed_confidence: None,
            lock_action: LockAction::Silent,
            locked: false,
        }
    }

    /// The scalar parts of the snapshot as `(key, value)` pairs.
    pub fn fields(&self) -> Vec<(&'static str, DiagnosticValue<'a>)> {
        use DiagnosticValue::*;
        vec![
            ("timestamp_ms", Number(self.timestamp.as_secs_f64() * 1000.0)),
            ("rejected", Flag(self.rejected)),
            ("rms", Number(self.rms)),
            ("recent_max", Number(self.recent_max)),
            ("threshold", Number(self.threshold)),
            ("profile", Text(self.profile)),
            ("debounce_count", Count(self.debounce_count as u64)),
            ("silent", Flag(self.silent)),
            ("candidate_frequency", self.candidate.map(|c| c.frequency).into()),
            ("mute_transition", Flag(self.mute_transition)),
            ("forced_silence", Flag(self.forced_silence)),
            ("previous_rms", self.previous_rms.into()),
            ("previous_frequency", self.previous_frequency.into()),
            ("outlier", Flag(self.outlier)),
            ("stabilized_frequency", self.stabilized_frequency.into()),
            ("harmonic_score", self.harmonic_score.into()),
            ("amplitude_factor", self.amplitude_factor.into()),
            ("raw_confidence", self.raw_confidence.into()),
            ("refined_confidence", self.refined_confidence.into()),
            ("smoothed_frequency", self.smoothed_frequency.into()),
            ("smoothed_confidence", self.smoothed_confidence.into()),
            ("locked", Flag(self.locked)),
        ]
    }
}
