//! # String-mute detection
//!
//! Damping a string with the hand produces a short, harmonically atypical
//! transient: the level collapses while the detectors report a jump to some
//! unrelated, often off-pitch frequency. Reporting that as a new note would be
//! wrong, so such frames are classified here from the previous frame's level
//! and frequency plus the current candidate.

use serde::Serialize;

use crate::config::MuteConfig;
use crate::detector::Detection;
use crate::note::{deviation_from_nearest, Note};
use crate::utils::stats::near_ratio;

/// The individual evidence gathered for one frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MuteSignals {
    /// Level fell below the sensitivity-scaled drop threshold.
    pub rms_drop: bool,
    pub severe_drop: bool,
    /// Implausible frequency jump from the previous frame.
    pub frequency_jump: bool,
    /// Candidate far from any equal-tempered note.
    pub off_pitch: bool,
    pub very_quiet: bool,
    /// Note label changed while the level dropped.
    pub label_change: bool,
}

impl MuteSignals {
    /// `(drop ∧ label) ∨ (severe ∧ jump) ∨ (quiet ∧ off-pitch) ∨ (drop ∧ off-pitch ∧ jump)`
    pub fn is_transition(&self) -> bool {
        (self.rms_drop && self.label_change)
            || (self.severe_drop && self.frequency_jump)
            || (self.very_quiet && self.off_pitch)
            || (self.rms_drop && self.off_pitch && self.frequency_jump)
    }
}

/// Outcome of inspecting one frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct MuteVerdict {
    pub signals: MuteSignals,
    pub transition: bool,
    /// The candidate must not be accepted at all.
    pub force_silence: bool,
    pub previous_rms: Option<f64>,
    pub previous_frequency: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct PreviousFrame {
    rms: f64,
    frequency: Option<f64>,
    note: Option<Note>,
}

#[derive(Debug, Clone)]
pub struct MuteDetector {
    config: MuteConfig,
    previous: Option<PreviousFrame>,
}

impl MuteDetector {
    pub fn new(config: MuteConfig) -> Self {
        MuteDetector {
            config,
            previous: None,
        }
    }

    /// Classify the current frame, then remember it as the previous one.
    pub fn inspect(&mut self, rms: f64, candidate: Option<&Detection>) -> MuteVerdict {
        let previous = self.previous;
        let frequency = candidate.map(|c| c.frequency);
        let note = frequency
            .and_then(Note::from_frequency)
            .map(|(note, _)| note);
        self.previous = Some(PreviousFrame {
            rms,
            frequency,
            note,
        });

        let mut verdict = MuteVerdict {
            previous_rms: previous.map(|p| p.rms),
            previous_frequency: previous.and_then(|p| p.frequency),
            ..MuteVerdict::default()
        };
        if !self.config.enabled {
            return verdict;
        }

        let signals = self.signals(rms, candidate, note, previous);
        verdict.signals = signals;
        verdict.transition = signals.is_transition();

        if let (true, Some(candidate), Some(prev_f)) =
            (verdict.transition, candidate, verdict.previous_frequency)
        {
            let change = (candidate.frequency / prev_f - 1.0).abs();
            verdict.force_silence = change > self.config.force_silence_change
                && candidate.confidence < self.config.force_silence_confidence;
        }
        verdict
    }

    fn signals(
        &self,
        rms: f64,
        candidate: Option<&Detection>,
        note: Option<Note>,
        previous: Option<PreviousFrame>,
    ) -> MuteSignals {
        let config = &self.config;
        let mut signals = MuteSignals {
            very_quiet: rms < config.very_quiet_rms,
            ..MuteSignals::default()
        };

        if let Some(candidate) = candidate {
            signals.off_pitch = deviation_from_nearest(candidate.frequency)
                .map_or(false, |cents| cents > config.off_pitch_cents);
        }

        let previous = match previous {
            Some(previous) => previous,
            None => return signals,
        };

        let rms_ratio = if previous.rms > 0.0 && previous.rms.is_finite() {
            Some(rms / previous.rms)
        } else {
            None
        };
        if let Some(ratio) = rms_ratio {
            signals.rms_drop = ratio < config.drop_threshold * config.sensitivity;
            signals.severe_drop = ratio < config.severe_drop_ratio * config.sensitivity;
        }

        if let (Some(candidate), Some(prev_f)) = (candidate, previous.frequency) {
            signals.frequency_jump = self.is_jump(candidate.frequency / prev_f);
        }

        if let (Some(current), Some(prev_note), Some(ratio)) = (note, previous.note, rms_ratio) {
            signals.label_change = current != prev_note && ratio < config.label_change_drop;
        }
        signals
    }

    fn is_jump(&self, ratio: f64) -> bool {
        if !(ratio > 0.0 && ratio.is_finite()) {
            return false;
        }
        let config = &self.config;
        let consonant = config
            .consonant_windows
            .iter()
            .any(|w| w.contains(ratio) || w.contains(1.0 / ratio));
        if consonant {
            return true;
        }
        let octave = near_ratio(ratio, 2.0, config.harmonic_tolerance)
            || near_ratio(ratio, 0.5, config.harmonic_tolerance);
        ratio.max(1.0 / ratio) > config.jump_ratio && !octave
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}
