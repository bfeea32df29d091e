use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::detector::Algorithm;
use crate::note::{shift_by_cents, Note};

/// One frame's output.
///
/// `frequency`, `note` and `cents` are present exactly when `voiced` is true.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchEstimate {
    pub timestamp: Duration,
    pub frequency: Option<f64>,
    pub note: Option<Note>,
    /// Signed deviation from `note` in cents.
    pub cents: Option<f64>,
    /// In `[0, 1]`; zero for silence.
    pub confidence: f64,
    pub voiced: bool,
    pub algorithm: Algorithm,
}

impl PitchEstimate {
    pub fn silence(timestamp: Duration) -> Self {
        PitchEstimate {
            timestamp,
            frequency: None,
            note: None,
            cents: None,
            confidence: 0.0,
            voiced: false,
            algorithm: Algorithm::Silence,
        }
    }

    pub fn voiced(
        timestamp: Duration,
        frequency: f64,
        note: Note,
        cents: f64,
        confidence: f64,
        algorithm: Algorithm,
    ) -> Self {
        PitchEstimate {
            timestamp,
            frequency: Some(frequency),
            note: Some(note),
            cents: Some(cents),
            confidence,
            voiced: true,
            algorithm,
        }
    }

    /// Equal-tempered pitch of the displayed note.
    pub fn reference_frequency(&self) -> Option<f64> {
        self.note.map(|note| note.frequency())
    }

    /// The frequency recovered from the note and its cents offset.
    pub fn target_frequency(&self) -> Option<f64> {
        match (self.note, self.cents) {
            (Some(note), Some(cents)) => Some(shift_by_cents(note.frequency(), cents)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_has_no_reading() {
        let estimate = PitchEstimate::silence(Duration::from_millis(20));
        assert!(!estimate.voiced);
        assert_eq!(estimate.algorithm, Algorithm::Silence);
        assert_eq!(estimate.confidence, 0.0);
        assert_eq!(estimate.frequency, None);
        assert_eq!(estimate.target_frequency(), None);
    }

    #[test]
    fn note_and_cents_recover_the_frequency() {
        for &f in &[61.7, 82.41, 196.0, 261.3, 440.0, 452.0, 1187.0] {
            let (note, cents) = Note::from_frequency(f).unwrap();
            let estimate =
                PitchEstimate::voiced(Duration::ZERO, f, note, cents, 0.9, Algorithm::TimeDomain);
            let recovered = estimate.target_frequency().unwrap();
            assert!((recovered - f).abs() / f < 0.001, "{} vs {}", recovered, f);
        }
    }

    #[test]
    fn reference_is_the_tempered_pitch() {
        let a4: Note = "A4".parse().unwrap();
        let estimate = PitchEstimate::voiced(
            Duration::ZERO,
            442.0,
            a4,
            7.85,
            0.9,
            Algorithm::FrequencyDomain,
        );
        assert_eq!(estimate.reference_frequency(), Some(440.0));
    }
}
