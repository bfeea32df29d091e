//! # Musical notes
//!
//! Twelve-tone equal temperament naming relative to A4 = 440 Hz.
//!
//! A frequency maps to the nearest [Note] plus a signed deviation in cents,
//! where 100 cents is one semitone. The mapping is invertible: the note's
//! reference pitch shifted by the cents offset gives back the frequency.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Reference pitch of A4 in Hz.
pub const A4_FREQUENCY: f64 = 440.0;
/// MIDI number of A4.
pub const A4_MIDI: i32 = 69;

/// One of the twelve pitch classes, spelled with sharps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

const PITCH_CLASSES: [PitchClass; 12] = [
    PitchClass::C,
    PitchClass::CSharp,
    PitchClass::D,
    PitchClass::DSharp,
    PitchClass::E,
    PitchClass::F,
    PitchClass::FSharp,
    PitchClass::G,
    PitchClass::GSharp,
    PitchClass::A,
    PitchClass::ASharp,
    PitchClass::B,
];

impl PitchClass {
    /// Semitones above C.
    pub fn index(self) -> i32 {
        PITCH_CLASSES
            .iter()
            .position(|&p| p == self)
            .map(|i| i as i32)
            .unwrap_or(0)
    }

    pub fn from_index(index: i32) -> Self {
        PITCH_CLASSES[index.rem_euclid(12) as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

/// A pitch class in a given octave (scientific pitch notation, C4 = middle C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Note {
    pub pitch_class: PitchClass,
    pub octave: i32,
}

impl Note {
    pub fn new(pitch_class: PitchClass, octave: i32) -> Self {
        Note {
            pitch_class,
            octave,
        }
    }

    pub fn from_midi(midi: i32) -> Self {
        Note {
            pitch_class: PitchClass::from_index(midi),
            octave: midi.div_euclid(12) - 1,
        }
    }

    pub fn midi(&self) -> i32 {
        (self.octave + 1) * 12 + self.pitch_class.index()
    }

    /// Equal-tempered reference frequency of this note.
    pub fn frequency(&self) -> f64 {
        A4_FREQUENCY * 2f64.powf((self.midi() - A4_MIDI) as f64 / 12.0)
    }

    /// Nearest note to `frequency` and the signed deviation from it in cents.
    ///
    /// Returns `None` for non-positive or non-finite frequencies.
    pub fn from_frequency(frequency: f64) -> Option<(Note, f64)> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return None;
        }
        let midi = A4_MIDI as f64 + 12.0 * (frequency / A4_FREQUENCY).log2();
        let nearest = midi.round();
        let cents = (midi - nearest) * 100.0;
        Some((Note::from_midi(nearest as i32), cents))
    }

    /// Deviation of `frequency` from this note in cents. Unlike
    /// [Note::from_frequency] the result is not limited to ±50.
    pub fn cents_of(&self, frequency: f64) -> f64 {
        cents_between(frequency, self.frequency())
    }
}

/// Signed distance from `reference` to `frequency` in cents.
pub fn cents_between(frequency: f64, reference: f64) -> f64 {
    1200.0 * (frequency / reference).log2()
}

/// Shift `frequency` by `cents`.
pub fn shift_by_cents(frequency: f64, cents: f64) -> f64 {
    frequency * 2f64.powf(cents / 1200.0)
}

/// Distance from `frequency` to the nearest equal-tempered note, in cents.
pub fn deviation_from_nearest(frequency: f64) -> Option<f64> {
    Note::from_frequency(frequency).map(|(_, cents)| cents.abs())
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class.name(), self.octave)
    }
}

/// Error returned when a note name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot parse note name '{0}'")]
pub struct ParseNoteError(pub String);

impl FromStr for Note {
    type Err = ParseNoteError;

    /// Parses names like `"A4"`, `"C#3"`, `"Bb2"` or `"E-1"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseNoteError(s.to_string());
        let mut chars = s.chars();
        let letter = chars.next().ok_or_else(err)?;
        let base = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(err()),
        };
        let rest = chars.as_str();
        let (accidental, octave) = if let Some(r) = rest.strip_prefix('#') {
            (1, r)
        } else if let Some(r) = rest.strip_prefix('b') {
            (-1, r)
        } else {
            (0, rest)
        };
        let octave: i32 = octave.parse().map_err(|_| err())?;
        let midi = (octave + 1) * 12 + base + accidental;
        Ok(Note::from_midi(midi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_is_440() {
        let (note, cents) = Note::from_frequency(440.0).unwrap();
        assert_eq!(note.to_string(), "A4");
        assert!(cents.abs() < 1e-9);
        assert_eq!(note.frequency(), 440.0);
    }

    #[test]
    fn octave_boundary_is_at_c() {
        let (b3, _) = Note::from_frequency(246.94).unwrap();
        let (c4, _) = Note::from_frequency(261.63).unwrap();
        assert_eq!(b3.to_string(), "B3");
        assert_eq!(c4.to_string(), "C4");
        assert_eq!(c4.midi(), 60);
    }

    #[test]
    fn note_and_cents_recover_frequency() {
        let mut f = 61.0;
        while f < 1500.0 {
            let (note, cents) = Note::from_frequency(f).unwrap();
            assert!(cents.abs() <= 50.0 + 1e-9);
            let back = shift_by_cents(note.frequency(), cents);
            assert!(
                (back - f).abs() / f < 1e-3,
                "{} -> {} {} -> {}",
                f,
                note,
                cents,
                back
            );
            f *= 1.013;
        }
    }

    #[test]
    fn parses_sharps_and_flats() {
        assert_eq!("C#3".parse::<Note>().unwrap().to_string(), "C#3");
        assert_eq!("Bb2".parse::<Note>().unwrap().to_string(), "A#2");
        assert_eq!("G3".parse::<Note>().unwrap().midi(), 55);
        assert!("H2".parse::<Note>().is_err());
        assert!("A".parse::<Note>().is_err());
    }

    #[test]
    fn degenerate_frequencies_have_no_note() {
        assert!(Note::from_frequency(0.0).is_none());
        assert!(Note::from_frequency(-10.0).is_none());
        assert!(Note::from_frequency(f64::NAN).is_none());
    }

    #[test]
    fn cents_of_is_unbounded() {
        let a4 = Note::new(PitchClass::A, 4);
        assert!((a4.cents_of(880.0) - 1200.0).abs() < 1e-9);
    }
}
