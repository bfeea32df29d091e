//! # Note locking
//!
//! The last stage of the tracker. Once a confident estimate arrives it is
//! *locked*, and from then on small fluctuations, octave flips and brief
//! dropouts are absorbed instead of reaching the output:
//!
//! * octave-like ratios (about 2 or 1/2) need clearly better confidence;
//! * a large downward drop needs better confidence;
//! * deltas inside the hysteresis band are adopted when they are about as
//!   confident as the lock or drift steadily towards its edge;
//! * any larger delta is a new note and replaces the lock;
//! * on silence the lock is re-emitted for the profile's hold time.
//!
//! [DisplayHysteresis] then keeps the note label from flapping between two
//! neighbouring notes when the pitch sits near the boundary between them.

use std::time::Duration;

use serde::Serialize;

use crate::config::LockConfig;
use crate::detector::Detection;
use crate::note::{cents_between, Note};
use crate::profile::FrequencyProfile;
use crate::utils::stats::near_ratio;

/// How the locker treated one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LockAction {
    /// A first lock was acquired.
    Acquired,
    /// A small change was taken over into the lock.
    Adopted,
    /// A different note replaced the lock.
    Replaced,
    /// The candidate was rejected and the lock re-emitted.
    Held,
    /// Silence, but the lock is still inside its hold time.
    HeldThroughSilence,
    /// The lock was given up.
    Released,
    /// Not confident enough to lock; the candidate is passed through.
    Unlocked,
    /// Nothing to emit.
    Silent,
}

/// Hysteresis state machine over voiced candidates.
#[derive(Debug, Clone)]
pub struct NoteLocker {
    config: LockConfig,
    locked: Option<Detection>,
    last_strong: Option<Duration>,
}

impl NoteLocker {
    pub fn new(config: LockConfig) -> Self {
        NoteLocker {
            config,
            locked: None,
            last_strong: None,
        }
    }

    /// Feed one frame. Returns the estimate to emit (if any) and what happened.
    pub fn update(
        &mut self,
        candidate: Option<Detection>,
        profile: &FrequencyProfile,
        now: Duration,
    ) -> (Option<Detection>, LockAction) {
        match candidate {
            Some(candidate) => self.voiced(candidate, profile, now),
            None => self.unvoiced(profile, now),
        }
    }

    fn voiced(
        &mut self,
        candidate: Detection,
        profile: &FrequencyProfile,
        now: Duration,
    ) -> (Option<Detection>, LockAction) {
        let locked = match self.locked {
            Some(locked) => locked,
            None if candidate.confidence >= profile.lock_threshold => {
                log::debug!(
                    "lock acquired at {:.2} Hz (confidence {:.2})",
                    candidate.frequency,
                    candidate.confidence
                );
                return self.take(candidate, now, LockAction::Acquired);
            }
            None => return (Some(candidate), LockAction::Unlocked),
        };

        let config = &self.config;
        let ratio = candidate.frequency / locked.frequency;
        if near_ratio(ratio, 2.0, config.octave_tolerance)
            || near_ratio(ratio, 0.5, config.octave_tolerance)
        {
            if candidate.confidence > config.octave_override * locked.confidence {
                log::debug!(
                    "lock moved an octave: {:.2} -> {:.2} Hz",
                    locked.frequency,
                    candidate.frequency
                );
                return self.take(candidate, now, LockAction::Replaced);
            }
            return (Some(locked), LockAction::Held);
        }

        if ratio < config.drop_ratio && candidate.confidence <= locked.confidence {
            return (Some(locked), LockAction::Held);
        }

        let delta = cents_between(candidate.frequency, locked.frequency).abs();
        if delta <= config.hysteresis_cents {
            if candidate.confidence >= config.adopt_confidence_ratio * locked.confidence
                || delta >= config.drift_fraction * config.hysteresis_cents
            {
                return self.take(candidate, now, LockAction::Adopted);
            }
            // Same note, weaker reading: it still confirms the lock.
            self.last_strong = Some(now);
            return (Some(locked), LockAction::Held);
        }

        log::debug!(
            "lock replaced: {:.2} -> {:.2} Hz",
            locked.frequency,
            candidate.frequency
        );
        self.take(candidate, now, LockAction::Replaced)
    }

    fn unvoiced(
        &mut self,
        profile: &FrequencyProfile,
        now: Duration,
    ) -> (Option<Detection>, LockAction) {
        let (locked, last_strong) = match (self.locked, self.last_strong) {
            (Some(locked), Some(last_strong)) => (locked, last_strong),
            _ => return (None, LockAction::Silent),
        };
        if now.saturating_sub(last_strong) <= Duration::from_millis(profile.hold_ms) {
            (Some(locked), LockAction::HeldThroughSilence)
        } else {
            self.release();
            (None, LockAction::Released)
        }
    }

    fn take(
        &mut self,
        candidate: Detection,
        now: Duration,
        action: LockAction,
    ) -> (Option<Detection>, LockAction) {
        self.locked = Some(candidate);
        self.last_strong = Some(now);
        (Some(candidate), action)
    }

    /// Drop the lock immediately.
    pub fn release(&mut self) {
        if let Some(locked) = self.locked.take() {
            log::debug!("lock released at {:.2} Hz", locked.frequency);
        }
        self.last_strong = None;
    }

    pub fn locked(&self) -> Option<&Detection> {
        self.locked.as_ref()
    }

    pub fn is_locked(&self) -> bool {
        self.locked.is_some()
    }

    pub fn reset(&mut self) {
        self.locked = None;
        self.last_strong = None;
    }
}

/// Keeps the displayed note label stable near note boundaries.
#[derive(Debug, Clone)]
pub struct DisplayHysteresis {
    marginal_cents: f64,
    displayed: Option<Note>,
}

impl DisplayHysteresis {
    pub fn new(marginal_cents: f64) -> Self {
        DisplayHysteresis {
            marginal_cents,
            displayed: None,
        }
    }

    /// Note and cents to display for `frequency`, or `None` (clearing the
    /// label) for unvoiced output.
    pub fn apply(&mut self, frequency: Option<f64>) -> Option<(Note, f64)> {
        let reading = frequency
            .and_then(|f| Note::from_frequency(f).map(|(note, cents)| (f, note, cents)));
        let (frequency, note, cents) = match reading {
            Some(reading) => reading,
            None => {
                self.displayed = None;
                return None;
            }
        };

        if let Some(previous) = self.displayed {
            if previous != note {
                let relative = previous.cents_of(frequency);
                if relative.abs() <= 50.0 + self.marginal_cents {
                    return Some((previous, relative));
                }
            }
        }
        self.displayed = Some(note);
        Some((note, cents))
    }

    pub fn displayed(&self) -> Option<Note> {
        self.displayed
    }

    pub fn reset(&mut self) {
        self.displayed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::Algorithm;
    use crate::profile::ProfileTable;

    fn reading(frequency: f64, confidence: f64) -> Option<Detection> {
        Some(Detection {
            frequency,
            confidence,
            algorithm: Algorithm::TimeDomain,
        })
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn frequency(output: (Option<Detection>, LockAction)) -> Option<f64> {
        output.0.map(|d| d.frequency)
    }

    #[test]
    fn locks_only_when_confident() {
        let table = ProfileTable::default();
        let mid = table.for_frequency(440.0);
        let mut locker = NoteLocker::new(LockConfig::default());
        let (out, action) = locker.update(reading(440.0, 0.5), mid, ms(0));
        assert_eq!(action, LockAction::Unlocked);
        assert_eq!(out.map(|d| d.frequency), Some(440.0));
        assert!(!locker.is_locked());

        let (_, action) = locker.update(reading(440.0, 0.8), mid, ms(46));
        assert_eq!(action, LockAction::Acquired);
        assert!(locker.is_locked());
    }

    #[test]
    fn octave_flip_is_held_unless_much_more_confident() {
        let table = ProfileTable::default();
        let profile = table.for_frequency(220.0);
        let mut locker = NoteLocker::new(LockConfig::default());
        locker.update(reading(220.0, 0.7), profile, ms(0));

        let out = locker.update(reading(440.0, 0.8), profile, ms(46));
        assert_eq!(out.1, LockAction::Held);
        assert_eq!(frequency(out), Some(220.0));

        let out = locker.update(reading(440.0, 0.9), profile, ms(92));
        assert_eq!(out.1, LockAction::Replaced);
        assert_eq!(frequency(out), Some(440.0));
    }

    #[test]
    fn weak_drop_is_held() {
        let table = ProfileTable::default();
        let profile = table.for_frequency(300.0);
        let mut locker = NoteLocker::new(LockConfig::default());
        locker.update(reading(300.0, 0.9), profile, ms(0));
        let out = locker.update(reading(180.0, 0.85), profile, ms(46));
        assert_eq!(out.1, LockAction::Held);
    }

    #[test]
    fn small_deltas_follow_drift_but_ignore_weak_jitter() {
        let table = ProfileTable::default();
        let profile = table.for_frequency(440.0);
        let mut locker = NoteLocker::new(LockConfig::default());
        locker.update(reading(440.0, 0.9), profile, ms(0));

        // 1 cent away and much weaker: held
        let out = locker.update(reading(440.25, 0.5), profile, ms(46));
        assert_eq!(out.1, LockAction::Held);
        assert_eq!(frequency(out), Some(440.0));

        // 1 cent away, similar confidence: adopted
        let out = locker.update(reading(440.25, 0.88), profile, ms(92));
        assert_eq!(out.1, LockAction::Adopted);

        // 3.5 cents away and weak: drift towards the edge is still adopted
        let drifted = crate::note::shift_by_cents(440.25, 3.5);
        let out = locker.update(reading(drifted, 0.5), profile, ms(139));
        assert_eq!(out.1, LockAction::Adopted);
    }

    #[test]
    fn large_delta_replaces_even_when_less_confident() {
        let table = ProfileTable::default();
        let profile = table.for_frequency(440.0);
        let mut locker = NoteLocker::new(LockConfig::default());
        locker.update(reading(440.0, 0.9), profile, ms(0));

        // A#4, a semitone up, played more softly
        let out = locker.update(reading(466.16, 0.6), profile, ms(46));
        assert_eq!(out.1, LockAction::Replaced);
        assert_eq!(frequency(out), Some(466.16));

        // The new lock then absorbs its own jitter
        let out = locker.update(reading(466.3, 0.3), profile, ms(92));
        assert_eq!(out.1, LockAction::Held);
        assert_eq!(frequency(out), Some(466.16));
    }

    #[test]
    fn silence_holds_then_releases() {
        let table = ProfileTable::default();
        let low = table.for_frequency(110.0);
        let mut locker = NoteLocker::new(LockConfig::default());
        assert_eq!(locker.update(None, low, ms(0)).1, LockAction::Silent);

        locker.update(reading(110.0, 0.9), low, ms(0));
        let out = locker.update(None, low, ms(1000));
        assert_eq!(out.1, LockAction::HeldThroughSilence);
        assert_eq!(frequency(out), Some(110.0));

        let out = locker.update(None, low, ms(1300));
        assert_eq!(out, (None, LockAction::Released));
        assert!(!locker.is_locked());
    }

    #[test]
    fn display_keeps_the_label_near_the_boundary() {
        let mut display = DisplayHysteresis::new(5.0);
        let (note, _) = display.apply(Some(440.0)).unwrap();
        assert_eq!(note.to_string(), "A4");

        // 52 cents above A4 reads as A#4 -48, but stays A4
        let sharp = crate::note::shift_by_cents(440.0, 52.0);
        let (note, cents) = display.apply(Some(sharp)).unwrap();
        assert_eq!(note.to_string(), "A4");
        assert!((cents - 52.0).abs() < 1e-6);

        // Clearly A#4: the label changes
        let (note, _) = display.apply(Some(466.16)).unwrap();
        assert_eq!(note.to_string(), "A#4");

        assert_eq!(display.apply(None), None);
        assert_eq!(display.displayed(), None);
    }
}
