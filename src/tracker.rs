//! # Pitch tracker
//!
//! [PitchTracker] runs the whole per-frame pipeline:
//!
//! 1. the frame's RMS enters the amplitude history;
//! 2. both detectors run and [arbitrate] picks one candidate;
//! 3. the mute detector inspects the level and frequency change;
//! 4. the active profile is chosen (the mute profile overrides the band);
//! 5. the adaptive threshold and debounce counter decide on silence;
//! 6. a voiced candidate goes through the outlier filter, octave guard and
//!    attack stabilizer, then gets its confidence refined and smoothed;
//! 7. the note locker decides what is emitted, and the display hysteresis
//!    names the note.
//!
//! All rolling state lives in one owned value that [PitchTracker::reset]
//! returns to its initial contents without reallocating.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;

use crate::analysis::amplitude::AmplitudeTracker;
use crate::analysis::harmonic::harmonic_score;
use crate::analysis::mute::MuteDetector;
use crate::config::TrackerConfig;
use crate::detector::arbitration::arbitrate;
use crate::detector::mcleod::McLeodDetector;
use crate::detector::yin::YINDetector;
use crate::detector::{Detection, PitchDetector};
use crate::diagnostics::FrameDiagnostics;
use crate::error::TrackerResult;
use crate::estimate::PitchEstimate;
use crate::float::{to_f64, Float};
use crate::locker::{DisplayHysteresis, LockAction, NoteLocker};
use crate::profile::ProfileId;
use crate::stabilizer::attack::AttackStabilizer;
use crate::stabilizer::confidence::refine_confidence;
use crate::stabilizer::octave::OctaveGuard;
use crate::stabilizer::outlier::FrequencyFilter;
use crate::stabilizer::smoothing::Smoother;
use crate::utils::buffer::rms;
use crate::utils::stats::{clamp_unit, mean, variance};

/// Aggregate counters for display and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackerStats {
    pub voiced_frames: u64,
    pub silent_frames: u64,
    /// Mean of the recently emitted frequencies.
    pub frequency_mean: Option<f64>,
    pub frequency_variance: Option<f64>,
}

/// Everything that changes from frame to frame.
#[derive(Debug, Clone)]
struct TrackerState {
    frames_seen: u64,
    amplitude: AmplitudeTracker,
    mute: MuteDetector,
    filter: FrequencyFilter,
    attack: AttackStabilizer,
    smoother: Smoother,
    locker: NoteLocker,
    display: DisplayHysteresis,
    active_profile: ProfileId,
    below_threshold: u32,
    silent: bool,
    last_valid: Option<f64>,
    voiced_frames: u64,
    silent_frames: u64,
    recent_frequencies: VecDeque<f64>,
}

impl TrackerState {
    fn new(config: &TrackerConfig) -> Self {
        TrackerState {
            frames_seen: 0,
            amplitude: AmplitudeTracker::new(config.amplitude_history),
            mute: MuteDetector::new(config.mute.clone()),
            filter: FrequencyFilter::new(config.filter.clone()),
            attack: AttackStabilizer::new(config.attack.clone()),
            smoother: Smoother::new(config.smoothing.clone()),
            locker: NoteLocker::new(config.lock.clone()),
            display: DisplayHysteresis::new(config.lock.display_marginal_cents),
            active_profile: ProfileId::Band(0),
            below_threshold: 0,
            silent: true,
            last_valid: None,
            voiced_frames: 0,
            silent_frames: 0,
            recent_frequencies: VecDeque::with_capacity(config.stats_window),
        }
    }

    /// Back to the freshly constructed state, keeping every allocation.
    fn reset(&mut self) {
        self.frames_seen = 0;
        self.amplitude.reset();
        self.mute.reset();
        self.clear_run();
        self.locker.reset();
        self.display.reset();
        self.active_profile = ProfileId::Band(0);
        self.below_threshold = 0;
        self.silent = true;
        self.voiced_frames = 0;
        self.silent_frames = 0;
        self.recent_frequencies.clear();
    }

    /// Forget the current run of notes. Amplitude history and the lock survive.
    fn clear_run(&mut self) {
        self.filter.reset();
        self.attack.reset();
        self.smoother.reset();
        self.last_valid = None;
    }

    fn record(&mut self, estimate: &PitchEstimate, capacity: usize) {
        match estimate.frequency {
            Some(frequency) => {
                self.voiced_frames += 1;
                if self.recent_frequencies.len() >= capacity {
                    self.recent_frequencies.pop_front();
                }
                self.recent_frequencies.push_back(frequency);
            }
            None => self.silent_frames += 1,
        }
    }
}

fn discard(_: &FrameDiagnostics<'_>) {}

/// Frame-by-frame pitch tracker with stabilization and note locking.
///
/// One instance owns all of its state and must be driven from one thread at a
/// time. Every frame of the configured length yields exactly one
/// [PitchEstimate]; a frame that cannot be analysed yields silence.
pub struct PitchTracker<T>
where
    T: Float,
{
    config: TrackerConfig,
    yin: YINDetector<T>,
    mcleod: McLeodDetector<T>,
    octave: OctaveGuard,
    state: TrackerState,
}

impl<T> PitchTracker<T>
where
    T: Float,
{
    /// Validate `config` and allocate the detectors. This is the only
    /// fallible operation of the tracker.
    pub fn new(config: TrackerConfig) -> TrackerResult<Self> {
        config.validate()?;
        let bounds = config.bounds();
        let yin = YINDetector::new(config.frame_size, bounds, &config.detector)?;
        let mcleod = McLeodDetector::new(config.frame_size, bounds, &config.detector)?;
        log::debug!(
            "pitch tracker: {} Hz, frame {}, hop {}, {}-{} Hz, transform {}",
            config.sample_rate,
            config.frame_size,
            config.hop_size,
            config.min_frequency,
            config.max_frequency,
            mcleod.transform_size()
        );

        Ok(PitchTracker {
            octave: OctaveGuard::new(config.octave.clone()),
            state: TrackerState::new(&config),
            yin,
            mcleod,
            config,
        })
    }

    /// Estimate the pitch of the next frame, stamped with the tracker's own
    /// clock (`frames × hop_size / sample_rate`).
    pub fn estimate(&mut self, signal: &[T]) -> PitchEstimate {
        let now = self.clock();
        self.process(signal, now, &mut discard)
    }

    /// Estimate the pitch of a frame captured at `timestamp`. Timestamps must
    /// not go backwards.
    pub fn estimate_at(&mut self, signal: &[T], timestamp: Duration) -> PitchEstimate {
        self.process(signal, timestamp, &mut discard)
    }

    /// Like [estimate](Self::estimate), handing a snapshot of the frame's
    /// analysis to `sink` before returning.
    pub fn estimate_with_diagnostics<F>(&mut self, signal: &[T], sink: &mut F) -> PitchEstimate
    where
        F: FnMut(&FrameDiagnostics<'_>),
    {
        let now = self.clock();
        self.process(signal, now, sink)
    }

    pub fn estimate_at_with_diagnostics<F>(
        &mut self,
        signal: &[T],
        timestamp: Duration,
        sink: &mut F,
    ) -> PitchEstimate
    where
        F: FnMut(&FrameDiagnostics<'_>),
    {
        self.process(signal, timestamp, sink)
    }

    /// Clear all rolling state. A reset tracker behaves exactly like a new one.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    pub fn stats(&self) -> TrackerStats {
        let recent = &self.state.recent_frequencies;
        TrackerStats {
            voiced_frames: self.state.voiced_frames,
            silent_frames: self.state.silent_frames,
            frequency_mean: mean(recent),
            frequency_variance: variance(recent),
        }
    }

    /// Name of the profile used for the latest frame.
    pub fn active_profile(&self) -> &str {
        &self.config.profiles.get(self.state.active_profile).name
    }

    pub fn is_locked(&self) -> bool {
        self.state.locker.is_locked()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Number of frames processed since construction or the last reset.
    pub fn frames_processed(&self) -> u64 {
        self.state.frames_seen
    }

    fn clock(&self) -> Duration {
        let samples = self.state.frames_seen as u128 * self.config.hop_size as u128;
        let nanos = samples * 1_000_000_000 / self.config.sample_rate as u128;
        Duration::from_nanos(nanos as u64)
    }

    fn select_profile(&self, candidate: Option<&Detection>, mute_transition: bool) -> ProfileId {
        if mute_transition {
            return ProfileId::Mute;
        }
        candidate
            .map(|c| c.frequency)
            .or(self.state.last_valid)
            .or_else(|| self.state.locker.locked().map(|l| l.frequency))
            .map_or(ProfileId::Band(0), |f| self.config.profiles.band_for(f))
    }

    fn process<F>(&mut self, signal: &[T], now: Duration, sink: &mut F) -> PitchEstimate
    where
        F: FnMut(&FrameDiagnostics<'_>),
    {
        self.state.frames_seen += 1;

        if signal.len() != self.config.frame_size
            || !signal.iter().all(|&s| to_f64(s).is_finite())
        {
            log::warn!(
                "rejected frame of {} samples (expected {} finite samples)",
                signal.len(),
                self.config.frame_size
            );
            let estimate = PitchEstimate::silence(now);
            self.state.record(&estimate, self.config.stats_window);
            let profile = self.config.profiles.get(self.state.active_profile);
            let mut diagnostics = FrameDiagnostics::new(now, &profile.name);
            diagnostics.rejected = true;
            diagnostics.locked = self.state.locker.is_locked();
            sink(&diagnostics);
            return estimate;
        }

        // Level
        let level = rms(signal);
        self.state.amplitude.push(level);
        let recent_max = self.state.amplitude.recent_max();

        // Candidates
        let time_domain = self.yin.get_pitch(signal);
        let frequency_domain = self.mcleod.get_pitch(signal);
        let candidate = arbitrate(time_domain, frequency_domain, &self.config.arbitration);

        let verdict = self.state.mute.inspect(level, candidate.as_ref());
        if verdict.transition {
            log::debug!(
                "mute transition: rms {:.4} (previous {:?}), candidate {:?}",
                level,
                verdict.previous_rms,
                candidate.map(|c| c.frequency)
            );
        }

        let profile_id = self.select_profile(candidate.as_ref(), verdict.transition);
        let profile = self.config.profiles.get(profile_id);
        if profile_id != self.state.active_profile {
            log::debug!("profile -> {}", profile.name);
            self.state.active_profile = profile_id;
        }

        // Silence
        let threshold = self.state.amplitude.silence_threshold(profile);
        let declared = if !(level >= profile.silence_floor) {
            self.state.below_threshold = self.state.below_threshold.saturating_add(1);
            true
        } else if level < threshold {
            self.state.below_threshold = self.state.below_threshold.saturating_add(1);
            self.state.below_threshold >= profile.debounce_frames
        } else {
            self.state.below_threshold = 0;
            false
        };
        let silent = declared || verdict.force_silence;
        if silent {
            if !self.state.silent {
                log::debug!(
                    "silence declared (rms {:.4}, threshold {:.4}, profile {})",
                    level,
                    threshold,
                    profile.name
                );
            }
            self.state.clear_run();
        }
        self.state.silent = silent;

        let mut diagnostics = FrameDiagnostics::new(now, &profile.name);
        diagnostics.rms = level;
        diagnostics.recent_max = recent_max;
        diagnostics.threshold = threshold;
        diagnostics.debounce_count = self.state.below_threshold;
        diagnostics.silent = silent;
        diagnostics.time_domain = time_domain;
        diagnostics.frequency_domain = frequency_domain;
        diagnostics.candidate = candidate;
        diagnostics.mute_transition = verdict.transition;
        diagnostics.mute_signals = verdict.signals;
        diagnostics.forced_silence = verdict.force_silence;
        diagnostics.previous_rms = verdict.previous_rms;
        diagnostics.previous_frequency = verdict.previous_frequency;

        // Stabilization
        let stabilized = match candidate {
            Some(candidate) if !silent => {
                let filtered = self
                    .state
                    .filter
                    .process(candidate.frequency, self.state.last_valid);
                let declining = self
                    .state
                    .amplitude
                    .is_declining(level, self.config.octave.declining_ratio);
                let (guarded, action) = self
                    .octave
                    .protect(filtered.value, self.state.last_valid, declining);
                let settled = self.state.attack.process(guarded, now);
                self.state.last_valid = Some(settled);

                let harmonic = harmonic_score(signal, self.config.sample_rate, settled);
                let amplitude = self.state.amplitude.amplitude_factor(level);
                let refined = refine_confidence(candidate.confidence, harmonic, amplitude, profile);
                let (frequency, confidence) = self.state.smoother.smooth(settled, refined);

                diagnostics.outlier = filtered.outlier;
                diagnostics.filtered_frequency = Some(filtered.value);
                diagnostics.octave_action = Some(action);
                diagnostics.stabilized_frequency = Some(settled);
                diagnostics.harmonic_score = Some(harmonic);
                diagnostics.amplitude_factor = Some(amplitude);
                diagnostics.raw_confidence = Some(candidate.confidence);
                diagnostics.refined_confidence = Some(refined);
                diagnostics.smoothed_frequency = Some(frequency);
                diagnostics.smoothed_confidence = Some(confidence);

                Some(Detection {
                    frequency,
                    confidence,
                    algorithm: candidate.algorithm,
                })
            }
            _ => None,
        };

        // Locking
        let (output, action) = if verdict.force_silence {
            self.state.locker.release();
            (None, LockAction::Released)
        } else {
            self.state.locker.update(stabilized, profile, now)
        };

        let reading = self.state.display.apply(output.map(|d| d.frequency));
        let estimate = match (output, reading) {
            (Some(detection), Some((note, cents))) => PitchEstimate::voiced(
                now,
                detection.frequency,
                note,
                cents,
                clamp_unit(detection.confidence),
                detection.algorithm,
            ),
            _ => PitchEstimate::silence(now),
        };
        self.state.record(&estimate, self.config.stats_window);

        diagnostics.lock_action = action;
        diagnostics.locked = self.state.locker.is_locked();
        log::trace!("{:?}", diagnostics);
        sink(&diagnostics);

        estimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, amplitude: f64, size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| {
                let phase = 2.0 * std::f64::consts::PI * freq * i as f64 / 44100.0;
                (amplitude * phase.sin()) as f32
            })
            .collect()
    }

    #[test]
    fn clock_advances_by_hop() {
        let mut tracker = PitchTracker::<f32>::new(TrackerConfig::default()).unwrap();
        let silence = vec![0.0f32; 2048];
        let first = tracker.estimate(&silence);
        let second = tracker.estimate(&silence);
        assert_eq!(first.timestamp, Duration::ZERO);
        assert_eq!(
            second.timestamp,
            Duration::from_nanos(2048 * 1_000_000_000 / 44100)
        );
        assert_eq!(tracker.frames_processed(), 2);
    }

    #[test]
    fn locks_onto_a_steady_tone() {
        let mut tracker = PitchTracker::<f32>::new(TrackerConfig::default()).unwrap();
        let frame = sine(440.0, 0.8, 2048);
        let estimate = tracker.estimate(&frame);
        assert!(estimate.voiced);
        assert!(tracker.is_locked());
        assert_eq!(tracker.active_profile(), "mid");
        let stats = tracker.stats();
        assert_eq!(stats.voiced_frames, 1);
        assert_eq!(stats.silent_frames, 0);
    }

    #[test]
    fn silence_clears_the_run_but_holds_the_lock() {
        let mut tracker = PitchTracker::<f32>::new(TrackerConfig::default()).unwrap();
        let frame = sine(110.0, 0.5, 2048);
        for _ in 0..4 {
            tracker.estimate(&frame);
        }
        assert!(tracker.state.last_valid.is_some());

        // Below the low band's floor: silence at once, lock held for 1.2 s
        let estimate = tracker.estimate(&vec![0.0; 2048]);
        assert!(tracker.state.last_valid.is_none());
        assert!(estimate.voiced);
        assert_eq!(estimate.note.map(|n| n.to_string()), Some("A2".to_string()));

        for _ in 0..30 {
            tracker.estimate(&vec![0.0; 2048]);
        }
        assert!(!tracker.is_locked());
        assert!(!tracker.estimate(&vec![0.0; 2048]).voiced);
    }

    #[test]
    fn stats_window_is_its_own_setting() {
        let config = TrackerConfig {
            stats_window: 3,
            ..TrackerConfig::default()
        };
        let mut tracker = PitchTracker::<f32>::new(config).unwrap();
        let frame = sine(440.0, 0.8, 2048);
        for _ in 0..10 {
            tracker.estimate(&frame);
        }
        assert_eq!(tracker.state.recent_frequencies.len(), 3);
        assert_eq!(tracker.state.amplitude.len(), 10);
        assert_eq!(tracker.stats().voiced_frames, 10);
    }

    #[test]
    fn reset_restores_a_fresh_state() {
        let mut tracker = PitchTracker::<f32>::new(TrackerConfig::default()).unwrap();
        tracker.estimate(&sine(330.0, 0.5, 2048));
        tracker.reset();
        assert!(!tracker.is_locked());
        assert_eq!(tracker.frames_processed(), 0);
        assert_eq!(tracker.stats().voiced_frames, 0);
        assert_eq!(tracker.active_profile(), "low");
    }
}
