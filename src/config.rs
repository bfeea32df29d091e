//! Configuration parameters for pitch tracking.
//!
//! Every empirically tuned constant of the pipeline lives here as a named
//! field so that callers can recalibrate without touching the algorithms.

use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};
use crate::profile::ProfileTable;

/// Sample-rate and frequency-range description shared by both detectors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorBounds {
    pub sample_rate: usize,
    pub min_frequency: f64,
    pub max_frequency: f64,
}

impl DetectorBounds {
    /// Shortest lag searched, `floor(sample_rate / max_frequency)`, never below 2.
    pub fn min_period(&self) -> usize {
        ((self.sample_rate as f64 / self.max_frequency).floor() as usize).max(2)
    }

    /// Longest lag searched, `ceil(sample_rate / min_frequency)`.
    pub fn max_period(&self) -> usize {
        (self.sample_rate as f64 / self.min_frequency).ceil() as usize
    }

    /// Smallest frame able to hold the longest period and a comparison
    /// window at least as long.
    pub fn min_frame_size(&self) -> usize {
        2 * self.max_period() + 2
    }

    pub fn contains(&self, frequency: f64) -> bool {
        frequency >= self.min_frequency && frequency <= self.max_frequency
    }

    pub fn validate(&self, frame_size: usize) -> TrackerResult<()> {
        if self.sample_rate == 0 {
            return Err(TrackerError::InvalidSampleRate(self.sample_rate));
        }
        let (min, max) = (self.min_frequency, self.max_frequency);
        if !(min.is_finite() && max.is_finite() && min > 0.0 && min < max) {
            return Err(TrackerError::InvalidFrequencyBounds { min, max });
        }
        let nyquist = self.sample_rate as f64 / 2.0;
        if max >= nyquist {
            return Err(TrackerError::FrequencyAboveNyquist { max, nyquist });
        }
        if frame_size == 0 {
            return Err(TrackerError::InvalidFrameSize(frame_size));
        }
        if frame_size < self.min_frame_size() {
            return Err(TrackerError::FrameTooShort {
                frame_size,
                required: self.min_frame_size(),
            });
        }
        Ok(())
    }
}

/// Thresholds of the time-domain (YIN) and frequency-domain (McLeod) detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Trough threshold on the cumulative-mean-normalised difference.
    pub yin_threshold: f64,
    /// Minimum `1 - d'(tau)` for a time-domain result to be accepted.
    pub yin_min_confidence: f64,
    /// NSDF peak value needed for a frequency-domain result.
    pub clarity_threshold: f64,
    /// Explicit transform length for the frequency-domain detector. `None`
    /// picks the next power of two large enough for a linear autocorrelation.
    pub transform_size: Option<usize>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            yin_threshold: 0.15,
            yin_min_confidence: 0.75,
            clarity_threshold: 0.75,
            transform_size: None,
        }
    }
}

/// How the two detector results are reconciled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrationConfig {
    /// Relative frequency difference under which both detectors agree.
    pub agreement_tolerance: f64,
    /// Below this frequency the time-domain result is preferred.
    pub low_frequency_ceiling: f64,
    /// Fraction of the other confidence the time-domain result needs to be
    /// preferred below the ceiling.
    pub low_frequency_preference: f64,
    /// Multiplier on the time-domain confidence when the detectors disagree.
    pub time_domain_bonus: f64,
}

impl Default for ArbitrationConfig {
    fn default() -> Self {
        ArbitrationConfig {
            agreement_tolerance: 0.05,
            low_frequency_ceiling: 250.0,
            low_frequency_preference: 0.9,
            time_domain_bonus: 1.1,
        }
    }
}

/// Outlier and median filtering over recent candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub history_size: usize,
    pub median_window: usize,
    /// Z-score above which a candidate is an outlier.
    pub outlier_z: f64,
    /// The z-score test is skipped while the spread of the history is below
    /// this fraction of its mean.
    pub min_relative_spread: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            history_size: 5,
            median_window: 3,
            outlier_z: 2.0,
            min_relative_spread: 0.01,
        }
    }
}

/// Inclusive ratio window `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioWindow {
    pub low: f64,
    pub high: f64,
}

impl RatioWindow {
    pub const fn new(low: f64, high: f64) -> Self {
        RatioWindow { low, high }
    }

    pub fn contains(&self, ratio: f64) -> bool {
        ratio >= self.low && ratio <= self.high
    }
}

/// Ratio windows that look like consonant intervals (roughly a minor/major
/// third and a fifth) rather than octave errors.
pub const CONSONANT_WINDOWS: [RatioWindow; 2] =
    [RatioWindow::new(1.15, 1.35), RatioWindow::new(1.45, 1.55)];

/// Octave and sub-harmonic protection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OctaveConfig {
    /// Relative tolerance around ratios 2 and 1/2 that triggers a snap.
    pub octave_tolerance: f64,
    /// Amplitude counts as declining below this fraction of the recent max.
    pub declining_ratio: f64,
    /// Sub-harmonic ratios held while the amplitude declines.
    pub declining_subharmonic: RatioWindow,
    /// Always-on relative tolerance around 1/3.
    pub third_tolerance: f64,
    /// Always-on relative tolerance around 1/4.
    pub quarter_tolerance: f64,
    /// Candidates below this frequency get the upward-jump guard.
    pub low_band_ceiling: f64,
    pub suspicious_upward: Vec<RatioWindow>,
}

impl Default for OctaveConfig {
    fn default() -> Self {
        OctaveConfig {
            octave_tolerance: 0.03,
            declining_ratio: 0.7,
            declining_subharmonic: RatioWindow::new(0.18, 0.38),
            third_tolerance: 0.08,
            quarter_tolerance: 0.03,
            low_band_ceiling: 250.0,
            suspicious_upward: CONSONANT_WINDOWS.to_vec(),
        }
    }
}

/// Onset jitter suppression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
    pub stabilization_frames: usize,
    /// Relative deviation from the attack median that triggers substitution.
    pub max_deviation: f64,
}

impl Default for AttackConfig {
    fn default() -> Self {
        AttackConfig {
            enabled: true,
            timeout_ms: 200,
            stabilization_frames: 4,
            max_deviation: 0.12,
        }
    }
}

/// Dual-rate exponential smoothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothingConfig {
    pub enabled: bool,
    /// Smoothing factor used when the refined confidence is high.
    pub fast_alpha: f64,
    pub slow_alpha: f64,
    pub confidence_threshold: f64,
    /// A jump larger than this restarts the averages instead of gliding.
    pub restart_cents: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        SmoothingConfig {
            enabled: true,
            fast_alpha: 0.6,
            slow_alpha: 0.25,
            confidence_threshold: 0.8,
            restart_cents: 100.0,
        }
    }
}

/// Note locker and display hysteresis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockConfig {
    pub hysteresis_cents: f64,
    /// Relative tolerance around ratios 2 and 1/2.
    pub octave_tolerance: f64,
    /// Confidence multiple an octave jump needs to override the lock.
    pub octave_override: f64,
    /// Candidates below this fraction of the locked frequency need better
    /// confidence to replace it.
    pub drop_ratio: f64,
    /// Small deltas are adopted at this fraction of the locked confidence.
    pub adopt_confidence_ratio: f64,
    /// Small deltas at least this fraction of the hysteresis are adopted.
    pub drift_fraction: f64,
    /// A label change this close to the half-way point is suppressed.
    pub display_marginal_cents: f64,
}

impl Default for LockConfig {
    fn default() -> Self {
        LockConfig {
            hysteresis_cents: 4.0,
            octave_tolerance: 0.05,
            octave_override: 1.2,
            drop_ratio: 0.7,
            adopt_confidence_ratio: 0.95,
            drift_fraction: 0.75,
            display_marginal_cents: 5.0,
        }
    }
}

/// String-damping transient classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuteConfig {
    pub enabled: bool,
    /// Scales both drop thresholds.
    pub sensitivity: f64,
    pub drop_threshold: f64,
    pub severe_drop_ratio: f64,
    /// `max(r, 1/r)` above which a frequency change is a jump.
    pub jump_ratio: f64,
    /// Ratios near 2 and 1/2 within this tolerance are not jumps.
    pub harmonic_tolerance: f64,
    pub consonant_windows: Vec<RatioWindow>,
    pub off_pitch_cents: f64,
    pub very_quiet_rms: f64,
    /// RMS ratio counted as a drop when the note label changes.
    pub label_change_drop: f64,
    /// Relative change from the previous frequency that forces silence.
    pub force_silence_change: f64,
    /// Candidate confidence below which a flagged frame is forced silent.
    pub force_silence_confidence: f64,
}

impl Default for MuteConfig {
    fn default() -> Self {
        MuteConfig {
            enabled: true,
            sensitivity: 1.0,
            drop_threshold: 0.5,
            severe_drop_ratio: 0.25,
            jump_ratio: 1.12,
            harmonic_tolerance: 0.03,
            consonant_windows: CONSONANT_WINDOWS.to_vec(),
            off_pitch_cents: 35.0,
            very_quiet_rms: 0.01,
            label_change_drop: 0.85,
            force_silence_change: 0.3,
            force_silence_confidence: 0.8,
        }
    }
}

/// Complete tracker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub sample_rate: usize,
    pub frame_size: usize,
    /// Samples between the starts of consecutive frames; drives the internal clock.
    pub hop_size: usize,
    pub min_frequency: f64,
    pub max_frequency: f64,
    /// Frames of RMS history used for the recent maximum.
    pub amplitude_history: usize,
    /// Emitted frequencies kept for [TrackerStats](crate::TrackerStats).
    pub stats_window: usize,
    pub detector: DetectorConfig,
    pub arbitration: ArbitrationConfig,
    pub filter: FilterConfig,
    pub octave: OctaveConfig,
    pub attack: AttackConfig,
    pub smoothing: SmoothingConfig,
    pub lock: LockConfig,
    pub mute: MuteConfig,
    pub profiles: ProfileTable,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            sample_rate: 44100,
            frame_size: 2048,
            hop_size: 2048,
            min_frequency: 60.0,
            max_frequency: 1200.0,
            amplitude_history: 43,
            stats_window: 64,
            detector: DetectorConfig::default(),
            arbitration: ArbitrationConfig::default(),
            filter: FilterConfig::default(),
            octave: OctaveConfig::default(),
            attack: AttackConfig::default(),
            smoothing: SmoothingConfig::default(),
            lock: LockConfig::default(),
            mute: MuteConfig::default(),
            profiles: ProfileTable::default(),
        }
    }
}

impl TrackerConfig {
    /// Default configuration for the given sample rate and frame size.
    pub fn new(sample_rate: usize, frame_size: usize) -> Self {
        TrackerConfig {
            sample_rate,
            frame_size,
            hop_size: frame_size,
            ..TrackerConfig::default()
        }
    }

    pub fn with_frequency_range(mut self, min_frequency: f64, max_frequency: f64) -> Self {
        self.min_frequency = min_frequency;
        self.max_frequency = max_frequency;
        self
    }

    pub fn bounds(&self) -> DetectorBounds {
        DetectorBounds {
            sample_rate: self.sample_rate,
            min_frequency: self.min_frequency,
            max_frequency: self.max_frequency,
        }
    }

    /// Transform length used by the frequency-domain detector.
    pub fn transform_size(&self) -> usize {
        self.detector
            .transform_size
            .unwrap_or_else(|| default_transform_size(self.frame_size, &self.bounds()))
    }

    /// Check every parameter. This is the only place the tracker can fail.
    pub fn validate(&self) -> TrackerResult<()> {
        let bounds = self.bounds();
        bounds.validate(self.frame_size)?;
        if self.hop_size == 0 {
            return Err(TrackerError::InvalidFrameSize(self.hop_size));
        }
        if let Some(size) = self.detector.transform_size {
            validate_transform_size(size, self.frame_size, &bounds)?;
        }

        unit("detector.yin_threshold", self.detector.yin_threshold)?;
        unit(
            "detector.yin_min_confidence",
            self.detector.yin_min_confidence,
        )?;
        unit(
            "detector.clarity_threshold",
            self.detector.clarity_threshold,
        )?;
        unit(
            "arbitration.agreement_tolerance",
            self.arbitration.agreement_tolerance,
        )?;
        positive(
            "arbitration.time_domain_bonus",
            self.arbitration.time_domain_bonus,
        )?;

        at_least_one("amplitude_history", self.amplitude_history)?;
        at_least_one("stats_window", self.stats_window)?;
        at_least_one("filter.history_size", self.filter.history_size)?;
        at_least_one("filter.median_window", self.filter.median_window)?;
        if self.filter.median_window > self.filter.history_size {
            return Err(TrackerError::InvalidParameter(
                "filter.median_window cannot exceed filter.history_size".into(),
            ));
        }
        positive("filter.outlier_z", self.filter.outlier_z)?;

        unit("octave.octave_tolerance", self.octave.octave_tolerance)?;
        unit("octave.declining_ratio", self.octave.declining_ratio)?;
        at_least_one(
            "attack.stabilization_frames",
            self.attack.stabilization_frames,
        )?;
        positive("attack.max_deviation", self.attack.max_deviation)?;

        unit("smoothing.fast_alpha", self.smoothing.fast_alpha)?;
        unit("smoothing.slow_alpha", self.smoothing.slow_alpha)?;
        positive("lock.hysteresis_cents", self.lock.hysteresis_cents)?;
        unit(
            "lock.adopt_confidence_ratio",
            self.lock.adopt_confidence_ratio,
        )?;
        unit("lock.drift_fraction", self.lock.drift_fraction)?;
        positive("mute.sensitivity", self.mute.sensitivity)?;

        self.profiles.validate()
    }
}

/// `max(4 * maxPeriod, frame + maxPeriod + 2)` rounded up to a power of two.
pub fn default_transform_size(frame_size: usize, bounds: &DetectorBounds) -> usize {
    let max_period = bounds.max_period();
    (4 * max_period)
        .max(min_transform_size(frame_size, bounds))
        .next_power_of_two()
}

fn min_transform_size(frame_size: usize, bounds: &DetectorBounds) -> usize {
    frame_size + bounds.max_period() + 2
}

pub fn validate_transform_size(
    size: usize,
    frame_size: usize,
    bounds: &DetectorBounds,
) -> TrackerResult<()> {
    if !size.is_power_of_two() {
        return Err(TrackerError::TransformSizeNotPowerOfTwo(size));
    }
    let required = min_transform_size(frame_size, bounds);
    if size < required {
        return Err(TrackerError::TransformTooSmall { size, required });
    }
    Ok(())
}

fn unit(field: &str, value: f64) -> TrackerResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(TrackerError::InvalidParameter(format!(
            "{} must be in [0, 1], got {}",
            field, value
        )))
    }
}

fn positive(field: &str, value: f64) -> TrackerResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(TrackerError::InvalidParameter(format!(
            "{} must be positive, got {}",
            field, value
        )))
    }
}

fn at_least_one(field: &str, value: usize) -> TrackerResult<()> {
    if value >= 1 {
        Ok(())
    } else {
        Err(TrackerError::InvalidParameter(format!(
            "{} must be at least 1",
            field
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = TrackerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.bounds().max_period(), 735);
        assert_eq!(config.bounds().min_period(), 36);
        assert_eq!(config.transform_size(), 4096);
    }

    #[test]
    fn rejects_bad_rates_and_bounds() {
        let config = TrackerConfig::new(0, 2048);
        assert_eq!(config.validate(), Err(TrackerError::InvalidSampleRate(0)));

        let config = TrackerConfig::default().with_frequency_range(500.0, 100.0);
        assert!(matches!(
            config.validate(),
            Err(TrackerError::InvalidFrequencyBounds { .. })
        ));

        let config = TrackerConfig::default().with_frequency_range(-5.0, 100.0);
        assert!(matches!(
            config.validate(),
            Err(TrackerError::InvalidFrequencyBounds { .. })
        ));

        let config = TrackerConfig::default().with_frequency_range(60.0, 30000.0);
        assert!(matches!(
            config.validate(),
            Err(TrackerError::FrequencyAboveNyquist { .. })
        ));
    }

    #[test]
    fn rejects_short_frames() {
        let config = TrackerConfig::new(44100, 1024);
        assert_eq!(
            config.validate(),
            Err(TrackerError::FrameTooShort {
                frame_size: 1024,
                required: 1472
            })
        );
        // Raising the lowest frequency makes the same frame usable.
        let config = TrackerConfig::new(44100, 1024).with_frequency_range(100.0, 1200.0);
        config.validate().unwrap();
    }

    #[test]
    fn rejects_bad_transform_sizes() {
        let mut config = TrackerConfig::default();
        config.detector.transform_size = Some(3000);
        assert_eq!(
            config.validate(),
            Err(TrackerError::TransformSizeNotPowerOfTwo(3000))
        );
        config.detector.transform_size = Some(2048);
        assert_eq!(
            config.validate(),
            Err(TrackerError::TransformTooSmall {
                size: 2048,
                required: 2785
            })
        );
        config.detector.transform_size = Some(8192);
        config.validate().unwrap();
        assert_eq!(config.transform_size(), 8192);
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        let mut config = TrackerConfig::default();
        config.filter.median_window = 7;
        assert!(matches!(
            config.validate(),
            Err(TrackerError::InvalidParameter(_))
        ));

        let mut config = TrackerConfig::default();
        config.detector.clarity_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = TrackerConfig::default();
        config.stats_window = 0;
        assert!(matches!(
            config.validate(),
            Err(TrackerError::InvalidParameter(_))
        ));
    }

    #[test]
    fn ratio_window_is_inclusive() {
        let w = RatioWindow::new(1.15, 1.35);
        assert!(w.contains(1.15) && w.contains(1.35));
        assert!(!w.contains(1.4));
    }
}
