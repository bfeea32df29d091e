//! # Frequency profiles
//!
//! Low notes have weak, slowly decaying amplitude and sparse harmonics; high
//! notes decay fast and must give up their lock quickly. Each band of the
//! detected frequency therefore gets its own bundle of silence, confidence and
//! lock parameters. A separate mute-transition profile overrides the band for a
//! single frame whenever a string-damping transient is detected.

use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};

/// Parameter bundle governing silence sensitivity, confidence weighting and
/// lock behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyProfile {
    pub name: String,
    /// Fraction of the recent maximum RMS below which a frame counts as quiet.
    pub silence_ratio: f64,
    /// Consecutive quiet frames before silence is declared.
    pub debounce_frames: u32,
    /// Absolute RMS floor; anything below is silence without debounce.
    pub silence_floor: f64,
    pub harmonic_base: f64,
    pub harmonic_weight: f64,
    pub amplitude_base: f64,
    pub amplitude_weight: f64,
    /// Minimum refined confidence needed to acquire or replace a lock.
    pub lock_threshold: f64,
    /// How long a lock is re-emitted after the input goes silent.
    pub hold_ms: u64,
}

impl FrequencyProfile {
    fn validate(&self) -> TrackerResult<()> {
        let unit = [
            ("silence_ratio", self.silence_ratio),
            ("harmonic_base", self.harmonic_base),
            ("harmonic_weight", self.harmonic_weight),
            ("amplitude_base", self.amplitude_base),
            ("amplitude_weight", self.amplitude_weight),
            ("lock_threshold", self.lock_threshold),
        ];
        for (field, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(TrackerError::InvalidParameter(format!(
                    "profile '{}': {} must be in [0, 1], got {}",
                    self.name, field, value
                )));
            }
        }
        if !(self.silence_floor >= 0.0 && self.silence_floor.is_finite()) {
            return Err(TrackerError::InvalidParameter(format!(
                "profile '{}': silence_floor must be non-negative",
                self.name
            )));
        }
        Ok(())
    }
}

/// A profile applied to frequencies in `[low, high)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub low: f64,
    pub high: f64,
    pub profile: FrequencyProfile,
}

/// Identifies an entry of a [ProfileTable].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfileId {
    Band(usize),
    Mute,
}

/// Ordered, non-overlapping bands plus the reserved mute-transition profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileTable {
    pub bands: Vec<FrequencyBand>,
    pub mute: FrequencyProfile,
}

impl ProfileTable {
    pub fn validate(&self) -> TrackerResult<()> {
        if self.bands.is_empty() {
            return Err(TrackerError::EmptyProfileTable);
        }
        let mut previous_high = f64::NEG_INFINITY;
        for band in &self.bands {
            if !(band.low < band.high) || band.low < previous_high {
                return Err(TrackerError::OverlappingProfiles(band.profile.name.clone()));
            }
            band.profile.validate()?;
            previous_high = band.high;
        }
        self.mute.validate()
    }

    /// Band containing `frequency`; frequencies outside every band (and
    /// `NaN`) map to the nearest boundary band.
    pub fn band_for(&self, frequency: f64) -> ProfileId {
        let last = self.bands.len().saturating_sub(1);
        if frequency.is_nan() {
            return ProfileId::Band(0);
        }
        let index = self
            .bands
            .iter()
            .position(|band| frequency < band.high)
            .unwrap_or(last);
        ProfileId::Band(index)
    }

    /// Profile of the band containing `frequency`.
    pub fn for_frequency(&self, frequency: f64) -> &FrequencyProfile {
        self.get(self.band_for(frequency))
    }

    /// Look up a profile. Band indices past the end resolve to the last band.
    pub fn get(&self, id: ProfileId) -> &FrequencyProfile {
        match id {
            ProfileId::Mute => &self.mute,
            ProfileId::Band(index) => self
                .bands
                .get(index)
                .or_else(|| self.bands.last())
                .map_or(&self.mute, |band| &band.profile),
        }
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        ProfileTable {
            bands: vec![
                FrequencyBand {
                    low: 80.0,
                    high: 250.0,
                    profile: FrequencyProfile {
                        name: "low".into(),
                        silence_ratio: 0.03,
                        debounce_frames: 12,
                        silence_floor: 0.002,
                        harmonic_base: 0.6,
                        harmonic_weight: 0.4,
                        amplitude_base: 0.7,
                        amplitude_weight: 0.3,
                        lock_threshold: 0.5,
                        hold_ms: 1200,
                    },
                },
                FrequencyBand {
                    low: 250.0,
                    high: 400.0,
                    profile: FrequencyProfile {
                        name: "low-mid".into(),
                        silence_ratio: 0.05,
                        debounce_frames: 8,
                        silence_floor: 0.003,
                        harmonic_base: 0.5,
                        harmonic_weight: 0.5,
                        amplitude_base: 0.6,
                        amplitude_weight: 0.4,
                        lock_threshold: 0.6,
                        hold_ms: 900,
                    },
                },
                FrequencyBand {
                    low: 400.0,
                    high: 650.0,
                    profile: FrequencyProfile {
                        name: "mid".into(),
                        silence_ratio: 0.08,
                        debounce_frames: 5,
                        silence_floor: 0.004,
                        harmonic_base: 0.45,
                        harmonic_weight: 0.55,
                        amplitude_base: 0.5,
                        amplitude_weight: 0.5,
                        lock_threshold: 0.7,
                        hold_ms: 600,
                    },
                },
                FrequencyBand {
                    low: 650.0,
                    high: 1200.0,
                    profile: FrequencyProfile {
                        name: "high".into(),
                        silence_ratio: 0.12,
                        debounce_frames: 3,
                        silence_floor: 0.005,
                        harmonic_base: 0.4,
                        harmonic_weight: 0.6,
                        amplitude_base: 0.4,
                        amplitude_weight: 0.6,
                        lock_threshold: 0.75,
                        hold_ms: 300,
                    },
                },
            ],
            mute: FrequencyProfile {
                name: "mute-transition".into(),
                silence_ratio: 0.25,
                debounce_frames: 1,
                silence_floor: 0.01,
                harmonic_base: 0.3,
                harmonic_weight: 0.7,
                amplitude_base: 0.2,
                amplitude_weight: 0.8,
                lock_threshold: 0.9,
                hold_ms: 0,
            },
        }
    }
}
