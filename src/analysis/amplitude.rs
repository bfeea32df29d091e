use std::collections::VecDeque;

use crate::profile::FrequencyProfile;
use crate::utils::stats::clamp_unit;

/// Rolling window of per-frame RMS values.
#[derive(Debug, Clone)]
pub struct AmplitudeTracker {
    history: VecDeque<f64>,
    capacity: usize,
}

impl AmplitudeTracker {
    pub fn new(capacity: usize) -> Self {
        AmplitudeTracker {
            history: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Record the RMS of a new frame, evicting the oldest beyond capacity.
    /// Non-finite levels are recorded as zero.
    pub fn push(&mut self, rms: f64) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(if rms.is_finite() { rms } else { 0.0 });
    }

    /// Loudest frame in the window, zero when empty.
    pub fn recent_max(&self) -> f64 {
        self.history.iter().copied().fold(0.0, f64::max)
    }

    /// `max(floor, recent_max * silence_ratio)` for the given profile.
    pub fn silence_threshold(&self, profile: &FrequencyProfile) -> f64 {
        profile
            .silence_floor
            .max(self.recent_max() * profile.silence_ratio)
    }

    /// `rms / recent_max` clamped to `[0, 1]`; zero without a usable maximum.
    pub fn amplitude_factor(&self, rms: f64) -> f64 {
        let max = self.recent_max();
        if max <= 0.0 || !max.is_finite() {
            return 0.0;
        }
        clamp_unit(rms / max)
    }

    /// True while the level sits below `ratio` of the recent maximum.
    pub fn is_declining(&self, rms: f64, ratio: f64) -> bool {
        rms < ratio * self.recent_max()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileTable;

    #[test]
    fn window_is_bounded() {
        let mut tracker = AmplitudeTracker::new(3);
        for rms in [0.5, 0.1, 0.2, 0.3] {
            tracker.push(rms);
        }
        assert_eq!(tracker.len(), 3);
        // 0.5 has been evicted
        assert_eq!(tracker.recent_max(), 0.3);
    }

    #[test]
    fn threshold_uses_floor_or_ratio() {
        let table = ProfileTable::default();
        let low = table.for_frequency(100.0);
        let mut tracker = AmplitudeTracker::new(10);
        assert_eq!(tracker.silence_threshold(low), low.silence_floor);
        tracker.push(0.5);
        assert!(
            (tracker.silence_threshold(low) - 0.5 * low.silence_ratio).abs() < 1e-12
        );
    }

    #[test]
    fn amplitude_factor_is_clamped_and_safe() {
        let mut tracker = AmplitudeTracker::new(4);
        assert_eq!(tracker.amplitude_factor(0.3), 0.0);
        tracker.push(0.4);
        assert!((tracker.amplitude_factor(0.2) - 0.5).abs() < 1e-12);
        assert_eq!(tracker.amplitude_factor(0.8), 1.0);
        tracker.push(f64::NAN);
        assert_eq!(tracker.recent_max(), 0.4);
    }

    #[test]
    fn reset_empties_the_window() {
        let mut tracker = AmplitudeTracker::new(4);
        tracker.push(0.4);
        assert!(tracker.is_declining(0.2, 0.7));
        tracker.reset();
        assert!(tracker.is_empty());
        assert_eq!(tracker.recent_max(), 0.0);
    }
}
