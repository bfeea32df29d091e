use std::time::Duration;

use crate::config::AttackConfig;
use crate::utils::stats::median;

/// Suppresses the pitch jitter of the first frames after a note starts.
///
/// Frames are collected from the onset of a run. While no more than
/// `stabilization_frames` have been collected, a candidate further than
/// `max_deviation` from the collected median is replaced by that median. The
/// median of an even count is the lower middle value, so the substitute is
/// always a frequency that was actually detected. A run older than
/// `timeout_ms` starts a fresh window.
#[derive(Debug, Clone)]
pub struct AttackStabilizer {
    config: AttackConfig,
    buffer: Vec<f64>,
    scratch: Vec<f64>,
    onset: Option<Duration>,
}

impl AttackStabilizer {
    pub fn new(config: AttackConfig) -> Self {
        AttackStabilizer {
            buffer: Vec::with_capacity(config.stabilization_frames),
            scratch: Vec::with_capacity(config.stabilization_frames),
            config,
            onset: None,
        }
    }

    pub fn process(&mut self, candidate: f64, now: Duration) -> f64 {
        if !self.config.enabled {
            return candidate;
        }

        let timeout = Duration::from_millis(self.config.timeout_ms);
        match self.onset {
            Some(onset) if now.saturating_sub(onset) <= timeout => {}
            _ => {
                self.buffer.clear();
                self.onset = Some(now);
            }
        }

        if self.buffer.len() >= self.config.stabilization_frames {
            return candidate;
        }
        self.buffer.push(candidate);

        self.scratch.clear();
        self.scratch.extend_from_slice(&self.buffer);
        match median(&mut self.scratch) {
            Some(center) if (candidate - center).abs() > self.config.max_deviation * center => {
                center
            }
            _ => candidate,
        }
    }

    /// True while the current run is still inside its stabilization window.
    pub fn is_settling(&self) -> bool {
        self.config.enabled && self.buffer.len() < self.config.stabilization_frames
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.scratch.clear();
        self.onset = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn early_jitter_is_replaced_by_the_median() {
        let mut attack = AttackStabilizer::new(AttackConfig::default());
        assert_eq!(attack.process(220.0, at(0)), 220.0);
        assert_eq!(attack.process(221.0, at(46)), 221.0);
        // Median of 220, 221, 300 is 221; 300 is 36% away
        assert_eq!(attack.process(300.0, at(92)), 221.0);
        assert!(attack.is_settling());
        assert_eq!(attack.process(222.0, at(139)), 222.0);
        assert!(!attack.is_settling());
        // Past the window, candidates pass untouched
        assert_eq!(attack.process(300.0, at(185)), 300.0);
    }

    #[test]
    fn legato_change_never_yields_an_unplayed_frequency() {
        let mut attack = AttackStabilizer::new(AttackConfig::default());
        assert_eq!(attack.process(220.0, at(0)), 220.0);
        // Two values: the substitute is the lower one, not 330 Hz
        assert_eq!(attack.process(440.0, at(46)), 220.0);
        assert_eq!(attack.process(440.0, at(92)), 440.0);

        let mut attack = AttackStabilizer::new(AttackConfig::default());
        attack.process(440.0, at(0));
        assert_eq!(attack.process(293.66, at(46)), 293.66);
    }

    #[test]
    fn timeout_restarts_the_window() {
        let mut attack = AttackStabilizer::new(AttackConfig::default());
        for (i, v) in [220.0, 220.0, 220.0, 220.0].iter().enumerate() {
            attack.process(*v, at(i as u64 * 10));
        }
        assert!(!attack.is_settling());
        attack.process(330.0, at(500));
        assert!(attack.is_settling());
    }

    #[test]
    fn disabled_and_reset() {
        let config = AttackConfig {
            enabled: false,
            ..AttackConfig::default()
        };
        let mut attack = AttackStabilizer::new(config);
        attack.process(220.0, at(0));
        assert_eq!(attack.process(500.0, at(10)), 500.0);

        let mut attack = AttackStabilizer::new(AttackConfig::default());
        attack.process(220.0, at(0));
        attack.reset();
        assert_eq!(attack.process(500.0, at(10)), 500.0);
    }
}
