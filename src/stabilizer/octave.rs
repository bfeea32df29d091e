use serde::Serialize;

use crate::config::OctaveConfig;
use crate::utils::stats::near_ratio;

/// What the guard did with a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OctaveAction {
    Accepted,
    /// Snapped to exactly twice the last frequency.
    SnappedUp,
    /// Snapped to exactly half the last frequency.
    SnappedDown,
    /// Rejected as a sub-harmonic or suspicious jump; the last frequency is kept.
    Held,
}

/// Octave and sub-harmonic protection relative to the last accepted frequency.
#[derive(Debug, Clone)]
pub struct OctaveGuard {
    config: OctaveConfig,
}

impl OctaveGuard {
    pub fn new(config: OctaveConfig) -> Self {
        OctaveGuard { config }
    }

    /// Decide on `candidate` given the last accepted frequency. `declining` is
    /// true while the level is well below its recent maximum, when decaying
    /// strings are prone to locking onto sub-harmonics.
    pub fn protect(
        &self,
        candidate: f64,
        last_valid: Option<f64>,
        declining: bool,
    ) -> (f64, OctaveAction) {
        let last = match last_valid {
            Some(last) if last > 0.0 => last,
            _ => return (candidate, OctaveAction::Accepted),
        };
        let config = &self.config;
        let ratio = candidate / last;

        if near_ratio(ratio, 2.0, config.octave_tolerance) {
            return (2.0 * last, OctaveAction::SnappedUp);
        }
        if near_ratio(ratio, 0.5, config.octave_tolerance) {
            return (0.5 * last, OctaveAction::SnappedDown);
        }

        let sub_harmonic = near_ratio(ratio, 1.0 / 3.0, config.third_tolerance)
            || near_ratio(ratio, 0.25, config.quarter_tolerance);
        let decaying_sub_harmonic = declining && config.declining_subharmonic.contains(ratio);
        let suspicious_low_jump = declining
            && candidate < config.low_band_ceiling
            && config.suspicious_upward.iter().any(|w| w.contains(ratio));

        if sub_harmonic || decaying_sub_harmonic || suspicious_low_jump {
            (last, OctaveAction::Held)
        } else {
            (candidate, OctaveAction::Accepted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> OctaveGuard {
        OctaveGuard::new(OctaveConfig::default())
    }

    #[test]
    fn no_reference_accepts_anything() {
        assert_eq!(
            guard().protect(123.0, None, true),
            (123.0, OctaveAction::Accepted)
        );
    }

    #[test]
    fn octaves_snap_exactly() {
        let g = guard();
        assert_eq!(
            g.protect(445.0, Some(220.0), false),
            (440.0, OctaveAction::SnappedUp)
        );
        assert_eq!(
            g.protect(109.0, Some(220.0), false),
            (110.0, OctaveAction::SnappedDown)
        );
        assert_eq!(
            g.protect(221.0, Some(220.0), false),
            (221.0, OctaveAction::Accepted)
        );
    }

    #[test]
    fn strict_sub_harmonics_are_always_held() {
        let g = guard();
        assert_eq!(g.protect(73.5, Some(220.0), false).1, OctaveAction::Held);
        assert_eq!(g.protect(55.0, Some(220.0), false).1, OctaveAction::Held);
    }

    #[test]
    fn wide_window_needs_declining_level() {
        let g = guard();
        // ratio 0.2 is outside the strict windows
        assert_eq!(
            g.protect(66.0, Some(330.0), false).1,
            OctaveAction::Accepted
        );
        assert_eq!(
            g.protect(66.0, Some(330.0), true),
            (330.0, OctaveAction::Held)
        );
    }

    #[test]
    fn low_band_upward_jump_on_decay() {
        let g = guard();
        // 1.25 x 100 Hz while the note decays
        assert_eq!(g.protect(125.0, Some(100.0), true).1, OctaveAction::Held);
        assert_eq!(
            g.protect(125.0, Some(100.0), false).1,
            OctaveAction::Accepted
        );
        // Above the low-band ceiling the same ratio is a legitimate change
        assert_eq!(
            g.protect(500.0, Some(400.0), true).1,
            OctaveAction::Accepted
        );
    }
}
