use crate::profile::FrequencyProfile;
use crate::utils::stats::clamp_unit;

/// Weight a detector's raw confidence by how harmonic and how loud the frame is.
///
/// `raw * (harmonic_base + harmonic_weight * harmonic) * (amplitude_base + amplitude_weight * amplitude)`,
/// clamped to `[0, 1]`.
pub fn refine_confidence(
    raw: f64,
    harmonic: f64,
    amplitude: f64,
    profile: &FrequencyProfile,
) -> f64 {
    let harmonic_factor = profile.harmonic_base + profile.harmonic_weight * clamp_unit(harmonic);
    let amplitude_factor =
        profile.amplitude_base + profile.amplitude_weight * clamp_unit(amplitude);
    clamp_unit(clamp_unit(raw) * harmonic_factor * amplitude_factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileTable;

    #[test]
    fn perfect_frame_keeps_its_confidence() {
        let table = ProfileTable::default();
        let profile = table.for_frequency(440.0);
        let refined = refine_confidence(0.9, 1.0, 1.0, profile);
        assert!((refined - 0.9).abs() < 1e-12);
    }

    #[test]
    fn weak_frames_are_penalised_less_in_the_low_band() {
        let table = ProfileTable::default();
        let low = refine_confidence(0.9, 0.0, 0.0, table.for_frequency(100.0));
        let high = refine_confidence(0.9, 0.0, 0.0, table.for_frequency(1000.0));
        assert!(low > high);
        // 0.9 * 0.6 * 0.7
        assert!((low - 0.378).abs() < 1e-12);
    }

    #[test]
    fn output_is_bounded() {
        let table = ProfileTable::default();
        let profile = table.for_frequency(440.0);
        assert_eq!(refine_confidence(f64::NAN, 1.0, 1.0, profile), 0.0);
        assert_eq!(refine_confidence(3.0, 5.0, 5.0, profile), 1.0);
    }
}
