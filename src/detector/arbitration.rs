//! Reconciling the time-domain and frequency-domain candidates of one frame.

use crate::config::ArbitrationConfig;
use crate::detector::Detection;

/// Pick one candidate out of the two detectors' results.
///
/// When the detectors agree (within `agreement_tolerance`) the more confident
/// one wins, ties and low notes favouring the time-domain result. When they
/// disagree the time-domain confidence gets a bonus before comparing.
pub fn arbitrate(
    time_domain: Option<Detection>,
    frequency_domain: Option<Detection>,
    config: &ArbitrationConfig,
) -> Option<Detection> {
    let (td, fd) = match (time_domain, frequency_domain) {
        (None, None) => return None,
        (Some(td), None) => return Some(td),
        (None, Some(fd)) => return Some(fd),
        (Some(td), Some(fd)) => (td, fd),
    };

    let reference = td.frequency.max(fd.frequency);
    let agree = (td.frequency - fd.frequency).abs() / reference <= config.agreement_tolerance;

    let prefer_time_domain = if agree {
        if td.frequency < config.low_frequency_ceiling {
            td.confidence >= config.low_frequency_preference * fd.confidence
        } else {
            td.confidence >= fd.confidence
        }
    } else {
        td.confidence * config.time_domain_bonus >= fd.confidence
    };

    Some(if prefer_time_domain { td } else { fd })
}
