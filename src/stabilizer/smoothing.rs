use crate::config::SmoothingConfig;
use crate::note::cents_between;

/// Dual-rate exponential moving average over frequency and confidence.
///
/// Confident frames move the average quickly, doubtful ones slowly. A jump
/// larger than `restart_cents` is a new note and restarts the average.
#[derive(Debug, Clone)]
pub struct Smoother {
    config: SmoothingConfig,
    state: Option<(f64, f64)>,
}

impl Smoother {
    pub fn new(config: SmoothingConfig) -> Self {
        Smoother {
            config,
            state: None,
        }
    }

    /// Returns the smoothed `(frequency, confidence)`.
    pub fn smooth(&mut self, frequency: f64, confidence: f64) -> (f64, f64) {
        if !self.config.enabled {
            return (frequency, confidence);
        }
        let next = match self.state {
            Some((f, c)) if cents_between(frequency, f).abs() <= self.config.restart_cents => {
                let alpha = if confidence > self.config.confidence_threshold {
                    self.config.fast_alpha
                } else {
                    self.config.slow_alpha
                };
                (
                    alpha * frequency + (1.0 - alpha) * f,
                    alpha * confidence + (1.0 - alpha) * c,
                )
            }
            _ => (frequency, confidence),
        };
        self.state = Some(next);
        next
    }

    pub fn current(&self) -> Option<(f64, f64)> {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}
