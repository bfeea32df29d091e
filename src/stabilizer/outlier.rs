use std::collections::VecDeque;

use crate::config::FilterConfig;
use crate::utils::stats::{mean, median, std_dev};

/// Result of filtering one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterOutcome {
    pub value: f64,
    /// The candidate was replaced by the last valid frequency.
    pub outlier: bool,
}

/// Bounded history of recent candidates feeding a z-score test and a median.
#[derive(Debug, Clone)]
pub struct FrequencyFilter {
    config: FilterConfig,
    history: VecDeque<f64>,
    window: Vec<f64>,
}

impl FrequencyFilter {
    pub fn new(config: FilterConfig) -> Self {
        FrequencyFilter {
            history: VecDeque::with_capacity(config.history_size),
            window: Vec::with_capacity(config.median_window),
            config,
        }
    }

    /// Filter `candidate`, substituting `last_valid` for statistical outliers.
    ///
    /// The raw candidate always enters the history, so a genuine change of
    /// note is accepted once it persists.
    pub fn process(&mut self, candidate: f64, last_valid: Option<f64>) -> FilterOutcome {
        let outlier = self.is_outlier(candidate);
        let current = match (outlier, last_valid) {
            (true, Some(last)) => last,
            _ => candidate,
        };

        if self.history.len() == self.config.history_size {
            self.history.pop_front();
        }
        self.history.push_back(candidate);

        let window = self.config.median_window;
        let value = if window > 1 && self.history.len() >= window {
            self.window.clear();
            self.window
                .extend(self.history.iter().rev().skip(1).take(window - 1));
            self.window.push(current);
            median(&mut self.window).unwrap_or(current)
        } else {
            current
        };

        FilterOutcome {
            value,
            outlier: outlier && last_valid.is_some(),
        }
    }

    fn is_outlier(&self, candidate: f64) -> bool {
        if self.history.len() < 3 {
            return false;
        }
        let (mean, std) = match (mean(&self.history), std_dev(&self.history)) {
            (Some(mean), Some(std)) => (mean, std),
            _ => return false,
        };
        if std < self.config.min_relative_spread * mean || std <= 0.0 {
            return false;
        }
        ((candidate - mean) / std).abs() > self.config.outlier_z
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> FrequencyFilter {
        FrequencyFilter::new(FilterConfig::default())
    }

    #[test]
    fn passes_values_through_until_the_median_fills() {
        let mut f = filter();
        assert_eq!(f.process(220.0, None).value, 220.0);
        assert_eq!(f.process(221.0, Some(220.0)).value, 221.0);
        // Median of 220, 221, 219
        assert_eq!(f.process(219.0, Some(221.0)).value, 220.0);
    }

    #[test]
    fn single_octave_spike_is_removed_by_the_median() {
        let mut f = filter();
        for _ in 0..3 {
            f.process(220.0, Some(220.0));
        }
        let spike = f.process(440.0, Some(220.0));
        assert_eq!(spike.value, 220.0);
        assert!(!spike.outlier);
        assert_eq!(f.process(220.0, Some(220.0)).value, 220.0);
    }

    #[test]
    fn z_score_outlier_uses_last_valid() {
        let mut f = filter();
        for v in [200.0, 210.0, 190.0, 205.0] {
            f.process(v, Some(v));
        }
        // mean 201.25, std about 7.4
        let outcome = f.process(300.0, Some(205.0));
        assert!(outcome.outlier);
        assert_eq!(outcome.value, 205.0);
        // The raw value still enters the history
        assert_eq!(f.len(), 5);
    }

    #[test]
    fn history_is_bounded_and_resettable() {
        let mut f = filter();
        for i in 0..20 {
            f.process(100.0 + i as f64 * 0.01, None);
        }
        assert_eq!(f.len(), 5);
        f.reset();
        assert!(f.is_empty());
    }
}
