//! The McLeod pitch method, the frequency-domain half of the tracker.
//!
//! The raw autocorrelation is obtained from the squared-magnitude spectrum of the
//! zero-padded frame (Wiener–Khinchin) and normalised into the NSDF. Positive
//! local maxima within the allowed period range are ranked by height; the best one
//! wins if it clears the clarity threshold, otherwise a slightly weaker peak close
//! to the best one's lag may stand in, which keeps clear octave and sub-harmonic
//! peaks out.

use crate::config::{
    default_transform_size, validate_transform_size, DetectorBounds, DetectorConfig,
};
use crate::detector::internals::{normalized_square_difference, DetectorInternals};
use crate::detector::{Algorithm, Detection, PitchDetector};
use crate::error::TrackerResult;
use crate::float::Float;
use crate::utils::peak::{detect_peaks, refine_peak};
use crate::utils::stats::clamp_unit;

/// Fraction of the clarity threshold a fallback peak must reach.
const FALLBACK_CLARITY: f64 = 0.8;
/// Lag window, relative to the best peak, in which a fallback peak may lie.
const FALLBACK_LAG_RANGE: (f64, f64) = (0.8, 1.25);

pub struct McLeodDetector<T>
where
    T: Float,
{
    internals: DetectorInternals<T>,
    bounds: DetectorBounds,
    clarity_threshold: f64,
    autocorr: Vec<f64>,
    nsdf: Vec<f64>,
}

impl<T> McLeodDetector<T>
where
    T: Float,
{
    pub fn new(
        size: usize,
        bounds: DetectorBounds,
        config: &DetectorConfig,
    ) -> TrackerResult<Self> {
        bounds.validate(size)?;
        let transform_size = match config.transform_size {
            Some(transform_size) => {
                validate_transform_size(transform_size, size, &bounds)?;
                transform_size
            }
            None => default_transform_size(size, &bounds),
        };
        let lags = bounds.max_period() + 2;
        let internals = DetectorInternals::new(size, transform_size);

        Ok(McLeodDetector {
            internals,
            bounds,
            clarity_threshold: config.clarity_threshold,
            autocorr: vec![0.0; lags],
            nsdf: vec![0.0; lags],
        })
    }

    pub fn transform_size(&self) -> usize {
        self.internals.transform_size
    }

    fn choose_peak(&self, mut peaks: Vec<(usize, f64)>) -> Option<(usize, f64)> {
        peaks.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let best = *peaks.first()?;
        if best.1 > self.clarity_threshold {
            return Some(best);
        }
        let floor = FALLBACK_CLARITY * self.clarity_threshold;
        let (lo, hi) = (
            FALLBACK_LAG_RANGE.0 * best.0 as f64,
            FALLBACK_LAG_RANGE.1 * best.0 as f64,
        );
        peaks.into_iter().skip(1).find(|&(lag, value)| {
            value >= floor && (lag as f64) >= lo && (lag as f64) <= hi
        })
    }
}

impl<T> PitchDetector<T> for McLeodDetector<T>
where
    T: Float,
{
    fn get_pitch(&mut self, signal: &[T]) -> Option<Detection> {
        if signal.len() != self.internals.size {
            return None;
        }

        self.internals.autocorrelation(signal, &mut self.autocorr);
        normalized_square_difference(signal, &self.autocorr, &mut self.nsdf);

        let peaks = detect_peaks(
            &self.nsdf,
            self.bounds.min_period(),
            self.bounds.max_period(),
        );
        let (lag, clarity) = self.choose_peak(peaks)?;

        let refined = refine_peak(&self.nsdf, lag);
        if refined <= 0.0 {
            return None;
        }
        let frequency = self.bounds.sample_rate as f64 / refined;
        let confidence = clamp_unit(clarity);
        if !self.bounds.contains(frequency)
            || confidence < FALLBACK_CLARITY * self.clarity_threshold
        {
            return None;
        }

        Some(Detection {
            frequency,
            confidence,
            algorithm: Algorithm::FrequencyDomain,
        })
    }
}
