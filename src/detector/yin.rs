//! The YIN pitch detection algorithm is based on the algorithm from the paper
//! *[YIN, a fundamental frequency estimator for speech and music](http://recherche.ircam.fr/equipes/pcm/cheveign/ps/2002_JASA_YIN_proof.pdf)*.
//! It is the time-domain half of the tracker and the more stable of the two
//! detectors at low frequencies.
//!
//! Let $S=(s_0,s_1,\ldots,s_N)$ be a discrete signal. The *square difference function* at lag $t$
//! is defined by
//! $$ d(t) = \sum_{i=0}^{w-1} (s_i-s_{i+t})^2. $$
//! This function is close to zero when the signal "lines up" with itself, but its scale
//! depends on volume, so YIN works with the *cumulative mean normalized difference function*,
//! $$ d\'(t) = \begin{cases}1&\text{if }t=0\\\\ d(t) / \left[ \tfrac{1}{t}\sum_{i=1}^t d(i) \right] & \text{otherwise}\end{cases}. $$
//! The search walks up from the shortest allowed period to the first dip of $d\'$ below the
//! trough threshold and then down that dip to its bottom. If nothing dips below the
//! threshold, the global minimum over the search range is used instead.
//!
//! ## Implementation
//! $d(t)$ is computed from a windowed autocorrelation obtained with an
//! [FFT](https://en.wikipedia.org/wiki/Fast_Fourier_transform). The chosen lag is refined by
//! fitting a parabola through $d$ at its neighbours, and the confidence reported is $1 - d\'(t)$.

use crate::config::{DetectorBounds, DetectorConfig};
use crate::detector::internals::{
    windowed_square_error, yin_normalize_square_error, DetectorInternals,
};
use crate::detector::{Algorithm, Detection, PitchDetector};
use crate::error::TrackerResult;
use crate::float::Float;
use crate::utils::peak::{global_minimum, refine_peak};
use crate::utils::stats::clamp_unit;

pub struct YINDetector<T>
where
    T: Float,
{
    internals: DetectorInternals<T>,
    bounds: DetectorBounds,
    threshold: f64,
    min_confidence: f64,
    window_size: usize,
    autocorr: Vec<f64>,
    square_error: Vec<f64>,
    normalized: Vec<f64>,
}

impl<T> YINDetector<T>
where
    T: Float,
{
    /// Build a detector for frames of `size` samples.
    pub fn new(
        size: usize,
        bounds: DetectorBounds,
        config: &DetectorConfig,
    ) -> TrackerResult<Self> {
        bounds.validate(size)?;
        let lags = bounds.max_period() + 2;
        let window_size = size - (lags - 1);
        let internals = DetectorInternals::new(size, size.next_power_of_two());

        Ok(YINDetector {
            internals,
            bounds,
            threshold: config.yin_threshold,
            min_confidence: config.yin_min_confidence,
            window_size,
            autocorr: vec![0.0; lags],
            square_error: vec![0.0; lags],
            normalized: vec![0.0; lags],
        })
    }

    /// First lag in `lo..=hi` whose normalised difference dips below the
    /// threshold, followed down to the bottom of that dip.
    fn first_trough(&self, lo: usize, hi: usize) -> Option<usize> {
        let d = &self.normalized;
        let mut tau = (lo..=hi).find(|&t| d[t] < self.threshold)?;
        while tau < hi && d[tau + 1] < d[tau] {
            tau += 1;
        }
        Some(tau)
    }
}

/// Pitch detection based on the YIN algorithm. See <http://recherche.ircam.fr/equipes/pcm/cheveign/ps/2002_JASA_YIN_proof.pdf>
impl<T> PitchDetector<T> for YINDetector<T>
where
    T: Float,
{
    fn get_pitch(&mut self, signal: &[T]) -> Option<Detection> {
        if signal.len() != self.internals.size {
            return None;
        }

        // STEP 1: Windowed autocorrelation, then the difference function d_t.
        self.internals
            .windowed_autocorrelation(signal, self.window_size, &mut self.autocorr);
        windowed_square_error(
            signal,
            self.window_size,
            &self.autocorr,
            &mut self.square_error,
        );
        // Constant signal: every lag lines up to within rounding error.
        let noise_floor = 1e-9 * self.autocorr[0].abs();
        if self.square_error.iter().all(|&d| d <= noise_floor) {
            return None;
        }

        // STEP 2: The cumulative mean normalized difference function d_t'.
        self.normalized.copy_from_slice(&self.square_error);
        yin_normalize_square_error(&mut self.normalized);

        // STEP 3: The absolute threshold, falling back to the global minimum.
        // The last lag is kept free as the right neighbour for interpolation.
        let lo = self.bounds.min_period();
        let hi = self.bounds.max_period().min(self.normalized.len() - 2);
        let tau = self
            .first_trough(lo, hi)
            .or_else(|| global_minimum(&self.normalized, lo, hi))?;

        // STEP 4: Parabolic interpolation on the raw difference function.
        let refined = refine_peak(&self.square_error, tau);
        if refined <= 0.0 {
            return None;
        }

        let frequency = self.bounds.sample_rate as f64 / refined;
        let confidence = clamp_unit(1.0 - self.normalized[tau]);
        if !self.bounds.contains(frequency) || confidence < self.min_confidence {
            return None;
        }

        Some(Detection {
            frequency,
            confidence,
            algorithm: Algorithm::TimeDomain,
        })
    }
}
