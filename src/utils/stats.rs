//! Small order statistics used by the stabilization stages.

/// Median of `values`, reordering them in place.
///
/// For even lengths this is the lower of the two middle values, so the result
/// is always one of the inputs.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mid = (values.len() - 1) / 2;
    let (_, center, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    Some(*center)
}

pub fn mean<'a, I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Population variance.
pub fn variance<'a, I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a f64>,
    I::IntoIter: Clone,
{
    let values = values.into_iter();
    let m = mean(values.clone())?;
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| {
        (sum + (v - m) * (v - m), count + 1)
    });
    Some(sum / count as f64)
}

pub fn std_dev<'a, I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a f64>,
    I::IntoIter: Clone,
{
    variance(values).map(f64::sqrt)
}

/// Clamp into `[0, 1]`, mapping `NaN` to zero.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// True when `ratio` is within `tolerance` (relative) of `target`.
pub fn near_ratio(ratio: f64, target: f64, tolerance: f64) -> bool {
    (ratio / target - 1.0).abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_odd_lengths() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn even_median_is_one_of_the_values() {
        // Never the 330 Hz half-way point between two played notes
        assert_eq!(median(&mut [440.0, 220.0]), Some(220.0));
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.0));
    }

    #[test]
    fn spread() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&v), Some(5.0));
        assert_eq!(variance(&v), Some(4.0));
        assert_eq!(std_dev(&v), Some(2.0));
    }

    #[test]
    fn unit_clamp() {
        assert_eq!(clamp_unit(1.7), 1.0);
        assert_eq!(clamp_unit(-0.2), 0.0);
        assert_eq!(clamp_unit(f64::NAN), 0.0);
    }

    #[test]
    fn ratio_tolerance_is_relative() {
        assert!(near_ratio(2.05, 2.0, 0.03));
        assert!(!near_ratio(2.1, 2.0, 0.03));
        assert!(near_ratio(0.49, 0.5, 0.03));
    }
}
