struct Point {
    x: f64,
    y: f64,
}

/// Strict local maxima of `arr` with a positive value, restricted to indices
/// in `lo..=hi`. Each index needs a neighbour on both sides, so the range is
/// clipped to `1..arr.len() - 1`.
pub fn detect_peaks(arr: &[f64], lo: usize, hi: usize) -> Vec<(usize, f64)> {
    if arr.len() < 3 {
        return Vec::new();
    }
    let lo = lo.max(1);
    let hi = hi.min(arr.len() - 2);
    (lo..=hi)
        .filter(|&i| arr[i] > 0.0 && arr[i] > arr[i - 1] && arr[i] >= arr[i + 1])
        .map(|i| (i, arr[i]))
        .collect()
}

/// Index of the smallest value of `arr` in `lo..=hi`.
pub fn global_minimum(arr: &[f64], lo: usize, hi: usize) -> Option<usize> {
    let hi = hi.min(arr.len().checked_sub(1)?);
    (lo..=hi).min_by(|&a, &b| {
        arr[a]
            .partial_cmp(&arr[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

/// Sub-sample position of the extremum around `idx`, fitting a parabola through
/// `data[idx - 1]`, `data[idx]` and `data[idx + 1]`. The shift is clamped to one
/// sample either way; a degenerate fit leaves `idx` unchanged.
pub fn refine_peak(data: &[f64], idx: usize) -> f64 {
    if idx == 0 || idx + 1 >= data.len() {
        return idx as f64;
    }
    let point = quadratic_interpolation(
        Point {
            x: (idx - 1) as f64,
            y: data[idx - 1],
        },
        Point {
            x: idx as f64,
            y: data[idx],
        },
        Point {
            x: (idx + 1) as f64,
            y: data[idx + 1],
        },
    );
    let shift = point.x - idx as f64;
    if shift.is_finite() {
        idx as f64 + shift.clamp(-1.0, 1.0)
    } else {
        idx as f64
    }
}

fn quadratic_interpolation(left: Point, center: Point, right: Point) -> Point {
    let denominator = 2.0 * center.y - left.y - right.y;
    if denominator.abs() < f64::EPSILON {
        return center;
    }
    let shift = 0.5 * (right.y - left.y) / denominator;
    let x = center.x + shift;
    let y = center.y + 0.25 * (right.y - left.y) * shift;
    Point { x, y }
}
