// Order statistics over latency samples
//
// Percentiles use the nearest-rank definition: sort ascending and take the
// element at 1-based rank ceil(p/100 * n). No interpolation, so every
// reported percentile is a latency that was actually observed.

/// Nearest-rank percentile; `None` for an empty series
///
/// # Example
/// ```
/// use perfkpi::aggregate::statistics::percentile;
///
/// let samples = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
/// assert_eq!(percentile(&samples, 90.0), Some(9.0));
/// assert_eq!(percentile(&samples, 50.0), Some(5.0));
/// ```
pub fn percentile(series: &[f64], p: f64) -> Option<f64> {
    if series.is_empty() {
        return None;
    }
    let sorted = sorted(series);
    let n = sorted.len();
    // p * n first keeps exact products such as 90 * 10 free of rounding
    let rank = ((p * n as f64) / 100.0).ceil() as usize;
    let rank = rank.clamp(1, n);
    Some(sorted[rank - 1])
}

/// Median; even lengths average the two middle elements
pub fn median(series: &[f64]) -> Option<f64> {
    if series.is_empty() {
        return None;
    }
    let sorted = sorted(series);
    let n = sorted.len();
    if n % 2 == 0 {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    } else {
        Some(sorted[n / 2])
    }
}

/// Most frequent value; ties go to the value seen first in series order
pub fn mode(series: &[f64]) -> Option<f64> {
    let mut best: Option<(f64, usize)> = None;
    for (i, &value) in series.iter().enumerate() {
        // Only count a value at its first occurrence
        if series[..i].contains(&value) {
            continue;
        }
        let count = series[i..].iter().filter(|&&v| v == value).count();
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

/// Arithmetic mean rounded to three decimals
pub fn mean3(series: &[f64]) -> Option<f64> {
    if series.is_empty() {
        return None;
    }
    let sum: f64 = series.iter().sum();
    Some(crate::device::round3(sum / series.len() as f64))
}

fn sorted(series: &[f64]) -> Vec<f64> {
    let mut sorted = series.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}
