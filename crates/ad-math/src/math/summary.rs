//! Empirical summaries over 1-D samples.
//!
//! Percentiles use linear interpolation between the two nearest order
//! statistics: the p-th percentile of a sorted sample `x[0..n]` sits at
//! fractional index `p/100 · (n-1)`.

/// Arithmetic mean. NaN for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Percentile of a sample, `p` in percent (`[0, 100]`).
///
/// NaN for empty input, NaN entries, or `p` outside `[0, 100]`.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile_sorted(&sorted, p)
}

/// Percentile of an already sorted sample, `p` in percent.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() || p.is_nan() || !(0.0..=100.0).contains(&p) {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let idx = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = idx - lo as f64;
    if frac == 0.0 {
        return sorted[lo];
    }
    if sorted[lo].is_nan() || sorted[hi].is_nan() {
        return f64::NAN;
    }
    (sorted[lo] + (sorted[hi] - sorted[lo]) * frac).clamp(sorted[lo], sorted[hi])
}
