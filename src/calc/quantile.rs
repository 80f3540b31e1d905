/// Quantile `q` of the non-NaN values using linear interpolation between closest ranks. NaN when
/// no values remain.
pub fn quantile(data: &[f64], q: f64) -> f64 {
    let mut sorted = data.iter().copied().filter(|x| !x.is_nan()).collect::<Vec<_>>();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, q)
}

/// Like [`quantile`] for already sorted data without NaN.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
