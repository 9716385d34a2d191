//! Numeric helpers shared by the column analyzer and the insight engine.
//!
//! All functions return `Option<f64>` and yield `None` when the statistic is
//! undefined for the input (empty slice, too few observations, zero
//! variance). Callers render `None` as a missing-value marker instead of
//! failing.

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (ddof = 1). `None` below two observations.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>()
        / (values.len() as f64 - 1.0);
    Some(variance.max(0.0).sqrt())
}

/// Percentile with linear interpolation over an ascending-sorted slice.
/// `q` is in `[0, 1]`; position is `q * (n - 1)`.
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        return Some(sorted[lower]);
    }
    let weight = position - lower as f64;
    Some(sorted[lower] * (1.0 - weight) + sorted[upper] * weight)
}

/// Pearson product-moment correlation. `None` when the slices differ in
/// length, hold fewer than two pairs, or either side has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }
    Some((covariance / denominator).clamp(-1.0, 1.0))
}

/// Adjusted Fisher-Pearson sample skewness, matching the pandas `skew()`
/// definition: `g1 * sqrt(n(n-1)) / (n-2)`. `None` below three observations
/// or for zero variance.
pub fn skewness(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 3 {
        return None;
    }
    let mean = mean(values)?;
    let mut m2 = 0.0;
    let mut m3 = 0.0;
    for v in values {
        let d = v - mean;
        m2 += d * d;
        m3 += d * d * d;
    }
    m2 /= n as f64;
    m3 /= n as f64;
    if m2 <= f64::EPSILON {
        return None;
    }
    let g1 = m3 / m2.powf(1.5);
    let n = n as f64;
    Some(g1 * (n * (n - 1.0)).sqrt() / (n - 2.0))
}
