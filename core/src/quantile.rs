//! Exact quantiles over an in-memory column.
//!
//! Linear interpolation between closest ranks: for `n` sorted values the
//! quantile `q` sits at rank `h = (n - 1) * q`, interpolated between
//! `sorted[floor(h)]` and `sorted[ceil(h)]`.

use crate::error::{RfmError, RfmResult};

/// Copy a column, reject NaN/inf, and sort ascending.
pub fn sorted_finite(values: &[f64], column: &str) -> RfmResult<Vec<f64>> {
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(RfmError::NonFiniteValue {
            column: column.to_string(),
            index,
        });
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(sorted)
}

/// Quantile `q` of an ascending slice. Empty input -> NaN.
pub fn quantile_linear(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() || q.is_nan() {
        return f64::NAN;
    }
    let q = q.clamp(0.0, 1.0);
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let w = h - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * w
}

pub fn quantiles(sorted: &[f64], fractions: &[f64]) -> Vec<f64> {
    fractions.iter().map(|&q| quantile_linear(sorted, q)).collect()
}

/// Interior cut fractions `1/k, 2/k, ..., (k-1)/k` for `k` scores.
pub fn score_fractions(max_score: u32) -> Vec<f64> {
    let step = 1.0 / max_score as f64;
    (1..max_score).map(|i| step * i as f64).collect()
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: u32) -> f64 {
    let scale = 10f64.powi(places as i32);
    (value * scale).round() / scale
}
