//! Simple and exponential moving averages.

use statrs::statistics::Statistics;

/// Simple moving average over a trailing window.
///
/// The first `window - 1` points are `None`.
pub fn sma(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                None
            } else {
                Some(values[i + 1 - window..=i].iter().mean())
            }
        })
        .collect()
}

/// Exponential moving average with `alpha = 2 / (span + 1)`.
///
/// Seeded with the first value, so every point is defined:
/// `EMA[0] = x[0]`, `EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1]`.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    smooth(values, alpha)
}

/// Exponential recurrence with an explicit smoothing factor.
pub(crate) fn smooth(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;

    for &x in values {
        let next = match prev {
            None => x,
            Some(p) => alpha * x + (1.0 - alpha) * p,
        };
        out.push(next);
        prev = Some(next);
    }

    out
}

/// Mean of the trailing `window` values, if there are enough.
pub fn trailing_mean(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    Some(values[values.len() - window..].iter().mean())
}
