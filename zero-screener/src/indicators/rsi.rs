//! RSI over a simple rolling mean of gains and losses.

pub const WINDOW: usize = 6;

/// RSI series aligned with the input.
///
/// Point `t` averages the `window` differences ending at `t`, so the first
/// defined index is `window`. A window with no losses reads 100.
pub fn rsi(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if window == 0 || closes.len() <= window {
        return out;
    }

    let gains: Vec<f64> = closes.windows(2).map(|w| (w[1] - w[0]).max(0.0)).collect();
    let losses: Vec<f64> = closes.windows(2).map(|w| (w[0] - w[1]).max(0.0)).collect();

    for t in window..closes.len() {
        // diffs[t-1] is close[t] - close[t-1]
        let range = t - window..t;
        let avg_gain = gains[range.clone()].iter().sum::<f64>() / window as f64;
        let avg_loss = losses[range].iter().sum::<f64>() / window as f64;

        out[t] = Some(if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        });
    }

    out
}
