//! MACD (12, 26, 9).

use serde::{Deserialize, Serialize};

use super::moving_average::ema;

pub const FAST_SPAN: usize = 12;
pub const SLOW_SPAN: usize = 26;
pub const SIGNAL_SPAN: usize = 9;

/// Full MACD series, aligned with the input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacdSeries {
    /// EMA12 - EMA26
    pub dif: Vec<f64>,
    /// EMA9 of `dif`
    pub dea: Vec<f64>,
    /// 2 * (dif - dea)
    pub hist: Vec<f64>,
}

pub fn macd(closes: &[f64]) -> MacdSeries {
    let fast = ema(closes, FAST_SPAN);
    let slow = ema(closes, SLOW_SPAN);

    let dif: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let dea = ema(&dif, SIGNAL_SPAN);
    let hist = dif.iter().zip(&dea).map(|(d, e)| 2.0 * (d - e)).collect();

    MacdSeries { dif, dea, hist }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Vec<f64> {
        // 30 closes with an up-leg, a pullback and a recovery
        vec![
            10.00, 10.12, 10.25, 10.18, 10.40, 10.55, 10.61, 10.48, 10.70, 10.92,
            11.05, 10.98, 11.20, 11.34, 11.10, 10.95, 10.80, 10.88, 11.02, 11.15,
            11.30, 11.42, 11.38, 11.55, 11.70, 11.66, 11.81, 11.95, 12.04, 12.10,
        ]
    }

    #[test]
    fn test_macd_reference_values() {
        // ewm(span, adjust=False) on the fixture, computed in exact arithmetic
        let out = macd(&fixture());

        let pinned = [
            (25, 0.324304542980, 0.283625668013, 0.081357749936),
            (29, 0.392803592896, 0.336026444589, 0.113554296614),
        ];
        for (t, dif, dea, hist) in pinned {
            assert!((out.dif[t] - dif).abs() < 1e-9, "dif t={}", t);
            assert!((out.dea[t] - dea).abs() < 1e-9, "dea t={}", t);
            assert!((out.hist[t] - hist).abs() < 1e-9, "hist t={}", t);
        }
    }

    #[test]
    fn test_macd_hist_identity() {
        let out = macd(&fixture());
        for t in 0..out.hist.len() {
            assert!((out.hist[t] - 2.0 * (out.dif[t] - out.dea[t])).abs() < 1e-12);
        }
    }

    #[test]
    fn test_macd_first_point_is_zero() {
        let out = macd(&fixture());
        assert_eq!(out.dif[0], 0.0);
        assert_eq!(out.dea[0], 0.0);
        assert_eq!(out.hist[0], 0.0);
    }

    #[test]
    fn test_macd_rising_series_positive_dif() {
        let out = macd(&fixture());
        assert!(*out.dif.last().unwrap() > 0.0);
        assert_eq!(out.dif.len(), 30);
    }

    #[test]
    fn test_macd_empty() {
        assert_eq!(macd(&[]), MacdSeries::default());
    }
}
