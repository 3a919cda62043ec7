//! KDJ (9, 3, 3).

use serde::{Deserialize, Serialize};

use super::moving_average::smooth;

pub const WINDOW: usize = 9;

/// Smoothing factor for center-of-mass 2: `1 / (1 + 2)`.
pub const ALPHA: f64 = 1.0 / 3.0;

/// Neutral RSV when the high-low range is zero.
const NEUTRAL_RSV: f64 = 50.0;

/// K/D/J series. Index 0 corresponds to input index `WINDOW - 1`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KdjSeries {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
    pub j: Vec<f64>,
}

/// Raw stochastic value over a trailing window.
pub fn rsv(highs: &[f64], lows: &[f64], closes: &[f64], window: usize) -> Vec<f64> {
    let n = closes.len().min(highs.len()).min(lows.len());
    if window == 0 || n < window {
        return Vec::new();
    }

    (window - 1..n)
        .map(|t| {
            let range = t + 1 - window..=t;
            let low = lows[range.clone()].iter().copied().fold(f64::INFINITY, f64::min);
            let high = highs[range].iter().copied().fold(f64::NEG_INFINITY, f64::max);

            if high - low == 0.0 {
                NEUTRAL_RSV
            } else {
                (closes[t] - low) / (high - low) * 100.0
            }
        })
        .collect()
}

pub fn kdj(highs: &[f64], lows: &[f64], closes: &[f64]) -> KdjSeries {
    let rsv = rsv(highs, lows, closes, WINDOW);
    let k = smooth(&rsv, ALPHA);
    let d = smooth(&k, ALPHA);
    let j = k.iter().zip(&d).map(|(k, d)| 3.0 * k - 2.0 * d).collect();

    KdjSeries { k, d, j }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let closes: Vec<f64> = (0..n).map(|i| 10.0 + (i as f64 * 0.9).sin()).collect();
        let highs = closes.iter().map(|c| c + 0.3).collect();
        let lows = closes.iter().map(|c| c - 0.4).collect();
        (highs, lows, closes)
    }

    #[test]
    fn test_j_identity() {
        let (h, l, c) = bars(40);
        let out = kdj(&h, &l, &c);
        assert_eq!(out.k.len(), 32);

        for i in 0..out.k.len() {
            assert_eq!(out.j[i], 3.0 * out.k[i] - 2.0 * out.d[i]);
        }
    }

    #[test]
    fn test_zero_range_is_neutral() {
        let flat = vec![5.0; 9];
        let out = kdj(&flat, &flat, &flat);
        assert_eq!(out.k, vec![50.0]);
        assert_eq!(out.d, vec![50.0]);
        assert_eq!(out.j, vec![50.0]);
    }

    #[test]
    fn test_rsv_bounds() {
        let (h, l, c) = bars(30);
        for value in rsv(&h, &l, &c, WINDOW) {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_k_recurrence() {
        let highs = vec![10.0; 10];
        let lows = vec![0.0; 10];
        let mut closes = vec![5.0; 10];
        closes[9] = 8.0;

        let out = kdj(&highs, &lows, &closes);
        // rsv = [50, 80]; k1 = 80/3 + 2*50/3 = 60
        assert_eq!(out.k[0], 50.0);
        assert!((out.k[1] - 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_kdj_short_series() {
        let (h, l, c) = bars(8);
        assert_eq!(kdj(&h, &l, &c), KdjSeries::default());
    }
}
