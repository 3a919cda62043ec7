//! Bollinger Bands (20, 2) using the sample standard deviation.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

pub const WINDOW: usize = 20;
pub const WIDTH: f64 = 2.0;

/// Bands aligned with the input; `None` during warm-up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BollingerSeries {
    pub upper: Vec<Option<f64>>,
    pub mid: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

pub fn bollinger(closes: &[f64]) -> BollingerSeries {
    bollinger_with(closes, WINDOW, WIDTH)
}

/// Bands for an arbitrary window and width. Windows shorter than 2 are undefined.
pub fn bollinger_with(closes: &[f64], window: usize, width: f64) -> BollingerSeries {
    let mut out = BollingerSeries {
        upper: Vec::with_capacity(closes.len()),
        mid: Vec::with_capacity(closes.len()),
        lower: Vec::with_capacity(closes.len()),
    };

    for i in 0..closes.len() {
        if window < 2 || i + 1 < window {
            out.upper.push(None);
            out.mid.push(None);
            out.lower.push(None);
            continue;
        }

        let slice = &closes[i + 1 - window..=i];
        let mid = slice.iter().mean();
        // n - 1 denominator
        let band = width * slice.iter().std_dev();

        out.upper.push(Some(mid + band));
        out.mid.push(Some(mid));
        out.lower.push(Some(mid - band));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bollinger_ordering() {
        let closes: Vec<f64> = (0..30).map(|i| 10.0 + (i as f64 * 0.7).sin()).collect();
        let bands = bollinger(&closes);

        for i in 19..30 {
            let (u, m, l) = (bands.upper[i].unwrap(), bands.mid[i].unwrap(), bands.lower[i].unwrap());
            assert!(u >= m && m >= l);
        }
        assert!(bands.mid[18].is_none());
    }

    #[test]
    fn test_bollinger_flat_window_collapses() {
        let bands = bollinger(&[5.0; 20]);
        assert_eq!(bands.upper[19], Some(5.0));
        assert_eq!(bands.lower[19], Some(5.0));
    }

    #[test]
    fn test_bollinger_uses_sample_std() {
        // mean 2.5, sample variance 5/3
        let bands = bollinger_with(&[1.0, 2.0, 3.0, 4.0], 4, 2.0);
        let expected = 2.0 * (5.0f64 / 3.0).sqrt();
        assert!((bands.upper[3].unwrap() - 2.5 - expected).abs() < 1e-12);
    }
}
