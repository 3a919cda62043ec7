//! Technical indicator library.
//!
//! Pure functions from an ordered price series to derived series of the same
//! length. Warm-up points are `None` (or absent, for KDJ) rather than padded.
//!
//! `IndicatorSnapshot` reads the final value of each series. Any indicator
//! without enough history reports zeros instead of failing, so newly listed
//! stocks still get a complete snapshot.

pub mod bollinger;
pub mod kdj;
pub mod macd;
pub mod moving_average;
pub mod rsi;

pub use bollinger::{bollinger, BollingerSeries};
pub use kdj::{kdj, KdjSeries};
pub use macd::{macd, MacdSeries};
pub use moving_average::{ema, sma, trailing_mean};
pub use rsi::rsi;

use serde::{Deserialize, Serialize};

use crate::data::{round_to, PriceBar};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacdValue {
    pub dif: f64,
    pub dea: f64,
    pub hist: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KdjValue {
    pub k: f64,
    pub d: f64,
    pub j: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BollingerValue {
    pub upper: f64,
    pub mid: f64,
    pub lower: f64,
}

/// Final-bar indicator values for one instrument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub ma5: f64,
    pub ma20: f64,
    pub macd: MacdValue,
    pub kdj: KdjValue,
    pub rsi: f64,
    pub boll: BollingerValue,
}

fn last_defined(series: &[Option<f64>]) -> f64 {
    series.last().copied().flatten().unwrap_or(0.0)
}

impl IndicatorSnapshot {
    /// Compute from ascending bars.
    pub fn from_bars(bars: &[PriceBar]) -> Self {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

        let macd = if closes.len() >= macd::SLOW_SPAN {
            let series = macd::macd(&closes);
            MacdValue {
                dif: series.dif.last().copied().unwrap_or_default(),
                dea: series.dea.last().copied().unwrap_or_default(),
                hist: series.hist.last().copied().unwrap_or_default(),
            }
        } else {
            MacdValue::default()
        };

        let kdj_series = kdj::kdj(&highs, &lows, &closes);
        let kdj = KdjValue {
            k: kdj_series.k.last().copied().unwrap_or_default(),
            d: kdj_series.d.last().copied().unwrap_or_default(),
            j: kdj_series.j.last().copied().unwrap_or_default(),
        };

        let bands = bollinger::bollinger(&closes);
        let boll = BollingerValue {
            upper: last_defined(&bands.upper),
            mid: last_defined(&bands.mid),
            lower: last_defined(&bands.lower),
        };

        Self {
            ma5: last_defined(&sma(&closes, 5)),
            ma20: last_defined(&sma(&closes, 20)),
            macd,
            kdj,
            rsi: last_defined(&rsi::rsi(&closes, rsi::WINDOW)),
            boll,
        }
    }

    /// Display rounding: 3 decimals for MACD, 2 for everything else.
    pub fn rounded(&self) -> Self {
        Self {
            ma5: round_to(self.ma5, 2),
            ma20: round_to(self.ma20, 2),
            macd: MacdValue {
                dif: round_to(self.macd.dif, 3),
                dea: round_to(self.macd.dea, 3),
                hist: round_to(self.macd.hist, 3),
            },
            kdj: KdjValue {
                k: round_to(self.kdj.k, 2),
                d: round_to(self.kdj.d, 2),
                j: round_to(self.kdj.j, 2),
            },
            rsi: round_to(self.rsi, 2),
            boll: BollingerValue {
                upper: round_to(self.boll.upper, 2),
                mid: round_to(self.boll.mid, 2),
                lower: round_to(self.boll.lower, 2),
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    /// Ascending daily bars with the given closes.
    pub(crate) fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar {
                date: start + Duration::days(i as i64),
                open: c,
                high: c + 0.5,
                low: c - 0.5,
                close: c,
                volume: 1_000.0,
            })
            .collect()
    }

    #[test]
    fn test_snapshot_empty_history_is_zero() {
        assert_eq!(IndicatorSnapshot::from_bars(&[]), IndicatorSnapshot::default());
    }

    #[test]
    fn test_snapshot_short_history_zero_fills() {
        let bars = bars_from_closes(&[10.0, 10.5, 11.0, 11.5, 12.0, 12.5]);
        let snap = IndicatorSnapshot::from_bars(&bars);

        assert!((snap.ma5 - 11.5).abs() < 1e-12);
        assert_eq!(snap.ma20, 0.0);
        assert_eq!(snap.macd, MacdValue::default());
        assert_eq!(snap.boll, BollingerValue::default());
        assert_eq!(snap.rsi, 0.0);
        assert_eq!(snap.kdj, KdjValue::default());
    }

    #[test]
    fn test_snapshot_full_history() {
        let closes: Vec<f64> = (0..60).map(|i| 10.0 + i as f64 * 0.1).collect();
        let snap = IndicatorSnapshot::from_bars(&bars_from_closes(&closes));

        assert!(snap.ma5 > snap.ma20);
        assert!(snap.macd.dif > 0.0);
        assert_eq!(snap.rsi, 100.0);
        assert!(snap.boll.upper > snap.boll.mid && snap.boll.mid > snap.boll.lower);
        assert_eq!(snap.kdj.j, 3.0 * snap.kdj.k - 2.0 * snap.kdj.d);
    }

    #[test]
    fn test_rounded() {
        let snap = IndicatorSnapshot {
            ma5: 10.12345,
            macd: MacdValue {
                dif: 0.123456,
                dea: -0.0456,
                hist: 0.33333,
            },
            rsi: 66.666,
            ..Default::default()
        };

        let rounded = snap.rounded();
        assert_eq!(rounded.ma5, 10.12);
        assert_eq!(rounded.macd.dif, 0.123);
        assert_eq!(rounded.macd.dea, -0.046);
        assert_eq!(rounded.macd.hist, 0.333);
        assert_eq!(rounded.rsi, 66.67);
    }
}
