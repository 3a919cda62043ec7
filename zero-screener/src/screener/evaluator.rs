//! Candidate evaluation.
//!
//! Decides whether one pooled row passes the enabled deep checks. Daily
//! history is fetched lazily, at most once per evaluation, and shared by
//! every check that needs it.
//!
//! Check order:
//! 1. MA alignment (history; fetch failure discards the candidate)
//! 2. Volume escalation (history; fetch failure or short history skips)
//! 3. Strong trend (snapshot only)
//! 4. New-high pullback (snapshot only)

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::config::{ScreenerConfig, ScreeningCriteria};
use crate::data::{AdjustMode, HistoryProvider, MarketSnapshotRow, PriceBar, ProviderError};
use crate::indicators::trailing_mean;

/// Bars needed for MA20 plus one.
pub const MA_ALIGNMENT_MIN_BARS: usize = 21;

/// Recent-vs-prior volume split.
const VOLUME_RECENT: usize = 3;
const VOLUME_PRIOR: usize = 2;
const VOLUME_ESCALATION_RATIO: f64 = 1.1;

/// Price must be within 2% of the day high.
const NEW_HIGH_TOLERANCE: f64 = 0.98;

pub const REASON_MA_ALIGNMENT: &str = "bullish MA alignment";
pub const REASON_VOLUME_UP: &str = "mild volume escalation";
pub const REASON_STRONG_TREND: &str = "holding above intraday average";
pub const REASON_NEW_HIGH_PULLBACK: &str = "near intraday high with support";

// ============================================================================
// Candidate Result
// ============================================================================

/// A stock that passed every enabled check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change_percent: f64,
    /// 0 when the feed did not report it
    pub volume_ratio: f64,
    /// 0 when the feed did not report it
    pub turnover_rate: f64,
    /// Why the stock passed, baseline reasons first
    pub hit_reasons: Vec<String>,
}

impl CandidateResult {
    fn from_row(row: &MarketSnapshotRow) -> Self {
        let change_percent = row.change_percent.unwrap_or(0.0);
        let volume_ratio = row.volume_ratio.unwrap_or(0.0);
        let turnover_rate = row.turnover_rate.unwrap_or(0.0);

        Self {
            symbol: row.symbol.clone(),
            name: row.name.clone(),
            price: row.price,
            change_percent,
            volume_ratio,
            turnover_rate,
            hit_reasons: vec![
                format!("change {:.2}%", change_percent),
                format!("volume ratio {:.2}", volume_ratio),
                format!("turnover {:.2}%", turnover_rate),
            ],
        }
    }
}

// ============================================================================
// Checks
// ============================================================================

/// `price > MA5 > MA10 > MA20`. Fewer than 21 bars fails.
pub fn ma_aligned(price: f64, bars: &[PriceBar]) -> bool {
    if bars.len() < MA_ALIGNMENT_MIN_BARS {
        return false;
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    match (
        trailing_mean(&closes, 5),
        trailing_mean(&closes, 10),
        trailing_mean(&closes, 20),
    ) {
        (Some(ma5), Some(ma10), Some(ma20)) => price > ma5 && ma5 > ma10 && ma10 > ma20,
        _ => false,
    }
}

/// Mean of the last 3 volumes against the mean of the 2 before them.
///
/// `None` with fewer than 5 bars.
pub fn volume_escalating(bars: &[PriceBar]) -> Option<bool> {
    let window = VOLUME_RECENT + VOLUME_PRIOR;
    if bars.len() < window {
        return None;
    }

    let volumes: Vec<f64> = bars[bars.len() - window..].iter().map(|b| b.volume).collect();
    let prior = trailing_mean(&volumes[..VOLUME_PRIOR], VOLUME_PRIOR)?;
    let recent = trailing_mean(&volumes[VOLUME_PRIOR..], VOLUME_RECENT)?;

    Some(recent >= VOLUME_ESCALATION_RATIO * prior)
}

/// Price at or above the intraday average. `None` without volume data.
pub fn strong_trend(row: &MarketSnapshotRow) -> Option<bool> {
    let avg = row.average_price()?;
    Some(row.price >= avg)
}

/// Within 2% of the day high and above the intraday average.
pub fn new_high_pullback(row: &MarketSnapshotRow) -> Option<bool> {
    let high = row.high?;
    let avg = row.average_price()?;
    Some(row.price >= NEW_HIGH_TOLERANCE * high && row.price >= avg)
}

// ============================================================================
// History Context
// ============================================================================

/// History for one evaluation, fetched on first use.
struct HistoryContext<'a> {
    evaluator: &'a CandidateEvaluator,
    symbol: &'a str,
    loaded: Option<Result<Vec<PriceBar>, ProviderError>>,
}

impl<'a> HistoryContext<'a> {
    fn new(evaluator: &'a CandidateEvaluator, symbol: &'a str) -> Self {
        Self {
            evaluator,
            symbol,
            loaded: None,
        }
    }

    async fn bars(&mut self) -> Result<&[PriceBar], ProviderError> {
        if self.loaded.is_none() {
            self.loaded = Some(self.evaluator.fetch_history(self.symbol).await);
        }

        match &self.loaded {
            Some(Ok(bars)) => Ok(bars.as_slice()),
            Some(Err(e)) => Err(e.clone()),
            None => Err(ProviderError::DataNotAvailable(self.symbol.to_string())),
        }
    }
}

// ============================================================================
// Candidate Evaluator
// ============================================================================

/// Applies the deep checks to one candidate at a time.
pub struct CandidateEvaluator {
    history: Arc<dyn HistoryProvider>,
    fetch_timeout: Duration,
    lookback_days: u32,
    adjust: AdjustMode,
}

impl CandidateEvaluator {
    pub fn new(history: Arc<dyn HistoryProvider>, config: &ScreenerConfig) -> Self {
        Self {
            history,
            fetch_timeout: config.fetch_timeout,
            lookback_days: config.history_lookback_days,
            adjust: config.adjust,
        }
    }

    async fn fetch_history(&self, symbol: &str) -> Result<Vec<PriceBar>, ProviderError> {
        let fetch = self
            .history
            .fetch_history(symbol, self.adjust, self.lookback_days);

        match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "history for {} exceeded {:?}",
                symbol, self.fetch_timeout
            ))),
        }
    }

    /// Evaluate one row. `None` means the candidate is discarded.
    pub async fn evaluate(
        &self,
        row: &MarketSnapshotRow,
        criteria: &ScreeningCriteria,
    ) -> Option<CandidateResult> {
        let mut result = CandidateResult::from_row(row);
        let mut history = HistoryContext::new(self, &row.symbol);

        if criteria.check_ma_alignment {
            match history.bars().await {
                Ok(bars) if ma_aligned(row.price, bars) => {
                    result.hit_reasons.push(REASON_MA_ALIGNMENT.to_string());
                }
                Ok(bars) => {
                    debug!(symbol = %row.symbol, bars = bars.len(), "MA alignment failed");
                    return None;
                }
                Err(e) => {
                    debug!(symbol = %row.symbol, error = %e, "History unavailable, discarding candidate");
                    return None;
                }
            }
        }

        if criteria.check_volume_up {
            match history.bars().await {
                Ok(bars) => match volume_escalating(bars) {
                    Some(true) => result.hit_reasons.push(REASON_VOLUME_UP.to_string()),
                    Some(false) => {
                        debug!(symbol = %row.symbol, "Volume escalation failed");
                        return None;
                    }
                    None => debug!(symbol = %row.symbol, "Too few bars for volume check, skipping"),
                },
                Err(e) => {
                    debug!(symbol = %row.symbol, error = %e, "History unavailable, skipping volume check");
                }
            }
        }

        if criteria.check_strong_trend {
            match strong_trend(row) {
                Some(true) => result.hit_reasons.push(REASON_STRONG_TREND.to_string()),
                Some(false) => return None,
                None => debug!(symbol = %row.symbol, "No intraday volume, skipping trend check"),
            }
        }

        if criteria.check_new_high_pullback {
            match new_high_pullback(row) {
                Some(true) => result.hit_reasons.push(REASON_NEW_HIGH_PULLBACK.to_string()),
                Some(false) => return None,
                None => debug!(symbol = %row.symbol, "No intraday high, skipping pullback check"),
            }
        }

        Some(result)
    }
}

// ============================================================================
// Tests
// ============================================================================
