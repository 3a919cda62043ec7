//! Technical analysis for a single instrument.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::data::{AdjustMode, HistoryProvider, PriceBar, ProviderError};
use crate::indicators::IndicatorSnapshot;

/// Computes the indicator snapshot for one symbol from its daily history.
///
/// Never fails: an unreachable provider, a timeout, or an empty history all
/// yield the zero-filled snapshot so display degrades instead of erroring.
pub struct TechnicalAnalyzer {
    history: Arc<dyn HistoryProvider>,
    lookback_days: u32,
    fetch_timeout: Duration,
}

impl TechnicalAnalyzer {
    pub fn new(history: Arc<dyn HistoryProvider>, lookback_days: u32, fetch_timeout: Duration) -> Self {
        Self {
            history,
            lookback_days,
            fetch_timeout,
        }
    }

    async fn fetch(&self, symbol: &str) -> Result<Vec<PriceBar>, ProviderError> {
        let fetch = self
            .history
            .fetch_history(symbol, AdjustMode::Forward, self.lookback_days);

        match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "history for {} exceeded {:?}",
                symbol, self.fetch_timeout
            ))),
        }
    }

    pub async fn compute_indicators(&self, symbol: &str) -> IndicatorSnapshot {
        match self.fetch(symbol).await {
            Ok(bars) => {
                debug!(symbol = symbol, bars = bars.len(), "Computing indicators");
                IndicatorSnapshot::from_bars(&bars)
            }
            Err(e) => {
                warn!(symbol = symbol, error = %e, "History unavailable, returning empty indicators");
                IndicatorSnapshot::default()
            }
        }
    }
}
