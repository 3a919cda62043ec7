//! Screener engine module.
//!
//! The central orchestrator for a screening run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info};
use zero_common::logging::generate_span_id;

use super::config::{ScreenerConfig, ScreeningCriteria};
use super::evaluator::{CandidateEvaluator, CandidateResult};
use super::filter::{by_change_desc, FilterResult, FilterStage, SnapshotFilter};
use crate::data::{HistoryProvider, MarketSnapshotRow, SnapshotProvider};
use crate::error::ScreenError;

// ============================================================================
// Screener Result
// ============================================================================

/// Result of a screening run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerResult {
    /// Run ID (timestamp-based)
    pub id: String,
    /// Passing candidates, by change percent descending
    pub candidates: Vec<CandidateResult>,
    /// Per-stage funnel counts
    pub filter_results: Vec<FilterResult>,
    /// Rows in the snapshot
    pub total_scanned: usize,
    /// Rows sent to deep evaluation
    pub pool_size: usize,
    /// Criteria used
    pub criteria_summary: String,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub completed_at: DateTime<Utc>,
    /// Duration in seconds
    pub duration_secs: f64,
}

impl ScreenerResult {
    /// Symbols in result order.
    pub fn symbols(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.symbol.as_str()).collect()
    }

    /// Summary string for logging.
    pub fn summary(&self) -> String {
        format!(
            "Screened {} stocks in {:.1}s: {} of {} pooled passed",
            self.total_scanned,
            self.duration_secs,
            self.candidates.len(),
            self.pool_size
        )
    }
}

/// Stable re-sort by change percent, then truncate.
pub fn rank_candidates(candidates: &mut Vec<CandidateResult>, limit: usize) {
    candidates.sort_by(|a, b| by_change_desc(Some(a.change_percent), Some(b.change_percent)));
    candidates.truncate(limit);
}

// ============================================================================
// Screener Engine
// ============================================================================

/// The main screener engine.
///
/// Orchestrates one run:
/// 1. Fetch the full-market snapshot
/// 2. Drop restricted names and apply numeric bounds
/// 3. Pool the top rows by change
/// 4. Evaluate the pool through a bounded worker pool
/// 5. Rank and truncate
pub struct ScreenerEngine {
    config: ScreenerConfig,
    snapshot: Arc<dyn SnapshotProvider>,
    evaluator: Arc<CandidateEvaluator>,
}

impl ScreenerEngine {
    /// Create a new screener engine.
    pub fn new(
        config: ScreenerConfig,
        snapshot: Arc<dyn SnapshotProvider>,
        history: Arc<dyn HistoryProvider>,
    ) -> Self {
        let config = config.clamped();
        let evaluator = Arc::new(CandidateEvaluator::new(history, &config));

        Self {
            config,
            snapshot,
            evaluator,
        }
    }

    pub fn config(&self) -> &ScreenerConfig {
        &self.config
    }

    /// Run a screening pass.
    ///
    /// Returns an empty candidate list when nothing matches. Fails only for
    /// invalid criteria or when the snapshot provider cannot be reached.
    pub async fn screen(&self, criteria: ScreeningCriteria) -> Result<ScreenerResult, ScreenError> {
        criteria.validate()?;

        let started_at = Utc::now();
        let id = format!(
            "screen_{}_{}",
            started_at.format("%Y%m%d_%H%M%S"),
            generate_span_id()
        );
        let criteria_summary = criteria.summary();

        info!(run_id = %id, criteria = %criteria_summary, "Starting screening run");

        let rows = self.snapshot.fetch_snapshot().await.map_err(|e| {
            error!(
                run_id = %id,
                provider = self.snapshot.name(),
                error = %e,
                recoverable = e.is_recoverable(),
                "Snapshot fetch failed"
            );
            ScreenError::ProviderUnavailable(e)
        })?;
        let total_scanned = rows.len();

        // Phase 1: snapshot-level funnel
        let filter = SnapshotFilter::new(&criteria);
        let (rows, restricted_result) = filter.filter_restricted(rows);
        let (rows, bounds_result) = filter.filter_bounds(rows);
        let (pool, pool_result) = filter.select_pool(rows, self.config.candidate_pool_size);
        let pool_size = pool.len();

        info!(
            run_id = %id,
            total = total_scanned,
            restricted = restricted_result.eliminated,
            bounds_eliminated = bounds_result.eliminated,
            pool_size = pool_size,
            "Phase 1 (Snapshot filter) complete"
        );

        // Phase 2: deep evaluation
        let mut candidates = self.evaluate_pool(&id, pool, Arc::new(criteria)).await?;
        let deep_result = FilterResult::new(FilterStage::Deep, pool_size, candidates.len());

        info!(
            run_id = %id,
            passed = deep_result.passed,
            eliminated = deep_result.eliminated,
            "Phase 2 (Deep evaluation) complete"
        );

        // Phase 3: rank
        rank_candidates(&mut candidates, self.config.result_limit);
        let final_result = FilterResult::new(FilterStage::Final, deep_result.passed, candidates.len());

        let completed_at = Utc::now();
        let duration_secs = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        let result = ScreenerResult {
            id,
            candidates,
            filter_results: vec![
                restricted_result,
                bounds_result,
                pool_result,
                deep_result,
                final_result,
            ],
            total_scanned,
            pool_size,
            criteria_summary,
            started_at,
            completed_at,
            duration_secs,
        };

        info!(
            run_id = %result.id,
            candidates = result.candidates.len(),
            duration_ms = (completed_at - started_at).num_milliseconds(),
            "{}",
            result.summary()
        );

        Ok(result)
    }

    /// Fan the pool out to at most `max_concurrency` workers and collect
    /// every result before returning.
    ///
    /// Each task takes its permit before it is spawned, so dropping this
    /// future skips only the undispatched rows; spawned tasks finish.
    /// Results come back in pool order regardless of completion order.
    async fn evaluate_pool(
        &self,
        run_id: &str,
        pool: Vec<MarketSnapshotRow>,
        criteria: Arc<ScreeningCriteria>,
    ) -> Result<Vec<CandidateResult>, ScreenError> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let (tx, mut rx) = mpsc::channel(pool.len().max(1));

        for (index, row) in pool.into_iter().enumerate() {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| ScreenError::Internal(format!("worker pool closed: {}", e)))?;

            let tx = tx.clone();
            let evaluator = Arc::clone(&self.evaluator);
            let criteria = Arc::clone(&criteria);

            tokio::spawn(async move {
                let _permit = permit;
                let result = evaluator.evaluate(&row, &criteria).await;
                let _ = tx.send((index, result)).await;
            });
        }
        drop(tx);

        let mut collected = Vec::new();
        while let Some((index, result)) = rx.recv().await {
            match result {
                Some(candidate) => collected.push((index, candidate)),
                None => debug!(run_id = run_id, index = index, "Candidate discarded"),
            }
        }

        collected.sort_by_key(|(index, _)| *index);
        Ok(collected.into_iter().map(|(_, c)| c).collect())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AdjustMode, PriceBar, ProviderError};
    use crate::indicators::tests::bars_from_closes;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct MockSnapshot {
        rows: Option<Vec<MarketSnapshotRow>>,
    }

    #[async_trait]
    impl SnapshotProvider for MockSnapshot {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn fetch_snapshot(&self) -> Result<Vec<MarketSnapshotRow>, ProviderError> {
            self.rows
                .clone()
                .ok_or_else(|| ProviderError::Unavailable("offline".into()))
        }
    }

    /// Tracks how many fetches run at once.
    struct SlowHistory {
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: AtomicUsize,
        done: AtomicUsize,
    }

    impl SlowHistory {
        fn new() -> Arc<Self> {
            Self::with_delay(Duration::from_millis(20))
        }

        fn with_delay(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
                done: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl HistoryProvider for SlowHistory {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn fetch_history(
            &self,
            _symbol: &str,
            _adjust: AdjustMode,
            _lookback_days: u32,
        ) -> Result<Vec<PriceBar>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.done.fetch_add(1, Ordering::SeqCst);
            let mut bars = bars_from_closes(&[10.0, 10.0, 10.0, 13.0, 14.0]);
            for (bar, volume) in bars.iter_mut().zip([100.0, 100.0, 100.0, 130.0, 140.0]) {
                bar.volume = volume;
            }
            Ok(bars)
        }
    }

    fn universe(n: usize) -> Vec<MarketSnapshotRow> {
        (0..n)
            .map(|i| {
                let mut row = MarketSnapshotRow::new(format!("{:06}", i), format!("stock{}", i), 10.0);
                row.change_percent = Some((i % 17) as f64 * 0.5);
                row
            })
            .collect()
    }

    fn engine(rows: Option<Vec<MarketSnapshotRow>>, history: Arc<SlowHistory>) -> ScreenerEngine {
        ScreenerEngine::new(
            ScreenerConfig::default(),
            Arc::new(MockSnapshot { rows }),
            history,
        )
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded_and_pool_drained() {
        let history = SlowHistory::new();
        let engine = engine(Some(universe(100)), history.clone());
        let criteria = ScreeningCriteria {
            check_volume_up: true,
            ..Default::default()
        };

        let result = engine.screen(criteria).await.unwrap();

        assert_eq!(result.pool_size, 30);
        assert_eq!(history.calls.load(Ordering::SeqCst), 30);
        assert!(history.max_in_flight.load(Ordering::SeqCst) <= 5);
        assert_eq!(result.candidates.len(), 10);
    }

    #[tokio::test]
    async fn test_cancelled_run_stops_dispatching() {
        let history = SlowHistory::with_delay(Duration::from_millis(200));
        let engine = engine(Some(universe(100)), history.clone());
        let criteria = ScreeningCriteria {
            check_volume_up: true,
            ..Default::default()
        };

        let outcome = tokio::time::timeout(Duration::from_millis(50), engine.screen(criteria)).await;
        assert!(outcome.is_err());

        // Workers already holding a permit run to completion; nothing new starts
        tokio::time::sleep(Duration::from_millis(400)).await;
        let max_concurrency = ScreenerConfig::default().max_concurrency;
        assert_eq!(history.calls.load(Ordering::SeqCst), max_concurrency);
        assert_eq!(history.done.load(Ordering::SeqCst), max_concurrency);
    }

    #[tokio::test]
    async fn test_results_sorted_by_change() {
        let engine = engine(Some(universe(60)), SlowHistory::new());
        let result = engine.screen(ScreeningCriteria::default()).await.unwrap();

        let changes: Vec<f64> = result.candidates.iter().map(|c| c.change_percent).collect();
        let mut sorted = changes.clone();
        sorted.sort_by(|a, b| b.total_cmp(a));
        assert_eq!(changes, sorted);
        assert_eq!(result.filter_results.len(), 5);
        assert_eq!(result.filter_results[4].stage, FilterStage::Final);
    }

    #[tokio::test]
    async fn test_provider_failure_is_run_level_error() {
        let engine = engine(None, SlowHistory::new());
        let err = engine.screen(ScreeningCriteria::default()).await.unwrap_err();
        assert!(matches!(err, ScreenError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn test_invalid_criteria_rejected_before_fetch() {
        let history = SlowHistory::new();
        let engine = engine(None, history.clone());
        let criteria = ScreeningCriteria {
            min_change: Some(5.0),
            max_change: Some(1.0),
            ..Default::default()
        };

        let err = engine.screen(criteria).await.unwrap_err();
        assert!(matches!(err, ScreenError::InvalidCriteria(_)));
    }

    #[tokio::test]
    async fn test_empty_snapshot_returns_empty_result() {
        let engine = engine(Some(Vec::new()), SlowHistory::new());
        let result = engine.screen(ScreeningCriteria::default()).await.unwrap();
        assert!(result.candidates.is_empty());
        assert_eq!(result.pool_size, 0);
    }

    #[test]
    fn test_rank_candidates_stable() {
        let make = |symbol: &str, change: f64| CandidateResult {
            symbol: symbol.into(),
            name: symbol.into(),
            price: 1.0,
            change_percent: change,
            volume_ratio: 0.0,
            turnover_rate: 0.0,
            hit_reasons: Vec::new(),
        };

        let mut candidates = vec![make("a", 1.0), make("b", 3.0), make("c", 1.0), make("d", 3.0)];
        rank_candidates(&mut candidates, 3);

        let symbols: Vec<&str> = candidates.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["b", "d", "a"]);
    }

    #[test]
    fn test_result_summary() {
        let now = Utc::now();
        let result = ScreenerResult {
            id: "screen_test".into(),
            candidates: Vec::new(),
            filter_results: Vec::new(),
            total_scanned: 5000,
            pool_size: 30,
            criteria_summary: String::new(),
            started_at: now,
            completed_at: now,
            duration_secs: 2.5,
        };

        assert_eq!(result.summary(), "Screened 5000 stocks in 2.5s: 0 of 30 pooled passed");
    }
}
