//! Snapshot-level filtering for the screener.
//!
//! Implements the funnel ahead of deep evaluation:
//! 1. Restricted filter: exclude ST / delisting names
//! 2. Bounds filter: change, turnover, volume ratio, floating market cap
//! 3. Pool selection: top rows by change, capped

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::config::{ScreeningCriteria, MARKET_CAP_UNIT};
use crate::data::MarketSnapshotRow;

// ============================================================================
// Filter Stage
// ============================================================================

/// Filter stage identifier for tracking where stocks are eliminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterStage {
    /// Exclude ST and delisting names
    Restricted,
    /// Snapshot numeric bounds
    Bounds,
    /// Candidate pool cap
    Pool,
    /// Deep checks (history and intraday)
    Deep,
    /// Final truncation
    Final,
}

impl std::fmt::Display for FilterStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Restricted => write!(f, "排除ST/退市"),
            Self::Bounds => write!(f, "指标区间"),
            Self::Pool => write!(f, "候选池"),
            Self::Deep => write!(f, "深度检查"),
            Self::Final => write!(f, "最终结果"),
        }
    }
}

// ============================================================================
// Filter Result
// ============================================================================

/// Result of a filtering stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterResult {
    /// Stage name
    pub stage: FilterStage,
    /// Number of stocks that passed this stage
    pub passed: usize,
    /// Number of stocks eliminated at this stage
    pub eliminated: usize,
    /// Elimination rate (%)
    pub elimination_rate: f64,
}

impl FilterResult {
    pub fn new(stage: FilterStage, input_count: usize, passed_count: usize) -> Self {
        let eliminated = input_count.saturating_sub(passed_count);
        let elimination_rate = if input_count > 0 {
            (eliminated as f64 / input_count as f64) * 100.0
        } else {
            0.0
        };

        Self {
            stage,
            passed: passed_count,
            eliminated,
            elimination_rate,
        }
    }
}

// ============================================================================
// Ranking
// ============================================================================

/// Descending by change percent; missing values rank last.
pub fn by_change_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    let a = a.unwrap_or(f64::NEG_INFINITY);
    let b = b.unwrap_or(f64::NEG_INFINITY);
    b.total_cmp(&a)
}

// ============================================================================
// Snapshot Filter
// ============================================================================

/// Snapshot-level filter for one screening run.
pub struct SnapshotFilter<'a> {
    criteria: &'a ScreeningCriteria,
}

/// `true` when the bound is unset or the value is missing; otherwise the test.
fn within(value: Option<f64>, bound: Option<f64>, test: impl Fn(f64, f64) -> bool) -> bool {
    match (value, bound) {
        (Some(v), Some(b)) => test(v, b),
        _ => true,
    }
}

impl<'a> SnapshotFilter<'a> {
    pub fn new(criteria: &'a ScreeningCriteria) -> Self {
        Self { criteria }
    }

    // ========================================================================
    // Stage 1: Restricted
    // ========================================================================

    pub fn filter_restricted(
        &self,
        rows: Vec<MarketSnapshotRow>,
    ) -> (Vec<MarketSnapshotRow>, FilterResult) {
        let input_count = rows.len();
        let passed: Vec<MarketSnapshotRow> = rows.into_iter().filter(|r| !r.is_restricted()).collect();

        let result = FilterResult::new(FilterStage::Restricted, input_count, passed.len());
        (passed, result)
    }

    // ========================================================================
    // Stage 2: Bounds
    // ========================================================================

    /// Apply every configured numeric bound.
    ///
    /// A row whose field for a given bound is missing is not tested against
    /// that bound; the remaining bounds still apply.
    pub fn filter_bounds(
        &self,
        rows: Vec<MarketSnapshotRow>,
    ) -> (Vec<MarketSnapshotRow>, FilterResult) {
        let input_count = rows.len();
        let passed: Vec<MarketSnapshotRow> = rows
            .into_iter()
            .filter(|r| self.passes_bounds(r))
            .collect();

        let result = FilterResult::new(FilterStage::Bounds, input_count, passed.len());
        (passed, result)
    }

    pub fn passes_bounds(&self, row: &MarketSnapshotRow) -> bool {
        let c = self.criteria;
        let ge = |v: f64, b: f64| v >= b;
        let le = |v: f64, b: f64| v <= b;

        within(row.change_percent, c.min_change, ge)
            && within(row.change_percent, c.max_change, le)
            && within(row.turnover_rate, c.min_turnover, ge)
            && within(row.turnover_rate, c.max_turnover, le)
            && within(row.volume_ratio, c.min_volume_ratio, ge)
            && within(
                row.float_market_cap,
                c.min_market_cap.map(|m| m * MARKET_CAP_UNIT),
                ge,
            )
            && within(
                row.float_market_cap,
                c.max_market_cap.map(|m| m * MARKET_CAP_UNIT),
                le,
            )
    }

    // ========================================================================
    // Stage 3: Pool
    // ========================================================================

    /// Rank by change (stable) and keep the head.
    pub fn select_pool(
        &self,
        mut rows: Vec<MarketSnapshotRow>,
        pool_size: usize,
    ) -> (Vec<MarketSnapshotRow>, FilterResult) {
        let input_count = rows.len();
        rows.sort_by(|a, b| by_change_desc(a.change_percent, b.change_percent));
        rows.truncate(pool_size);

        let result = FilterResult::new(FilterStage::Pool, input_count, rows.len());
        (rows, result)
    }
}

// ============================================================================
// Tests
// ============================================================================
