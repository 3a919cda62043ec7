//! Screener configuration module.
//!
//! `ScreeningCriteria` is the per-run request. `ScreenerConfig` holds the
//! engine tuning loaded from the service config, clamped into safe ranges.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use zero_common::ScreenerServiceConfig;

use crate::data::AdjustMode;
use crate::error::ScreenError;

/// Market-cap bounds are given in units of 100 million (亿).
pub const MARKET_CAP_UNIT: f64 = 1e8;

// ============================================================================
// Screening Criteria
// ============================================================================

/// User-defined criteria for one screening run.
///
/// Every bound is optional (absent means unbounded) and every deep check is
/// off unless enabled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningCriteria {
    // === Snapshot Bounds ===

    /// Minimum change since prior close (%)
    pub min_change: Option<f64>,

    /// Maximum change since prior close (%)
    pub max_change: Option<f64>,

    /// Minimum turnover rate (%)
    pub min_turnover: Option<f64>,

    /// Maximum turnover rate (%)
    pub max_turnover: Option<f64>,

    /// Minimum volume ratio
    pub min_volume_ratio: Option<f64>,

    /// Minimum floating market cap (亿)
    pub min_market_cap: Option<f64>,

    /// Maximum floating market cap (亿)
    pub max_market_cap: Option<f64>,

    // === Deep Checks ===

    /// Price > MA5 > MA10 > MA20
    pub check_ma_alignment: bool,

    /// Last 3 sessions' mean volume >= 1.1x the 2 before
    pub check_volume_up: bool,

    /// Price at or above the intraday average
    pub check_strong_trend: bool,

    /// Price within 2% of the day high and above the intraday average
    pub check_new_high_pullback: bool,
}

impl ScreeningCriteria {
    /// Reject criteria that can never match or are not numbers.
    pub fn validate(&self) -> Result<(), ScreenError> {
        let bounds = [
            ("min_change", self.min_change),
            ("max_change", self.max_change),
            ("min_turnover", self.min_turnover),
            ("max_turnover", self.max_turnover),
            ("min_volume_ratio", self.min_volume_ratio),
            ("min_market_cap", self.min_market_cap),
            ("max_market_cap", self.max_market_cap),
        ];

        for (name, value) in bounds {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(ScreenError::InvalidCriteria(format!("{} is not a number", name)));
                }
                if v < 0.0 && name != "min_change" && name != "max_change" {
                    return Err(ScreenError::InvalidCriteria(format!(
                        "{} must not be negative",
                        name
                    )));
                }
            }
        }

        let pairs = [
            ("change", self.min_change, self.max_change),
            ("turnover", self.min_turnover, self.max_turnover),
            ("market_cap", self.min_market_cap, self.max_market_cap),
        ];

        for (name, min, max) in pairs {
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(ScreenError::InvalidCriteria(format!(
                        "min_{} ({}) is greater than max_{} ({})",
                        name, min, name, max
                    )));
                }
            }
        }

        Ok(())
    }

    /// Short description for logging.
    pub fn summary(&self) -> String {
        let checks: Vec<&str> = [
            (self.check_ma_alignment, "ma"),
            (self.check_volume_up, "volume"),
            (self.check_strong_trend, "trend"),
            (self.check_new_high_pullback, "pullback"),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, name)| *name)
        .collect();

        format!(
            "change {:?}..{:?}, turnover {:?}..{:?}, vr>={:?}, cap {:?}..{:?}, checks [{}]",
            self.min_change,
            self.max_change,
            self.min_turnover,
            self.max_turnover,
            self.min_volume_ratio,
            self.min_market_cap,
            self.max_market_cap,
            checks.join(",")
        )
    }
}

// ============================================================================
// Engine Configuration
// ============================================================================

/// Tuning for the screening engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenerConfig {
    /// Concurrent candidate evaluations
    pub max_concurrency: usize,
    /// Rows sent to deep evaluation
    pub candidate_pool_size: usize,
    /// Maximum results returned
    pub result_limit: usize,
    /// Per-fetch timeout
    pub fetch_timeout: Duration,
    /// History window requested per candidate (calendar days)
    pub history_lookback_days: u32,
    /// Adjustment mode for history
    pub adjust: AdjustMode,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            candidate_pool_size: 30,
            result_limit: 10,
            fetch_timeout: Duration::from_secs(10),
            history_lookback_days: 180,
            adjust: AdjustMode::Forward,
        }
    }
}

impl ScreenerConfig {
    /// Build from the service config, filling defaults and clamping.
    pub fn from_service_config(config: &ScreenerServiceConfig) -> Self {
        let defaults = Self::default();

        Self {
            max_concurrency: config.max_concurrency.unwrap_or(defaults.max_concurrency),
            candidate_pool_size: config
                .candidate_pool_size
                .unwrap_or(defaults.candidate_pool_size),
            result_limit: config.result_limit.unwrap_or(defaults.result_limit),
            fetch_timeout: config
                .fetch_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
            history_lookback_days: config
                .history_lookback_days
                .unwrap_or(defaults.history_lookback_days),
            adjust: defaults.adjust,
        }
        .clamped()
    }

    /// Keep every load-shedding parameter inside its bounded range.
    pub fn clamped(self) -> Self {
        let candidate_pool_size = self.candidate_pool_size.clamp(1, 100);
        let timeout_secs = self.fetch_timeout.as_secs().clamp(1, 60);

        Self {
            max_concurrency: self.max_concurrency.clamp(1, 16),
            candidate_pool_size,
            result_limit: self.result_limit.clamp(1, candidate_pool_size),
            fetch_timeout: Duration::from_secs(timeout_secs),
            history_lookback_days: self.history_lookback_days.clamp(60, 730),
            adjust: self.adjust,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
