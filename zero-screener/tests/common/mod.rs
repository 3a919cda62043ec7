//! Shared mock providers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use zero_screener::data::{
    AdjustMode, HistoryProvider, MarketSnapshotRow, PriceBar, ProviderError, QuoteProvider,
    RawQuote, SnapshotProvider,
};

pub struct MockSnapshot {
    pub rows: Option<Vec<MarketSnapshotRow>>,
    pub calls: AtomicUsize,
}

impl MockSnapshot {
    pub fn new(rows: Vec<MarketSnapshotRow>) -> Arc<Self> {
        Arc::new(Self {
            rows: Some(rows),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn offline() -> Arc<Self> {
        Arc::new(Self {
            rows: None,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SnapshotProvider for MockSnapshot {
    fn name(&self) -> &'static str {
        "mock-snapshot"
    }

    async fn fetch_snapshot(&self) -> Result<Vec<MarketSnapshotRow>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rows
            .clone()
            .ok_or_else(|| ProviderError::Network("connection refused".into()))
    }
}

/// Per-symbol histories; unknown symbols fail.
pub struct MockHistory {
    pub bars: HashMap<String, Vec<PriceBar>>,
    pub calls: AtomicUsize,
}

impl MockHistory {
    pub fn new(bars: HashMap<String, Vec<PriceBar>>) -> Arc<Self> {
        Arc::new(Self {
            bars,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::new(HashMap::new())
    }
}

#[async_trait]
impl HistoryProvider for MockHistory {
    fn name(&self) -> &'static str {
        "mock-history"
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        _adjust: AdjustMode,
        _lookback_days: u32,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bars
            .get(symbol)
            .cloned()
            .ok_or_else(|| ProviderError::DataNotAvailable(symbol.to_string()))
    }
}

/// Quotes keyed by provider code: (price, prev_close).
pub struct MockQuotes {
    pub table: HashMap<String, (f64, f64)>,
}

impl MockQuotes {
    pub fn new(entries: &[(&str, f64, f64)]) -> Arc<Self> {
        Arc::new(Self {
            table: entries
                .iter()
                .map(|(code, price, prev)| (code.to_string(), (*price, *prev)))
                .collect(),
        })
    }
}

#[async_trait]
impl QuoteProvider for MockQuotes {
    fn name(&self) -> &'static str {
        "mock-quotes"
    }

    fn provider_code(&self, symbol: &str) -> String {
        zero_screener::data::to_sina_code(symbol)
    }

    async fn fetch_quotes(&self, codes: &[String]) -> Result<Vec<RawQuote>, ProviderError> {
        Ok(codes
            .iter()
            .filter_map(|code| {
                let (price, prev_close) = self.table.get(code)?;
                Some(RawQuote {
                    code: code.clone(),
                    name: "测试".to_string(),
                    open: *prev_close,
                    prev_close: *prev_close,
                    price: *price,
                    high: *price,
                    low: *price,
                })
            })
            .collect())
    }
}

pub fn row(symbol: &str, name: &str, change: f64, turnover: f64, volume_ratio: f64) -> MarketSnapshotRow {
    let mut r = MarketSnapshotRow::new(symbol, name, 10.0);
    r.change_percent = Some(change);
    r.turnover_rate = Some(turnover);
    r.volume_ratio = Some(volume_ratio);
    r
}

/// Ascending daily bars with the given closes and volumes.
pub fn bars(closes: &[f64], volumes: &[f64]) -> Vec<PriceBar> {
    let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&close, &volume))| PriceBar {
            date: start + Duration::days(i as i64),
            open: close,
            high: close + 0.2,
            low: close - 0.2,
            close,
            volume,
        })
        .collect()
}
