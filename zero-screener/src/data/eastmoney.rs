//! Eastmoney adapter for A-share market data.
//!
//! Implements the snapshot and history providers directly over eastmoney's
//! public JSON APIs (no API key, no published rate limit).
//!
//! # Data Sources
//! - Market snapshot: push2.eastmoney.com `clist` (paged, all A-share boards)
//! - Daily K-line: push2his.eastmoney.com `kline`

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::provider::{HistoryProvider, ProviderError, SnapshotProvider};
use super::{AdjustMode, MarketSnapshotRow, PriceBar};

// ============================================================================
// Constants
// ============================================================================

/// Eastmoney market list API
pub const EASTMONEY_CLIST_URL: &str = "https://push2.eastmoney.com/api/qt/clist/get";

/// Eastmoney historical data API
pub const EASTMONEY_KLINE_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";

/// Shanghai main + STAR, Shenzhen main + ChiNext
const MARKET_FILTER: &str = "m:0 t:6,m:0 t:80,m:1 t:2,m:1 t:23";

/// price, change %, volume, value, turnover, volume ratio, code, name, high, low, float cap
const SNAPSHOT_FIELDS: &str = "f2,f3,f5,f6,f8,f10,f12,f14,f15,f16,f21";

const PAGE_SIZE: usize = 5000;

/// Upper bound on snapshot pages, in case `total` is misreported.
const MAX_PAGES: usize = 20;

// ============================================================================
// Symbol Mapping
// ============================================================================

/// Convert an exchange-local code to eastmoney's `secid`.
///
/// "600000" -> "1.600000" (Shanghai), "000001" -> "0.000001" (Shenzhen)
pub fn to_secid(symbol: &str) -> String {
    let code = symbol.trim();
    let market = if code.starts_with('6') || code.starts_with('5') || code.starts_with("900") {
        "1"
    } else {
        "0"
    };
    format!("{}.{}", market, code)
}

fn is_valid_code(symbol: &str) -> bool {
    !symbol.is_empty() && symbol.chars().all(|c| c.is_ascii_digit())
}

/// Read a numeric field that may be a number, a numeric string, or "-".
fn field_f64(item: &Value, key: &str) -> Option<f64> {
    let value = match item.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

fn field_str(item: &Value, key: &str) -> Option<String> {
    match item.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse one `clist` item. Rows without a code or a price are dropped.
fn parse_snapshot_row(item: &Value) -> Option<MarketSnapshotRow> {
    let symbol = field_str(item, "f12")?;
    let price = field_f64(item, "f2")?;

    Some(MarketSnapshotRow {
        symbol,
        name: field_str(item, "f14").unwrap_or_default(),
        price,
        change_percent: field_f64(item, "f3"),
        turnover_rate: field_f64(item, "f8"),
        volume_ratio: field_f64(item, "f10"),
        traded_value: field_f64(item, "f6"),
        volume: field_f64(item, "f5"),
        high: field_f64(item, "f15"),
        low: field_f64(item, "f16"),
        float_market_cap: field_f64(item, "f21"),
    })
}

/// Parse eastmoney kline strings into bars.
///
/// Format: "2024-01-02,10.50,10.70,10.80,10.40,100000,105000000,..."
/// (date, open, close, high, low, volume, amount, ...)
fn parse_klines(symbol: &str, klines: &[String]) -> Vec<PriceBar> {
    let mut bars = Vec::with_capacity(klines.len());

    for line in klines {
        match parse_kline(line) {
            Some(bar) => bars.push(bar),
            None => warn!(symbol = symbol, line = %line, "Invalid kline format, skipping"),
        }
    }

    bars.sort_by_key(|b| b.date);
    bars
}

fn parse_kline(line: &str) -> Option<PriceBar> {
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() < 6 {
        return None;
    }

    let num = |i: usize| parts[i].trim().parse::<f64>().ok();

    Some(PriceBar {
        date: NaiveDate::parse_from_str(parts[0].trim(), "%Y-%m-%d").ok()?,
        open: num(1)?,
        close: num(2)?,
        high: num(3)?,
        low: num(4)?,
        volume: num(5)?,
    })
}

// ============================================================================
// Eastmoney Adapter
// ============================================================================

/// Eastmoney adapter for snapshots and daily history.
pub struct EastmoneyAdapter {
    /// HTTP client
    client: reqwest::Client,
    /// Market list endpoint
    snapshot_url: String,
    /// K-line endpoint
    kline_url: String,
}

impl EastmoneyAdapter {
    /// Create an adapter against the public endpoints.
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            snapshot_url: EASTMONEY_CLIST_URL.to_string(),
            kline_url: EASTMONEY_KLINE_URL.to_string(),
        }
    }

    /// Override the endpoints (proxies, test servers).
    pub fn with_urls(mut self, snapshot_url: impl Into<String>, kline_url: impl Into<String>) -> Self {
        self.snapshot_url = snapshot_url.into();
        self.kline_url = kline_url.into();
        self
    }

    /// Create from the screener service config.
    pub fn from_config(config: &zero_common::ScreenerServiceConfig) -> Self {
        let timeout = Duration::from_secs(config.fetch_timeout_secs.unwrap_or(10).clamp(1, 60));
        let adapter = Self::new(timeout);
        let snapshot_url = config
            .snapshot_url
            .clone()
            .unwrap_or_else(|| adapter.snapshot_url.clone());
        let kline_url = config
            .kline_url
            .clone()
            .unwrap_or_else(|| adapter.kline_url.clone());
        adapter.with_urls(snapshot_url, kline_url)
    }

    /// Fetch one page of the market list.
    async fn fetch_page(&self, page: usize) -> Result<ClistPage, ProviderError> {
        let page_str = page.to_string();
        let size_str = PAGE_SIZE.to_string();

        let response = self
            .client
            .get(&self.snapshot_url)
            .query(&[
                ("pn", page_str.as_str()),
                ("pz", size_str.as_str()),
                ("po", "1"),
                ("np", "1"),
                ("fltt", "2"),
                ("invt", "2"),
                ("fid", "f3"),
                ("fs", MARKET_FILTER),
                ("fields", SNAPSHOT_FIELDS),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Network(format!("HTTP {}", response.status())));
        }

        let body: Value = response.json().await?;
        let data = body.get("data").cloned().unwrap_or(Value::Null);
        let total = data.get("total").and_then(Value::as_u64).unwrap_or(0) as usize;
        let items = data
            .get("diff")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(ClistPage { total, items })
    }
}

struct ClistPage {
    total: usize,
    items: Vec<Value>,
}

// ============================================================================
// Provider Implementations
// ============================================================================

#[async_trait]
impl SnapshotProvider for EastmoneyAdapter {
    fn name(&self) -> &'static str {
        "eastmoney"
    }

    async fn fetch_snapshot(&self) -> Result<Vec<MarketSnapshotRow>, ProviderError> {
        let first = self.fetch_page(1).await?;
        if first.items.is_empty() {
            return Err(ProviderError::Unavailable(
                "Market snapshot returned no rows".into(),
            ));
        }

        let total = first.total;
        let mut raw = first.items;
        let mut page = 1;

        while raw.len() < total && page < MAX_PAGES {
            page += 1;
            let next = self.fetch_page(page).await?;
            if next.items.is_empty() {
                break;
            }
            raw.extend(next.items);
        }

        let rows: Vec<MarketSnapshotRow> = raw.iter().filter_map(parse_snapshot_row).collect();

        debug!(
            pages = page,
            total = total,
            rows = rows.len(),
            dropped = raw.len() - rows.len(),
            "Fetched market snapshot from eastmoney"
        );

        Ok(rows)
    }
}

#[async_trait]
impl HistoryProvider for EastmoneyAdapter {
    fn name(&self) -> &'static str {
        "eastmoney"
    }

    async fn fetch_history(
        &self,
        symbol: &str,
        adjust: AdjustMode,
        lookback_days: u32,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        if !is_valid_code(symbol) {
            return Err(ProviderError::InvalidRequest(format!(
                "Invalid symbol format: {}",
                symbol
            )));
        }

        let end = Local::now().date_naive();
        let start = end - ChronoDuration::days(i64::from(lookback_days));
        let secid = to_secid(symbol);
        let fqt = adjust.fqt().to_string();
        let beg = start.format("%Y%m%d").to_string();
        let end = end.format("%Y%m%d").to_string();

        debug!(symbol = symbol, secid = %secid, adjust = %adjust, "Fetching kline from eastmoney");

        let response = self
            .client
            .get(&self.kline_url)
            .query(&[
                ("secid", secid.as_str()),
                ("klt", "101"),
                ("fqt", fqt.as_str()),
                ("beg", beg.as_str()),
                ("end", end.as_str()),
                ("fields1", "f1,f2,f3,f4,f5,f6"),
                ("fields2", "f51,f52,f53,f54,f55,f56,f57"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Network(format!("HTTP {}", response.status())));
        }

        let data: EastmoneyKlineResponse = response.json().await?;

        if data.rc != 0 {
            return Err(ProviderError::Unavailable(format!(
                "Eastmoney API error: rc={}",
                data.rc
            )));
        }

        let klines = data
            .data
            .and_then(|d| d.klines)
            .ok_or_else(|| ProviderError::DataNotAvailable(symbol.to_string()))?;

        Ok(parse_klines(symbol, &klines))
    }
}

// ============================================================================
// Eastmoney API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct EastmoneyKlineResponse {
    /// Return code (0 = success)
    #[serde(default)]
    rc: i32,
    data: Option<EastmoneyKlineData>,
}

#[derive(Debug, Deserialize)]
struct EastmoneyKlineData {
    klines: Option<Vec<String>>,
}

// ============================================================================
// Tests
// ============================================================================
