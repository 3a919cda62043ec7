//! Market data module for A-shares.
//!
//! Provides the core data types consumed by the screener and the indicator
//! engine, plus the provider adapters that produce them.
//!
//! # Data Sources
//! - **eastmoney** `clist`: full-market snapshot (one row per listed stock)
//! - **eastmoney** `kline`: daily OHLCV history with adjustment modes
//! - **sina** `hq.sinajs.cn`: batch real-time quotes

mod cache;
mod eastmoney;
mod provider;
mod sina;

pub use cache::{CachedHistoryProvider, HistoryCache};
pub use eastmoney::{to_secid, EastmoneyAdapter};
pub use provider::{HistoryProvider, ProviderError, QuoteProvider, SnapshotProvider};
pub use sina::{parse_quote_lines, to_sina_code, SinaQuoteAdapter};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Core Data Types
// ============================================================================

/// Name markers for stocks under trading restriction or delisting.
const RESTRICTED_MARKERS: &[&str] = &["ST", "退"];

/// Shares per board lot. Snapshot volume is reported in lots.
pub const SHARES_PER_LOT: f64 = 100.0;

/// One trading session of OHLCV data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Trading date
    pub date: NaiveDate,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Volume
    pub volume: f64,
}

/// One instrument in a full-market snapshot.
///
/// Only `symbol` and `price` are required. Every other numeric field is
/// optional because the upstream feed reports `-` for suspended or newly
/// listed stocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshotRow {
    /// Exchange-local code (e.g., "600000")
    pub symbol: String,
    /// Display name
    pub name: String,
    /// Last traded price
    pub price: f64,
    /// Change since prior close (%)
    pub change_percent: Option<f64>,
    /// Turnover rate (%)
    pub turnover_rate: Option<f64>,
    /// Volume relative to the recent average
    pub volume_ratio: Option<f64>,
    /// Traded value (currency)
    pub traded_value: Option<f64>,
    /// Traded volume (lots)
    pub volume: Option<f64>,
    /// Day high
    pub high: Option<f64>,
    /// Day low
    pub low: Option<f64>,
    /// Floating market capitalization (currency)
    pub float_market_cap: Option<f64>,
}

impl MarketSnapshotRow {
    /// Minimal row with only the required fields set.
    pub fn new(symbol: impl Into<String>, name: impl Into<String>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            price,
            change_percent: None,
            turnover_rate: None,
            volume_ratio: None,
            traded_value: None,
            volume: None,
            high: None,
            low: None,
            float_market_cap: None,
        }
    }

    /// Whether the name carries a trading-restriction or delisting marker.
    pub fn is_restricted(&self) -> bool {
        RESTRICTED_MARKERS.iter().any(|m| self.name.contains(m))
    }

    /// Volume-weighted average price for the session so far.
    ///
    /// `None` when value or volume is missing, or no volume has traded.
    pub fn average_price(&self) -> Option<f64> {
        let value = self.traded_value?;
        let volume = self.volume?;
        if volume <= 0.0 {
            return None;
        }
        Some(value / (volume * SHARES_PER_LOT))
    }
}

/// Price adjustment mode for historical bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdjustMode {
    /// Raw prices
    None,
    /// Forward-adjusted (前复权)
    #[default]
    Forward,
    /// Backward-adjusted (后复权)
    Backward,
}

impl AdjustMode {
    /// Eastmoney `fqt` parameter
    pub fn fqt(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Forward => 1,
            Self::Backward => 2,
        }
    }
}

impl std::fmt::Display for AdjustMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Forward => write!(f, "qfq"),
            Self::Backward => write!(f, "hfq"),
        }
    }
}

/// One parsed line from the real-time quote feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawQuote {
    /// Provider code (e.g., "sh600000")
    pub code: String,
    /// Display name
    pub name: String,
    /// Open price
    pub open: f64,
    /// Prior session close
    pub prev_close: f64,
    /// Last traded price (0 before the open or while suspended)
    pub price: f64,
    /// Day high
    pub high: f64,
    /// Day low
    pub low: f64,
}

impl RawQuote {
    /// Exchange-local code with the provider prefix removed.
    pub fn symbol(&self) -> &str {
        self.code.get(2..).unwrap_or(&self.code)
    }

    /// Last price, falling back to the prior close when nothing has traded.
    ///
    /// `None` when neither is positive.
    pub fn effective_price(&self) -> Option<f64> {
        let price = if self.price == 0.0 {
            self.prev_close
        } else {
            self.price
        };
        (price > 0.0).then_some(price)
    }
}

/// Single-symbol quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub prev_close: f64,
    /// Change since prior close (%), rounded to 2 decimals
    pub change_percent: f64,
}

impl Quote {
    /// Build from a raw quote, or `None` when no usable price exists.
    pub fn from_raw(raw: &RawQuote) -> Option<Self> {
        let price = raw.effective_price()?;
        let change_percent = if raw.prev_close > 0.0 {
            round_to((price - raw.prev_close) / raw.prev_close * 100.0, 2)
        } else {
            0.0
        };

        Some(Self {
            symbol: raw.symbol().to_string(),
            name: raw.name.clone(),
            price,
            prev_close: raw.prev_close,
            change_percent,
        })
    }
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ============================================================================
// Tests
// ============================================================================
