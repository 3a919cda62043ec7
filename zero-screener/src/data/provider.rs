//! Data provider abstraction.
//!
//! Defines the provider traits the screener core consumes. Concrete adapters
//! (eastmoney, sina) implement them over HTTP; tests implement them in memory.

use async_trait::async_trait;
use std::fmt;

use super::{AdjustMode, MarketSnapshotRow, PriceBar, RawQuote};

// ============================================================================
// Provider Error
// ============================================================================

/// Errors specific to data providers.
#[derive(Debug, Clone)]
pub enum ProviderError {
    /// Network error (connection failed, non-success status)
    Network(String),
    /// Call exceeded its time budget
    Timeout(String),
    /// Provider is temporarily unavailable
    Unavailable(String),
    /// Data not available for the requested symbol
    DataNotAvailable(String),
    /// Invalid request parameters
    InvalidRequest(String),
    /// Response could not be decoded
    Parse(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Timeout(msg) => write!(f, "Timed out: {}", msg),
            Self::Unavailable(msg) => write!(f, "Provider unavailable: {}", msg),
            Self::DataNotAvailable(msg) => write!(f, "Data not available: {}", msg),
            Self::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            Self::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    /// Check if the error is recoverable (worth retrying)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::Unavailable(_)
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_decode() {
            Self::Parse(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

// ============================================================================
// Provider Traits
// ============================================================================

/// Full-market snapshot source.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Fetch one row per listed instrument.
    async fn fetch_snapshot(&self) -> Result<Vec<MarketSnapshotRow>, ProviderError>;
}

/// Daily price history source.
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Fetch daily bars, ascending by date.
    ///
    /// # Arguments
    /// * `symbol` - Exchange-local code (e.g., "600000")
    /// * `adjust` - Price adjustment mode
    /// * `lookback_days` - Calendar days back from today
    async fn fetch_history(
        &self,
        symbol: &str,
        adjust: AdjustMode,
        lookback_days: u32,
    ) -> Result<Vec<PriceBar>, ProviderError>;
}

/// Real-time quote source addressed by provider codes.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Map an exchange-local symbol to the provider's code.
    fn provider_code(&self, symbol: &str) -> String;

    /// Fetch quotes for one batch of provider codes in a single request.
    ///
    /// Malformed lines are skipped; the result may be shorter than `codes`.
    async fn fetch_quotes(&self, codes: &[String]) -> Result<Vec<RawQuote>, ProviderError>;
}

// ============================================================================
// Tests
// ============================================================================
