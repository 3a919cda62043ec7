//! Batch real-time quote lookup.
//!
//! Used for position tracking, not screening. Symbols are mapped to provider
//! codes, fetched in chunks, and resolved to a price each. A failed chunk or
//! an unparseable line only drops the symbols it covers.

use futures::future::join_all;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::data::{ProviderError, Quote, QuoteProvider, RawQuote};

/// Codes per provider request.
pub const DEFAULT_CHUNK_SIZE: usize = 80;

/// Upper bound on the configurable chunk size.
const MAX_CHUNK_SIZE: usize = 200;

/// Batch quote helper over a `QuoteProvider`.
pub struct BatchQuoteService {
    provider: Arc<dyn QuoteProvider>,
    chunk_size: usize,
    fetch_timeout: Duration,
}

impl BatchQuoteService {
    pub fn new(provider: Arc<dyn QuoteProvider>) -> Self {
        Self {
            provider,
            chunk_size: DEFAULT_CHUNK_SIZE,
            fetch_timeout: Duration::from_secs(10),
        }
    }

    /// Set the chunk size, clamped to 1..=200.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.clamp(1, MAX_CHUNK_SIZE);
        self
    }

    /// Set the per-chunk timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    async fn fetch_chunk(&self, codes: &[String]) -> Result<Vec<RawQuote>, ProviderError> {
        match tokio::time::timeout(self.fetch_timeout, self.provider.fetch_quotes(codes)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "{} codes exceeded {:?}",
                codes.len(),
                self.fetch_timeout
            ))),
        }
    }

    /// Fetch every chunk, keeping whatever parsed. Never fails as a whole.
    async fn fetch_all(&self, codes: &[String]) -> Vec<RawQuote> {
        let chunks: Vec<&[String]> = codes.chunks(self.chunk_size).collect();
        let results = join_all(chunks.iter().map(|chunk| self.fetch_chunk(chunk))).await;

        let mut quotes = Vec::new();
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(mut batch) => quotes.append(&mut batch),
                Err(e) => {
                    warn!(
                        provider = self.provider.name(),
                        chunk = index,
                        size = chunks[index].len(),
                        error = %e,
                        recoverable = e.is_recoverable(),
                        "Quote chunk failed, skipping"
                    );
                }
            }
        }
        quotes
    }

    /// Resolve the latest price for each symbol.
    ///
    /// Symbols that cannot be resolved are omitted. A zero price falls back to
    /// the prior close from the same line.
    pub async fn batch_quote<S: AsRef<str>>(&self, symbols: &[S]) -> HashMap<String, f64> {
        let unique: BTreeSet<&str> = symbols
            .iter()
            .map(|s| s.as_ref().trim())
            .filter(|s| !s.is_empty())
            .collect();

        if unique.is_empty() {
            return HashMap::new();
        }

        let codes: Vec<String> = unique.iter().map(|s| self.provider.provider_code(s)).collect();
        let started = std::time::Instant::now();

        let mut prices = HashMap::with_capacity(codes.len());
        for raw in self.fetch_all(&codes).await {
            let symbol = raw.symbol();
            if !unique.contains(symbol) {
                debug!(code = %raw.code, "Quote for unrequested code, ignoring");
                continue;
            }
            match raw.effective_price() {
                Some(price) => {
                    prices.insert(symbol.to_string(), price);
                }
                None => debug!(symbol = symbol, "No usable price, omitting"),
            }
        }

        info!(
            requested = unique.len(),
            resolved = prices.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Batch quote complete"
        );

        prices
    }

    /// Full quote for one symbol, `None` when it cannot be resolved.
    pub async fn quote(&self, symbol: &str) -> Option<Quote> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return None;
        }

        let code = self.provider.provider_code(symbol);
        match self.fetch_chunk(std::slice::from_ref(&code)).await {
            Ok(quotes) => quotes
                .iter()
                .find(|q| q.code == code)
                .and_then(Quote::from_raw),
            Err(e) => {
                warn!(symbol = symbol, error = %e, "Quote fetch failed");
                None
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
