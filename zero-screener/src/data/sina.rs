//! Sina real-time quote adapter.
//!
//! Response format, one line per requested code:
//!
//! ```text
//! var hq_str_sh600000="浦发银行,10.50,10.45,10.62,10.70,10.40,...";
//! ```
//!
//! Fields: name, open, prev_close, price, high, low, bid, ask, volume, amount, ...

use async_trait::async_trait;
use encoding_rs::GBK;
use std::time::Duration;
use tracing::debug;

use super::provider::{ProviderError, QuoteProvider};
use super::RawQuote;

/// Sina quote endpoint
pub const SINA_QUOTE_URL: &str = "http://hq.sinajs.cn";

/// Sina rejects requests without a finance.sina.com.cn referer.
const SINA_REFERER: &str = "http://finance.sina.com.cn";

/// Minimum fields needed to build a quote.
const MIN_FIELDS: usize = 6;

/// Map an exchange-local code to a sina code by its leading digit.
///
/// `6`/`5` -> Shanghai, `8`/`4`/`9` -> Beijing, everything else -> Shenzhen.
pub fn to_sina_code(symbol: &str) -> String {
    let code = symbol.trim();
    let prefix = match code.chars().next() {
        Some('6') | Some('5') => "sh",
        Some('8') | Some('4') | Some('9') => "bj",
        _ => "sz",
    };
    format!("{}{}", prefix, code)
}

/// Parse a sina response body. Malformed or empty lines are skipped.
pub fn parse_quote_lines(body: &str) -> Vec<RawQuote> {
    body.lines().filter_map(parse_quote_line).collect()
}

fn parse_quote_line(line: &str) -> Option<RawQuote> {
    let (lhs, rhs) = line.split_once("=\"")?;
    let code = lhs.rsplit("hq_str_").next()?.trim();
    let payload = rhs.trim().trim_end_matches(';').trim_end_matches('"');

    let fields: Vec<&str> = payload.split(',').collect();
    if code.is_empty() || fields.len() < MIN_FIELDS {
        debug!(code = code, "Empty or short quote line, skipping");
        return None;
    }

    let num = |i: usize| fields[i].trim().parse::<f64>().ok();
    let quote = (|| {
        Some(RawQuote {
            code: code.to_string(),
            name: fields[0].trim().to_string(),
            open: num(1)?,
            prev_close: num(2)?,
            price: num(3)?,
            high: num(4)?,
            low: num(5)?,
        })
    })();

    if quote.is_none() {
        debug!(code = code, "Unparseable quote line, skipping");
    }
    quote
}

/// Batch quote adapter for hq.sinajs.cn.
pub struct SinaQuoteAdapter {
    client: reqwest::Client,
    quote_url: String,
}

impl SinaQuoteAdapter {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            quote_url: SINA_QUOTE_URL.to_string(),
        }
    }

    /// Override the endpoint (proxies, test servers).
    pub fn with_url(mut self, quote_url: impl Into<String>) -> Self {
        self.quote_url = quote_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Create from the screener service config.
    pub fn from_config(config: &zero_common::ScreenerServiceConfig) -> Self {
        let timeout = Duration::from_secs(config.fetch_timeout_secs.unwrap_or(10).clamp(1, 60));
        let adapter = Self::new(timeout);
        match &config.quote_url {
            Some(url) => adapter.with_url(url.clone()),
            None => adapter,
        }
    }
}

#[async_trait]
impl QuoteProvider for SinaQuoteAdapter {
    fn name(&self) -> &'static str {
        "sina"
    }

    fn provider_code(&self, symbol: &str) -> String {
        to_sina_code(symbol)
    }

    async fn fetch_quotes(&self, codes: &[String]) -> Result<Vec<RawQuote>, ProviderError> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/list={}", self.quote_url, codes.join(","));

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::REFERER, SINA_REFERER)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Network(format!("HTTP {}", response.status())));
        }

        // Body is GBK; only the name field is non-ASCII.
        let bytes = response.bytes().await?;
        let (body, _, had_errors) = GBK.decode(&bytes);
        if had_errors {
            debug!(codes = codes.len(), "Quote body had invalid GBK sequences");
        }

        Ok(parse_quote_lines(&body))
    }
}

// ============================================================================
// Tests
// ============================================================================
