//! Zero Screener Library
//!
//! Short-term A-share stock screening and technical indicators.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    zero-screener (Rust Service)                     │
//! │                           :4436                                      │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐     │
//! │  │  Screener       │  │  Technical      │  │  Batch Quote    │     │
//! │  │  Engine         │  │  Analyzer       │  │  Service        │     │
//! │  └────────┬────────┘  └────────┬────────┘  └────────┬────────┘     │
//! │           │                    │                    │               │
//! │  ┌────────┴────────────────────┴──────┐  ┌─────────┴────────┐      │
//! │  │  eastmoney (snapshot + kline)      │  │  sina (hq)       │      │
//! │  └────────────────────────────────────┘  └──────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! ## Screening funnel
//! - Drop ST / delisting names, apply snapshot bounds
//! - Pool the top 30 by change, evaluate at most 5 at a time
//! - Return at most 10, by change descending
//!
//! ## Indicators
//! - MA, EMA, MACD(12,26,9), Bollinger(20,2), RSI(6), KDJ(9,3,3)
//! - Short histories yield zeros, never errors

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod data;
pub mod error;
pub mod indicators;
pub mod quotes;
pub mod routes;
pub mod screener;
pub mod technical;

pub use error::ScreenError;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use zero_common::config::Config;

use crate::data::{
    CachedHistoryProvider, EastmoneyAdapter, HistoryProvider, QuoteProvider, SinaQuoteAdapter,
    SnapshotProvider,
};
use crate::quotes::{BatchQuoteService, DEFAULT_CHUNK_SIZE};
use crate::screener::{ScreenerConfig, ScreenerEngine};
use crate::technical::TechnicalAnalyzer;

/// Request bodies are small JSON documents.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Upper bound for any request, a full screening run included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Default history cache TTL.
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Screener service state
pub struct ScreenerState {
    /// Configuration
    pub config: Config,
    /// Screening engine
    pub engine: Arc<ScreenerEngine>,
    /// Batch quote helper
    pub quotes: Arc<BatchQuoteService>,
    /// Technical analyzer
    pub technical: Arc<TechnicalAnalyzer>,
}

impl ScreenerState {
    /// Create state backed by the eastmoney and sina adapters.
    pub fn new(config: Config) -> Self {
        let service = config.screener();
        let eastmoney = Arc::new(EastmoneyAdapter::from_config(&service));
        let sina = Arc::new(SinaQuoteAdapter::from_config(&service));

        Self::with_providers(config, eastmoney.clone(), eastmoney, sina)
    }

    /// Create state over explicit providers.
    ///
    /// History is wrapped in the read-through cache unless the TTL is 0.
    pub fn with_providers(
        config: Config,
        snapshot: Arc<dyn SnapshotProvider>,
        history: Arc<dyn HistoryProvider>,
        quote_provider: Arc<dyn QuoteProvider>,
    ) -> Self {
        let service = config.screener();
        let screener_config = ScreenerConfig::from_service_config(&service);

        let ttl = service.history_cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS);
        let history: Arc<dyn HistoryProvider> = if ttl > 0 {
            Arc::new(CachedHistoryProvider::new(history, ttl))
        } else {
            history
        };

        let technical = Arc::new(TechnicalAnalyzer::new(
            Arc::clone(&history),
            screener_config.history_lookback_days,
            screener_config.fetch_timeout,
        ));

        let quotes = Arc::new(
            BatchQuoteService::new(quote_provider)
                .with_chunk_size(service.quote_chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE))
                .with_timeout(screener_config.fetch_timeout),
        );

        let engine = Arc::new(ScreenerEngine::new(screener_config, snapshot, history));

        Self {
            config,
            engine,
            quotes,
            technical,
        }
    }
}

/// Build the router with all routes and middleware.
pub fn build_router(state: Arc<ScreenerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/v1/screen", post(routes::screen))
        .route("/api/v1/indicators/:symbol", get(routes::get_indicators))
        .route("/api/v1/quotes", post(routes::batch_quotes))
        .route("/api/v1/quote/:symbol", get(routes::get_quote))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(cors)
        .with_state(state)
}

/// Main screener service
pub struct ScreenerService {
    state: Arc<ScreenerState>,
}

impl ScreenerService {
    /// Create a new screener service
    pub fn new(config: Config) -> Self {
        let state = Arc::new(ScreenerState::new(config));
        Self { state }
    }

    /// Start the screener service
    pub async fn start(self) -> Result<()> {
        let host = self.state.config.screener_host().to_string();
        let port = self.state.config.screener_port();

        let app = build_router(self.state.clone());

        let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
        tracing::info!(address = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
