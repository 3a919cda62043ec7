//! HTTP routes for the screener service.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::data::Quote;
use crate::error::ScreenError;
use crate::indicators::IndicatorSnapshot;
use crate::screener::{ScreenerResult, ScreeningCriteria};
use crate::ScreenerState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
}

#[derive(Debug, Serialize)]
pub struct IndicatorsResponse {
    pub symbol: String,
    pub indicators: IndicatorSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct QuotesRequest {
    #[serde(default)]
    pub symbols: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct QuotesResponse {
    pub prices: HashMap<String, f64>,
    pub count: usize,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: "zero-screener".to_string(),
    })
}

/// Run a screening pass
pub async fn screen(
    State(state): State<Arc<ScreenerState>>,
    Json(criteria): Json<ScreeningCriteria>,
) -> Result<Json<ScreenerResult>, ScreenError> {
    let result = state.engine.screen(criteria).await?;
    Ok(Json(result))
}

/// Indicator snapshot for one symbol, rounded for display
pub async fn get_indicators(
    State(state): State<Arc<ScreenerState>>,
    Path(symbol): Path<String>,
) -> Json<IndicatorsResponse> {
    let indicators = state.technical.compute_indicators(&symbol).await.rounded();
    Json(IndicatorsResponse { symbol, indicators })
}

/// Latest price for each requested symbol
pub async fn batch_quotes(
    State(state): State<Arc<ScreenerState>>,
    Json(request): Json<QuotesRequest>,
) -> Json<QuotesResponse> {
    let prices = state.quotes.batch_quote(&request.symbols).await;
    let count = prices.len();

    Json(QuotesResponse { prices, count })
}

/// Full quote for one symbol
pub async fn get_quote(
    State(state): State<Arc<ScreenerState>>,
    Path(symbol): Path<String>,
) -> Result<Json<Quote>, ScreenError> {
    state
        .quotes
        .quote(&symbol)
        .await
        .map(Json)
        .ok_or(ScreenError::NotFound(format!("no quote for {}", symbol)))
}
