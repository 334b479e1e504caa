//! Price observation API
//!
//! - POST /api/prices - Record a batch of observations
//! - GET /api/prices/latest - Freshest observation per ticker
//! - GET /api/prices/:ticker?from=&to= - Observations in a time window

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ApiResponse;
use crate::error::{AppError, Result};
use crate::services::quotes::latest_quotes;
use crate::types::PriceObservation;
use crate::AppState;

/// Window used when `from` is omitted.
const DEFAULT_LOOKBACK_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct PriceWindowQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct PriceBatch {
    pub observations: Vec<PriceObservation>,
}

#[derive(Debug, Serialize)]
pub struct IngestSummary {
    pub received: usize,
    pub stored: usize,
    /// Already present for the same ticker, time and source.
    pub duplicates: usize,
}

/// Create prices router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(record_prices))
        .route("/latest", get(get_latest))
        .route("/:ticker", get(get_prices))
}

async fn record_prices(
    State(state): State<AppState>,
    Json(batch): Json<PriceBatch>,
) -> Result<(StatusCode, Json<ApiResponse<IngestSummary>>)> {
    let observations: Vec<PriceObservation> = batch
        .observations
        .into_iter()
        .map(|o| PriceObservation::new(&o.ticker, o.observed_at, o.price, &o.source))
        .collect();

    if let Some((index, bad)) = observations.iter().enumerate().find(|(_, o)| !o.is_valid()) {
        return Err(AppError::BadRequest(format!(
            "observation {} is invalid: ticker '{}', price {}",
            index, bad.ticker, bad.price
        )));
    }

    let stored = state.store.insert_prices(&observations)?;
    let received = observations.len();
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(IngestSummary {
            received,
            stored,
            duplicates: received - stored,
        })),
    ))
}

async fn get_prices(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(query): Query<PriceWindowQuery>,
) -> Result<Json<ApiResponse<Vec<PriceObservation>>>> {
    let to = query.to.unwrap_or_else(Utc::now);
    let from = query
        .from
        .unwrap_or_else(|| to - Duration::days(DEFAULT_LOOKBACK_DAYS));
    if from > to {
        return Err(AppError::BadRequest("'from' must not be after 'to'".to_string()));
    }

    let prices = state.store.prices_for(&ticker, from, to)?;
    Ok(Json(ApiResponse::new(prices)))
}

async fn get_latest(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<BTreeMap<String, PriceObservation>>>> {
    let quotes = latest_quotes(state.store.all_prices()?);
    Ok(Json(ApiResponse::new(quotes)))
}
