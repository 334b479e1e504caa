//! Signal intake API
//!
//! - POST /api/signals - Submit a signal (validated)
//! - GET /api/signals - List signals, newest first
//! - GET /api/signals/:id - Get one signal

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::ApiResponse;
use crate::error::{AppError, Result};
use crate::types::{NewSignal, Signal};
use crate::AppState;

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct ListSignalsQuery {
    pub ticker: Option<String>,
    pub limit: Option<usize>,
}

/// Create signals router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_signals).post(create_signal))
        .route("/:id", get(get_signal))
}

async fn create_signal(
    State(state): State<AppState>,
    Json(body): Json<NewSignal>,
) -> Result<(StatusCode, Json<ApiResponse<Signal>>)> {
    let valid = body.validate()?;
    let signal = state.store.insert_signal(&valid)?;
    tracing::info!(
        "Accepted signal {} ({} {} @ {:.2})",
        signal.id,
        signal.ticker,
        signal.direction.as_str(),
        signal.confidence
    );
    Ok((StatusCode::CREATED, Json(ApiResponse::new(signal))))
}

async fn list_signals(
    State(state): State<AppState>,
    Query(query): Query<ListSignalsQuery>,
) -> Result<Json<ApiResponse<Vec<Signal>>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let ticker = query.ticker.as_deref().filter(|t| !t.trim().is_empty());
    let signals = state.store.list_signals(ticker, limit)?;
    Ok(Json(ApiResponse::new(signals)))
}

async fn get_signal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Signal>>> {
    let signal = state
        .store
        .get_signal(id)?
        .ok_or_else(|| AppError::NotFound(format!("Signal {} not found", id)))?;
    Ok(Json(ApiResponse::new(signal)))
}
