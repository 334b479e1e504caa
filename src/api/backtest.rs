//! Backtest API
//!
//! Runs:
//! - POST /api/backtest/run - Run backtests now
//! - GET /api/backtest/runs - List active run ids
//! - POST /api/backtest/runs/:run_id/cancel - Cancel an active run
//!
//! Accuracy:
//! - GET /api/backtest/summary - Accuracy summary over all results
//! - GET /api/backtest/trend - Weekly accuracy trend
//!
//! Results:
//! - GET /api/backtest/results - List results (newest signal first)
//! - GET /api/backtest/results/:signal_id - Result for one signal

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::ApiResponse;
use crate::error::{AppError, Result};
use crate::services::aggregator;
use crate::types::{AccuracySummary, BacktestResult, RunReport, WeeklyAccuracy};
use crate::AppState;

pub const DEFAULT_RESULTS_LIMIT: usize = 50;
pub const MAX_RESULTS_LIMIT: usize = 200;

/// Create backtest router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/run", post(run_backtests))
        .route("/runs", get(list_runs))
        .route("/runs/:run_id/cancel", post(cancel_run))
        .route("/summary", get(get_summary))
        .route("/trend", get(get_trend))
        .route("/results", get(list_results))
        .route("/results/:signal_id", get(get_result))
}

// =============================================================================
// Query Parameters
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListResultsQuery {
    pub ticker: Option<String>,
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_RESULTS_LIMIT
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub run_id: String,
    pub cancelled: bool,
}

// =============================================================================
// Runs
// =============================================================================

async fn run_backtests(State(state): State<AppState>) -> Result<Json<ApiResponse<RunReport>>> {
    let runner = state.runner.clone();
    let report = tokio::task::spawn_blocking(move || runner.run(Utc::now()))
        .await
        .map_err(|e| AppError::Internal(format!("Backtest task failed: {}", e)))??;
    Ok(Json(ApiResponse::new(report)))
}

async fn list_runs(State(state): State<AppState>) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse::new(state.runner.active_runs()))
}

async fn cancel_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<ApiResponse<CancelResponse>>> {
    if !state.runner.cancel(&run_id) {
        return Err(AppError::NotFound(format!("Run {} is not active", run_id)));
    }
    tracing::info!("Cancellation requested for backtest {}", run_id);
    Ok(Json(ApiResponse::new(CancelResponse {
        run_id,
        cancelled: true,
    })))
}

// =============================================================================
// Accuracy
// =============================================================================

async fn get_summary(State(state): State<AppState>) -> Result<Json<ApiResponse<AccuracySummary>>> {
    let rows = state.store.scored_results()?;
    Ok(Json(ApiResponse::new(aggregator::summarize(&rows))))
}

async fn get_trend(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<WeeklyAccuracy>>>> {
    let rows = state.store.scored_results()?;
    Ok(Json(ApiResponse::new(aggregator::weekly_trend(&rows))))
}

// =============================================================================
// Results
// =============================================================================

async fn list_results(
    State(state): State<AppState>,
    Query(query): Query<ListResultsQuery>,
) -> Result<Json<ApiResponse<Vec<BacktestResult>>>> {
    if query.limit == 0 || query.limit > MAX_RESULTS_LIMIT {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_RESULTS_LIMIT
        )));
    }
    if i64::try_from(query.skip).is_err() {
        return Err(AppError::BadRequest(format!(
            "skip must be at most {}",
            i64::MAX
        )));
    }

    let ticker = query.ticker.as_deref().filter(|t| !t.trim().is_empty());
    let results = state
        .store
        .list_backtest_results(ticker, query.skip, query.limit)?;
    let count = results.len();
    Ok(Json(ApiResponse::paged(results, query.skip, query.limit, count)))
}

async fn get_result(
    State(state): State<AppState>,
    Path(signal_id): Path<i64>,
) -> Result<Json<ApiResponse<BacktestResult>>> {
    let result = state
        .store
        .get_backtest_result(signal_id)?
        .ok_or_else(|| AppError::NotFound(format!("No backtest result for signal {}", signal_id)))?;
    Ok(Json(ApiResponse::new(result)))
}
