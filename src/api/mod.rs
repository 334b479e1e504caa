pub mod backtest;
pub mod health;
pub mod prices;
pub mod signals;

use crate::AppState;
use axum::Router;
use serde::Serialize;

/// API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub meta: ApiMeta,
}

#[derive(Debug, Serialize)]
pub struct ApiMeta {
    /// Unix ms at which the payload was computed.
    pub generated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl ApiMeta {
    fn simple() -> Self {
        Self {
            generated_at: chrono::Utc::now().timestamp_millis(),
            skip: None,
            limit: None,
            count: None,
        }
    }

    fn with_page(skip: usize, limit: usize, count: usize) -> Self {
        Self {
            skip: Some(skip),
            limit: Some(limit),
            count: Some(count),
            ..Self::simple()
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            meta: ApiMeta::simple(),
        }
    }

    pub fn paged(data: T, skip: usize, limit: usize, count: usize) -> Self {
        Self {
            data,
            meta: ApiMeta::with_page(skip, limit, count),
        }
    }
}

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/backtest", backtest::router())
        .nest("/api/signals", signals::router())
        .nest("/api/prices", prices::router())
}
