use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    /// "ok" when the result table can be read.
    database: &'static str,
    active_runs: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.store.result_count() {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!("Health check database read failed: {}", e);
            "error"
        }
    };

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        database,
        active_runs: state.runner.active_runs().len(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/health", get(health))
}
