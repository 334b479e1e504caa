use signal_backtest::api;
use signal_backtest::config::{Config, LogFormat};
use signal_backtest::services::SqliteStore;
use signal_backtest::AppState;

use chrono::Utc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env();
    init_tracing(config.log_format);
    info!("Starting signal backtest server on {}:{}", config.host, config.port);

    let store = SqliteStore::new(&config.database_path)?;
    info!("Using database {}", config.database_path);

    let addr = format!("{}:{}", config.host, config.port);
    let interval_secs = config.backtest_interval_secs;
    let state = AppState::new(config, store);

    // Scheduled backtest runs
    if interval_secs > 0 {
        let runner = state.runner.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(interval_secs)).await;

                let runner = runner.clone();
                match tokio::task::spawn_blocking(move || runner.run(Utc::now())).await {
                    Ok(Ok(report)) => info!(
                        "Scheduled backtest {}: {} tested, {} created",
                        report.run_id, report.signals_tested, report.results_created
                    ),
                    Ok(Err(e)) => error!("Scheduled backtest failed: {}", e),
                    Err(e) => error!("Scheduled backtest task panicked: {}", e),
                }
            }
        });
        info!("Scheduled backtests every {}s", interval_secs);
    } else {
        info!("Scheduled backtests disabled");
    }

    // Build router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api::router()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "signal_backtest=debug,tower_http=debug".into());

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}
