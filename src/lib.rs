//! Signal Backtest - directional accuracy validation for stock signals

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod types;

use config::Config;
use services::{BacktestRunner, RunnerSettings, SqliteStore, StoreError};
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<SqliteStore>,
    pub runner: Arc<BacktestRunner>,
}

impl AppState {
    /// Wire the runner to read prices from the same store it writes results to.
    pub fn new(config: Config, store: SqliteStore) -> Self {
        let store = Arc::new(store);
        let runner = Arc::new(BacktestRunner::new(
            store.clone(),
            store.clone(),
            RunnerSettings {
                price_tolerance: config.price_tolerance(),
            },
        ));

        Self {
            config: Arc::new(config),
            store,
            runner,
        }
    }

    /// State over an in-memory store with default settings.
    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(Config::default(), SqliteStore::new_in_memory()?))
    }
}

// Re-export commonly used types
pub use types::*;
