use std::env;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// SQLite database file.
    pub database_path: String,
    /// Maximum distance (hours) between a target instant and the price used for it.
    pub price_tolerance_hours: i64,
    /// Seconds between scheduled backtest runs (0 = disabled).
    pub backtest_interval_secs: u64,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup. Missing or unparseable values
    /// fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            database_path: lookup("DATABASE_PATH")
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(defaults.database_path),
            price_tolerance_hours: lookup("PRICE_TOLERANCE_HOURS")
                .and_then(|v| v.parse().ok())
                .filter(|h: &i64| *h >= 0)
                .unwrap_or(defaults.price_tolerance_hours),
            backtest_interval_secs: lookup("BACKTEST_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.backtest_interval_secs),
            log_format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::from_str(&v))
                .unwrap_or(defaults.log_format),
        }
    }

    pub fn price_tolerance(&self) -> chrono::Duration {
        chrono::Duration::hours(self.price_tolerance_hours)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            database_path: "signal_backtest.db".to_string(),
            // Covers a weekend plus a single-day holiday on daily data.
            price_tolerance_hours: 72,
            // 30 minutes
            backtest_interval_secs: 1800,
            log_format: LogFormat::Pretty,
        }
    }
}
