use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recorded market price for a ticker at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub ticker: String,
    pub observed_at: DateTime<Utc>,
    pub price: f64,
    /// Feed that produced the observation (e.g. "yahoo", "tmx").
    pub source: String,
}

impl PriceObservation {
    pub fn new(ticker: &str, observed_at: DateTime<Utc>, price: f64, source: &str) -> Self {
        Self {
            ticker: ticker.trim().to_uppercase(),
            observed_at,
            price,
            source: source.to_string(),
        }
    }

    /// Whether the observation can be stored: a ticker and a positive finite price.
    pub fn is_valid(&self) -> bool {
        !self.ticker.trim().is_empty() && self.price.is_finite() && self.price > 0.0
    }
}
