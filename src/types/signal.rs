use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Predicted price direction of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }

    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// Sentiment label attached by the upstream extraction pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

/// Why a signal was refused by the backtest engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalRejection {
    #[error("signal has no ticker")]
    MissingTicker,
    #[error("signal has no direction")]
    MissingDirection,
    #[error("unknown direction '{0}', expected 'up' or 'down'")]
    UnknownDirection(String),
    #[error("signal has no confidence")]
    MissingConfidence,
    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),
    #[error("unknown sentiment '{0}'")]
    UnknownSentiment(String),
    #[error("signal has no valid creation time")]
    MissingCreatedAt,
}

/// A finalized directional prediction for one stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: i64,
    pub ticker: String,
    pub direction: Direction,
    /// Model confidence in [0, 1].
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// A signal row as written by the upstream pipeline, before validation.
///
/// Upstream leaves any of these columns empty or mistyped, so everything
/// except the id is optional here.
#[derive(Debug, Clone, Default)]
pub struct SignalRecord {
    pub id: i64,
    pub ticker: Option<String>,
    pub direction: Option<String>,
    pub confidence: Option<f64>,
    pub created_at: Option<DateTime<Utc>>,
    pub sector: Option<String>,
    pub sentiment: Option<String>,
    pub reasoning: Option<String>,
}

impl TryFrom<SignalRecord> for Signal {
    type Error = SignalRejection;

    fn try_from(record: SignalRecord) -> Result<Self, Self::Error> {
        let ticker = normalize_ticker(record.ticker.as_deref())?;
        let direction = parse_direction(record.direction.as_deref())?;
        let confidence = check_confidence(record.confidence)?;
        let created_at = record.created_at.ok_or(SignalRejection::MissingCreatedAt)?;

        Ok(Signal {
            id: record.id,
            ticker,
            direction,
            confidence,
            created_at,
            sector: non_empty(record.sector),
            // Stored labels outside the known set are dropped rather than rejected.
            sentiment: record.sentiment.as_deref().and_then(Sentiment::from_str),
            reasoning: non_empty(record.reasoning),
        })
    }
}

/// Request body for submitting a signal.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSignal {
    pub ticker: String,
    pub direction: String,
    pub confidence: f64,
    /// Defaults to the time of submission.
    pub created_at: Option<DateTime<Utc>>,
    pub sector: Option<String>,
    pub sentiment: Option<String>,
    pub reasoning: Option<String>,
}

/// A submitted signal that passed validation, ready to store.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSignal {
    pub ticker: String,
    pub direction: Direction,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub sector: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub reasoning: Option<String>,
}

impl NewSignal {
    /// Validate against the same rules applied to stored records.
    pub fn validate(self) -> Result<ValidSignal, SignalRejection> {
        let ticker = normalize_ticker(Some(&self.ticker))?;
        let direction = parse_direction(Some(&self.direction))?;
        let confidence = check_confidence(Some(self.confidence))?;
        let sentiment = match non_empty(self.sentiment) {
            Some(label) => Some(
                Sentiment::from_str(&label).ok_or(SignalRejection::UnknownSentiment(label))?,
            ),
            None => None,
        };

        Ok(ValidSignal {
            ticker,
            direction,
            confidence,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            sector: non_empty(self.sector),
            sentiment,
            reasoning: non_empty(self.reasoning),
        })
    }
}

fn normalize_ticker(ticker: Option<&str>) -> Result<String, SignalRejection> {
    match ticker.map(str::trim) {
        Some(t) if !t.is_empty() => Ok(t.to_uppercase()),
        _ => Err(SignalRejection::MissingTicker),
    }
}

fn parse_direction(direction: Option<&str>) -> Result<Direction, SignalRejection> {
    let raw = match direction.map(str::trim) {
        Some(d) if !d.is_empty() => d,
        _ => return Err(SignalRejection::MissingDirection),
    };
    Direction::from_str(raw).ok_or_else(|| SignalRejection::UnknownDirection(raw.to_string()))
}

fn check_confidence(confidence: Option<f64>) -> Result<f64, SignalRejection> {
    let value = confidence.ok_or(SignalRejection::MissingConfidence)?;
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(SignalRejection::ConfidenceOutOfRange(value))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
