use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::signal::Direction;

/// Look-ahead window used to measure a signal's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Horizon {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
}

impl Horizon {
    pub const ALL: [Horizon; 3] = [Horizon::OneDay, Horizon::SevenDays, Horizon::ThirtyDays];

    /// Calendar days between the signal and the horizon.
    pub fn days(&self) -> i64 {
        match self {
            Self::OneDay => 1,
            Self::SevenDays => 7,
            Self::ThirtyDays => 30,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::SevenDays => "7d",
            Self::ThirtyDays => "30d",
        }
    }

    /// Instant at which this horizon is measured for a signal issued at `from`.
    pub fn target(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        from + chrono::Duration::days(self.days())
    }
}

/// Resolved outcome of one signal at one horizon.
///
/// The price, change and accuracy are only ever present together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizonOutcome {
    /// Price observed at the horizon.
    pub price: f64,
    /// Percent change from the signal price, rounded to 2 decimals.
    pub change_pct: f64,
    /// Whether the move matched the predicted direction.
    pub accurate: bool,
}

/// Outcome of evaluating one signal against subsequent prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub signal_id: i64,
    pub ticker: String,
    pub signal_date: DateTime<Utc>,
    /// Direction copied from the signal at first evaluation.
    pub direction_predicted: Direction,
    pub price_at_signal: f64,
    /// `null` while pending.
    pub outcome_1d: Option<HorizonOutcome>,
    pub outcome_7d: Option<HorizonOutcome>,
    pub outcome_30d: Option<HorizonOutcome>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BacktestResult {
    /// Create a result with every horizon pending.
    pub fn new(
        signal_id: i64,
        ticker: String,
        signal_date: DateTime<Utc>,
        direction_predicted: Direction,
        price_at_signal: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            signal_id,
            ticker,
            signal_date,
            direction_predicted,
            price_at_signal,
            outcome_1d: None,
            outcome_7d: None,
            outcome_30d: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn outcome(&self, horizon: Horizon) -> Option<&HorizonOutcome> {
        match horizon {
            Horizon::OneDay => self.outcome_1d.as_ref(),
            Horizon::SevenDays => self.outcome_7d.as_ref(),
            Horizon::ThirtyDays => self.outcome_30d.as_ref(),
        }
    }

    /// Fill a pending horizon. Returns false, leaving the result untouched,
    /// if the horizon was already resolved.
    pub fn resolve(&mut self, horizon: Horizon, outcome: HorizonOutcome) -> bool {
        let slot = match horizon {
            Horizon::OneDay => &mut self.outcome_1d,
            Horizon::SevenDays => &mut self.outcome_7d,
            Horizon::ThirtyDays => &mut self.outcome_30d,
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(outcome);
        true
    }

    /// Accuracy at a horizon, `None` while pending.
    pub fn accurate(&self, horizon: Horizon) -> Option<bool> {
        self.outcome(horizon).map(|o| o.accurate)
    }

    pub fn pending_horizons(&self) -> Vec<Horizon> {
        Horizon::ALL
            .into_iter()
            .filter(|h| self.outcome(*h).is_none())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        Horizon::ALL.iter().all(|h| self.outcome(*h).is_some())
    }

    pub fn resolved_count(&self) -> usize {
        Horizon::ALL
            .iter()
            .filter(|h| self.outcome(**h).is_some())
            .count()
    }
}

/// Counters returned by a backtest run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    /// Eligible signals examined in this run.
    pub signals_tested: usize,
    /// Signals that got a new result row or at least one newly resolved horizon.
    pub signals_evaluated: usize,
    /// New result rows written.
    pub results_created: usize,
    pub horizons_resolved: usize,
    /// Signals refused because of invalid data.
    pub signals_skipped: usize,
    /// Signals with no usable price at signal time yet.
    pub signals_unpriced: usize,
    /// Signals held by an overlapping run.
    pub signals_busy: usize,
    /// Signals whose lookup or write failed.
    pub failures: usize,
    pub cancelled: bool,
}

/// Correct/resolved counts with the derived percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizonAccuracy {
    pub correct: u32,
    pub resolved: u32,
    /// Rounded percentage, `null` when nothing is resolved (N/A, not 0%).
    pub accuracy_pct: Option<u32>,
}

impl HorizonAccuracy {
    pub fn record(&mut self, accurate: Option<bool>) {
        if let Some(accurate) = accurate {
            self.resolved += 1;
            if accurate {
                self.correct += 1;
            }
        }
        self.accuracy_pct = accuracy_pct(self.correct, self.resolved);
    }
}

/// Percentage of correct outcomes, rounded to the nearest integer.
pub fn accuracy_pct(correct: u32, resolved: u32) -> Option<u32> {
    if resolved == 0 {
        return None;
    }
    Some((correct as f64 / resolved as f64 * 100.0).round() as u32)
}

/// Accuracy for each horizon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizonBreakdown {
    #[serde(rename = "1d")]
    pub one_day: HorizonAccuracy,
    #[serde(rename = "7d")]
    pub seven_days: HorizonAccuracy,
    #[serde(rename = "30d")]
    pub thirty_days: HorizonAccuracy,
}

impl HorizonBreakdown {
    pub fn get(&self, horizon: Horizon) -> &HorizonAccuracy {
        match horizon {
            Horizon::OneDay => &self.one_day,
            Horizon::SevenDays => &self.seven_days,
            Horizon::ThirtyDays => &self.thirty_days,
        }
    }

    /// Tally every horizon of one result.
    pub fn record(&mut self, result: &BacktestResult) {
        self.one_day.record(result.accurate(Horizon::OneDay));
        self.seven_days.record(result.accurate(Horizon::SevenDays));
        self.thirty_days.record(result.accurate(Horizon::ThirtyDays));
    }
}

/// Accuracy for one sector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorAccuracy {
    pub total: u32,
    pub accuracy: HorizonBreakdown,
}

/// Accuracy for one calendar week (Sunday start).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyAccuracy {
    pub week_start: NaiveDate,
    pub total: u32,
    pub accuracy: HorizonBreakdown,
}

/// Aggregate accuracy over all backtest results, recomputed on every read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracySummary {
    pub total_signals_tested: u32,
    pub accuracy: HorizonBreakdown,
    pub by_sector: BTreeMap<String, SectorAccuracy>,
    pub weekly: Vec<WeeklyAccuracy>,
    /// Mean confidence of signals with at least one resolved horizon.
    pub avg_confidence: Option<f64>,
}

/// A backtest result joined with the attributes of its originating signal.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredResult {
    pub result: BacktestResult,
    pub sector: Option<String>,
    pub confidence: Option<f64>,
}
