//! Nearest-in-time price lookup for a ticker.

use crate::services::sqlite_store::StoreError;
use crate::types::PriceObservation;
use chrono::{DateTime, Duration, Utc};

/// Read-only access to recorded price observations.
pub trait PriceSource: Send + Sync {
    /// Observations for `ticker` with `start <= observed_at <= end`.
    fn observations_between(
        &self,
        ticker: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceObservation>, StoreError>;
}

/// Pick the observation closest to `target` within `tolerance`.
///
/// Equidistant observations resolve to the earlier one.
pub fn closest_observation<'a, I>(
    observations: I,
    target: DateTime<Utc>,
    tolerance: Duration,
) -> Option<&'a PriceObservation>
where
    I: IntoIterator<Item = &'a PriceObservation>,
{
    observations
        .into_iter()
        .map(|obs| ((obs.observed_at - target).abs(), obs))
        .filter(|(distance, _)| *distance <= tolerance)
        .min_by(|(da, a), (db, b)| da.cmp(db).then(a.observed_at.cmp(&b.observed_at)))
        .map(|(_, obs)| obs)
}

/// Resolves "the price at approximately this time" against a [`PriceSource`].
#[derive(Debug, Clone, Copy)]
pub struct PriceResolver {
    tolerance: Duration,
}

impl PriceResolver {
    pub fn new(tolerance: Duration) -> Self {
        Self {
            tolerance: tolerance.abs(),
        }
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    /// Closest observation to `target`, or `None` when nothing lies within
    /// tolerance. Only a failing source is an error.
    pub fn resolve(
        &self,
        source: &dyn PriceSource,
        ticker: &str,
        target: DateTime<Utc>,
    ) -> Result<Option<PriceObservation>, StoreError> {
        self.lookup(source, ticker, target, None)
    }

    /// Like [`resolve`](Self::resolve), but only observations strictly after
    /// `after` qualify.
    pub fn resolve_after(
        &self,
        source: &dyn PriceSource,
        ticker: &str,
        target: DateTime<Utc>,
        after: DateTime<Utc>,
    ) -> Result<Option<PriceObservation>, StoreError> {
        self.lookup(source, ticker, target, Some(after))
    }

    fn lookup(
        &self,
        source: &dyn PriceSource,
        ticker: &str,
        target: DateTime<Utc>,
        after: Option<DateTime<Utc>>,
    ) -> Result<Option<PriceObservation>, StoreError> {
        let ticker = ticker.trim();
        if ticker.is_empty() {
            return Ok(None);
        }

        let end = target + self.tolerance;
        let mut start = target - self.tolerance;
        if let Some(after) = after {
            if after >= end {
                return Ok(None);
            }
            start = start.max(after);
        }

        let window = source.observations_between(ticker, start, end)?;
        let candidates = window
            .iter()
            .filter(|obs| after.map_or(true, |after| obs.observed_at > after));
        Ok(closest_observation(candidates, target, self.tolerance).cloned())
    }
}
