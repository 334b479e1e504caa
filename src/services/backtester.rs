//! Batch evaluation of stored signals against recorded prices.
//!
//! A run walks every eligible signal, resolves the price at signal time and
//! at each elapsed horizon, and upserts one [`BacktestResult`] per signal.
//! Runs are synchronous; async callers wrap [`BacktestRunner::run`] in
//! `tokio::task::spawn_blocking`.

use crate::services::evaluator;
use crate::services::price_resolver::{PriceResolver, PriceSource};
use crate::services::sqlite_store::{SqliteStore, StoreError};
use crate::types::{BacktestResult, Horizon, RunReport, Signal, SignalRecord};
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Errors that stop a run before any signal is examined.
#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("Failed to load eligible signals: {0}")]
    Selection(#[from] StoreError),
}

/// Tunables for a [`BacktestRunner`].
#[derive(Debug, Clone, Copy)]
pub struct RunnerSettings {
    /// Maximum distance between a target instant and the price used for it.
    pub price_tolerance: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            price_tolerance: Duration::hours(72),
        }
    }
}

/// What happened to one signal within a run.
#[derive(Debug, PartialEq)]
enum SignalOutcome {
    /// Row created and/or horizons filled.
    Evaluated { created: bool, horizons: usize },
    /// Nothing new to record yet.
    Unchanged,
    Unpriced,
    Busy,
}

/// Holds a signal for the lifetime of the guard.
struct SignalLock<'a> {
    locks: &'a DashMap<i64, ()>,
    signal_id: i64,
}

impl Drop for SignalLock<'_> {
    fn drop(&mut self) {
        self.locks.remove(&self.signal_id);
    }
}

/// Backtest run controller.
pub struct BacktestRunner {
    store: Arc<SqliteStore>,
    prices: Arc<dyn PriceSource>,
    resolver: PriceResolver,
    /// Active runs (run_id -> cancel flag)
    running: DashMap<String, bool>,
    /// Signals currently being written by some run.
    signal_locks: DashMap<i64, ()>,
}

impl BacktestRunner {
    /// Create a runner reading signals and results from `store` and prices
    /// from `prices`.
    pub fn new(store: Arc<SqliteStore>, prices: Arc<dyn PriceSource>, settings: RunnerSettings) -> Self {
        Self {
            store,
            prices,
            resolver: PriceResolver::new(settings.price_tolerance),
            running: DashMap::new(),
            signal_locks: DashMap::new(),
        }
    }

    /// Run with a fresh run id.
    pub fn run(&self, as_of: DateTime<Utc>) -> Result<RunReport, BacktestError> {
        self.run_with_id(Uuid::new_v4().to_string(), as_of)
    }

    /// Run under a caller-chosen id, so the caller can cancel it while it runs.
    pub fn run_with_id(&self, run_id: String, as_of: DateTime<Utc>) -> Result<RunReport, BacktestError> {
        self.running.insert(run_id.clone(), false);
        let result = self.execute(&run_id, as_of);
        self.running.remove(&run_id);
        result
    }

    /// Request that an active run stop before its next signal.
    pub fn cancel(&self, run_id: &str) -> bool {
        if let Some(mut entry) = self.running.get_mut(run_id) {
            *entry = true;
            true
        } else {
            false
        }
    }

    /// Ids of runs in progress.
    pub fn active_runs(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.running.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    fn is_cancelled(&self, run_id: &str) -> bool {
        self.running.get(run_id).map(|v| *v).unwrap_or(false)
    }

    fn execute(&self, run_id: &str, as_of: DateTime<Utc>) -> Result<RunReport, BacktestError> {
        let mut report = RunReport {
            run_id: run_id.to_string(),
            ..Default::default()
        };

        let records = self.store.eligible_signals()?;
        debug!("Backtest {}: {} eligible signals", run_id, records.len());

        for record in records {
            if self.is_cancelled(run_id) {
                info!("Backtest {} cancelled after {} signals", run_id, report.signals_tested);
                report.cancelled = true;
                break;
            }
            report.signals_tested += 1;

            let signal_id = record.id;
            let signal = match validate(record) {
                Some(signal) => signal,
                None => {
                    report.signals_skipped += 1;
                    continue;
                }
            };

            match self.evaluate_signal(&signal, as_of) {
                Ok(SignalOutcome::Evaluated { created, horizons }) => {
                    report.signals_evaluated += 1;
                    report.horizons_resolved += horizons;
                    if created {
                        report.results_created += 1;
                    }
                }
                Ok(SignalOutcome::Unchanged) => {}
                Ok(SignalOutcome::Unpriced) => report.signals_unpriced += 1,
                Ok(SignalOutcome::Busy) => report.signals_busy += 1,
                Err(e) => {
                    warn!("Backtest {}: signal {} failed: {}", run_id, signal_id, e);
                    report.failures += 1;
                }
            }
        }

        info!(
            "Backtest {} finished: {} tested, {} evaluated, {} created, {} horizons resolved, {} skipped, {} unpriced, {} failed",
            run_id,
            report.signals_tested,
            report.signals_evaluated,
            report.results_created,
            report.horizons_resolved,
            report.signals_skipped,
            report.signals_unpriced,
            report.failures
        );
        Ok(report)
    }

    fn lock_signal(&self, signal_id: i64) -> Option<SignalLock<'_>> {
        match self.signal_locks.entry(signal_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(SignalLock {
                    locks: &self.signal_locks,
                    signal_id,
                })
            }
        }
    }

    fn evaluate_signal(&self, signal: &Signal, as_of: DateTime<Utc>) -> Result<SignalOutcome, StoreError> {
        let _lock = match self.lock_signal(signal.id) {
            Some(lock) => lock,
            None => return Ok(SignalOutcome::Busy),
        };

        // Re-read under the lock: another run may have filled horizons since selection.
        let existing = self.store.get_backtest_result(signal.id)?;
        let created = existing.is_none();

        // Time of the observation backing price-at-signal, when known.
        let mut anchor = None;
        let mut result = match existing {
            Some(result) => result,
            None => {
                let observation = self
                    .resolver
                    .resolve(self.prices.as_ref(), &signal.ticker, signal.created_at)?
                    .filter(|obs| obs.price.is_finite() && obs.price > 0.0);
                match observation {
                    Some(obs) => {
                        anchor = Some(obs.observed_at);
                        BacktestResult::new(
                            signal.id,
                            signal.ticker.clone(),
                            signal.created_at,
                            signal.direction,
                            obs.price,
                        )
                    }
                    None => {
                        debug!("No usable price for {} at signal {}", signal.ticker, signal.id);
                        return Ok(SignalOutcome::Unpriced);
                    }
                }
            }
        };

        let due = due_horizons(&result, as_of);
        let mut resolved = 0;
        if !due.is_empty() {
            // A horizon price must come strictly after the signal-time price.
            let cutoff = match anchor {
                Some(observed_at) => observed_at,
                None => self
                    .resolver
                    .resolve(self.prices.as_ref(), &result.ticker, result.signal_date)?
                    .map_or(result.signal_date, |obs| obs.observed_at),
            }
            .max(result.signal_date);

            for horizon in due {
                let target = horizon.target(result.signal_date);
                let price = self
                    .resolver
                    .resolve_after(self.prices.as_ref(), &result.ticker, target, cutoff)?
                    .map(|obs| obs.price);
                let outcome =
                    evaluator::evaluate(result.price_at_signal, price, result.direction_predicted);
                if let Some(outcome) = outcome {
                    if result.resolve(horizon, outcome) {
                        resolved += 1;
                        debug!(
                            "Signal {} {} resolved: {:+.2}% ({})",
                            signal.id,
                            horizon.label(),
                            outcome.change_pct,
                            if outcome.accurate { "correct" } else { "wrong" }
                        );
                    }
                }
            }
        }

        if !created && resolved == 0 {
            return Ok(SignalOutcome::Unchanged);
        }

        result.updated_at = Utc::now();
        self.store.upsert_backtest_result(&result)?;
        Ok(SignalOutcome::Evaluated {
            created,
            horizons: resolved,
        })
    }
}

fn validate(record: SignalRecord) -> Option<Signal> {
    let id = record.id;
    match Signal::try_from(record) {
        Ok(signal) => Some(signal),
        Err(reason) => {
            warn!("Skipping signal {}: {}", id, reason);
            None
        }
    }
}

/// Horizons still awaiting a price on `result` whose target has passed.
pub fn due_horizons(result: &BacktestResult, as_of: DateTime<Utc>) -> Vec<Horizon> {
    result
        .pending_horizons()
        .into_iter()
        .filter(|h| h.target(result.signal_date) <= as_of)
        .collect()
}
