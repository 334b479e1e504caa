//! Accuracy summaries, recomputed from the full result set on every call.

use crate::types::{
    AccuracySummary, HorizonBreakdown, ScoredResult, SectorAccuracy, WeeklyAccuracy,
};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

/// Build the accuracy summary over every backtest result.
pub fn summarize(rows: &[ScoredResult]) -> AccuracySummary {
    let mut accuracy = HorizonBreakdown::default();
    let mut by_sector: BTreeMap<String, SectorAccuracy> = BTreeMap::new();

    for row in rows {
        accuracy.record(&row.result);

        if let Some(sector) = &row.sector {
            let entry = by_sector.entry(sector.clone()).or_default();
            entry.total += 1;
            entry.accuracy.record(&row.result);
        }
    }

    AccuracySummary {
        total_signals_tested: rows.len() as u32,
        accuracy,
        by_sector,
        weekly: weekly_trend(rows),
        avg_confidence: average_confidence(rows),
    }
}

/// Per-week accuracy, oldest week first.
pub fn weekly_trend(rows: &[ScoredResult]) -> Vec<WeeklyAccuracy> {
    let mut weeks: BTreeMap<NaiveDate, WeeklyAccuracy> = BTreeMap::new();

    for row in rows {
        let week_start = week_start(row.result.signal_date.date_naive());
        let entry = weeks.entry(week_start).or_insert_with(|| WeeklyAccuracy {
            week_start,
            total: 0,
            accuracy: HorizonBreakdown::default(),
        });
        entry.total += 1;
        entry.accuracy.record(&row.result);
    }

    weeks.into_values().collect()
}

/// Most recent Sunday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

/// Mean confidence of signals with at least one resolved horizon, to 3 decimals.
fn average_confidence(rows: &[ScoredResult]) -> Option<f64> {
    let (sum, count) = rows
        .iter()
        .filter(|row| row.result.resolved_count() > 0)
        .filter_map(|row| row.confidence)
        .fold((0.0, 0u32), |(sum, count), c| (sum + c, count + 1));

    if count == 0 {
        return None;
    }
    Some((sum / count as f64 * 1000.0).round() / 1000.0)
}
