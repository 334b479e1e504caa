use crate::types::PriceObservation;
use std::collections::BTreeMap;

/// Freshest observation per ticker.
///
/// On identical timestamps the observation seen first is kept.
pub fn latest_quotes<I>(observations: I) -> BTreeMap<String, PriceObservation>
where
    I: IntoIterator<Item = PriceObservation>,
{
    observations.into_iter().fold(BTreeMap::new(), |mut latest, obs| {
        let newer = latest
            .get(&obs.ticker)
            .map_or(true, |current: &PriceObservation| obs.observed_at > current.observed_at);
        if newer {
            latest.insert(obs.ticker.clone(), obs);
        }
        latest
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_keeps_freshest_per_ticker() {
        let t = Utc.with_ymd_and_hms(2024, 7, 1, 20, 0, 0).unwrap();
        let quotes = latest_quotes(vec![
            PriceObservation::new("ABC", t, 10.0, "yahoo"),
            PriceObservation::new("ABC", t + Duration::hours(1), 11.0, "tmx"),
            PriceObservation::new("XYZ", t, 5.0, "yahoo"),
            PriceObservation::new("ABC", t - Duration::hours(1), 9.0, "yahoo"),
        ]);

        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes["ABC"].price, 11.0);
        assert_eq!(quotes["XYZ"].price, 5.0);
    }

    #[test]
    fn test_first_seen_wins_ties() {
        let t = Utc.with_ymd_and_hms(2024, 7, 1, 20, 0, 0).unwrap();
        let quotes = latest_quotes(vec![
            PriceObservation::new("ABC", t, 10.0, "yahoo"),
            PriceObservation::new("ABC", t, 10.2, "tmx"),
        ]);
        assert_eq!(quotes["ABC"].source, "yahoo");
    }

    #[test]
    fn test_empty() {
        assert!(latest_quotes(Vec::new()).is_empty());
    }
}
