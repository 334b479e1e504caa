//! Percent change and directional correctness for one signal at one horizon.

use crate::types::{Direction, HorizonOutcome};

/// Percent move from `price_at_signal` to `price_at_horizon`, rounded to
/// 2 decimals. `None` when the signal price is not a positive finite number.
pub fn percent_change(price_at_signal: f64, price_at_horizon: f64) -> Option<f64> {
    if !price_at_signal.is_finite() || price_at_signal <= 0.0 || !price_at_horizon.is_finite() {
        return None;
    }

    let raw = (price_at_horizon - price_at_signal) / price_at_signal * 100.0;
    let rounded = (raw * 100.0).round() / 100.0;
    // -0.0 would otherwise serialize as "-0.0"
    Some(if rounded == 0.0 { 0.0 } else { rounded })
}

/// Whether the move matches the prediction. No movement is never accurate.
pub fn is_accurate(direction: Direction, change_pct: f64) -> bool {
    match direction {
        Direction::Up => change_pct > 0.0,
        Direction::Down => change_pct < 0.0,
    }
}

/// Outcome at one horizon, or `None` while the horizon price is absent or the
/// pair is not evaluable.
pub fn evaluate(
    price_at_signal: f64,
    price_at_horizon: Option<f64>,
    direction: Direction,
) -> Option<HorizonOutcome> {
    let price = price_at_horizon?;
    let change_pct = percent_change(price_at_signal, price)?;
    Some(HorizonOutcome {
        price,
        change_pct,
        accurate: is_accurate(direction, change_pct),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_up_move_is_accurate_for_up() {
        let outcome = evaluate(10.0, Some(10.5), Direction::Up).unwrap();
        assert_eq!(outcome.change_pct, 5.0);
        assert!(outcome.accurate);
    }

    #[test]
    fn test_unchanged_price_is_inaccurate_both_ways() {
        let up = evaluate(10.0, Some(10.0), Direction::Up).unwrap();
        let down = evaluate(10.0, Some(10.0), Direction::Down).unwrap();
        assert_eq!(up.change_pct, 0.0);
        assert!(!up.accurate);
        assert!(!down.accurate);
    }

    #[test]
    fn test_down_move_is_accurate_for_down() {
        let outcome = evaluate(20.0, Some(19.0), Direction::Down).unwrap();
        assert_eq!(outcome.change_pct, -5.0);
        assert!(outcome.accurate);
    }

    #[test]
    fn test_missing_horizon_price_is_pending() {
        assert!(evaluate(10.0, None, Direction::Up).is_none());
    }

    #[test]
    fn test_bad_signal_price_is_not_evaluable() {
        assert!(evaluate(0.0, Some(10.0), Direction::Up).is_none());
        assert!(evaluate(-1.0, Some(10.0), Direction::Up).is_none());
        assert!(evaluate(f64::NAN, Some(10.0), Direction::Up).is_none());
        assert!(evaluate(10.0, Some(f64::INFINITY), Direction::Up).is_none());
    }

    #[test]
    fn test_rounding() {
        assert_eq!(percent_change(3.0, 4.0), Some(33.33));
        assert_eq!(percent_change(3.0, 2.0), Some(-33.33));
    }

    #[test]
    fn test_sub_rounding_move_scores_as_flat() {
        // +0.004% rounds to 0.00, which is not a move up.
        let outcome = evaluate(1000.0, Some(1000.04), Direction::Up).unwrap();
        assert_eq!(outcome.change_pct, 0.0);
        assert!(!outcome.accurate);
        assert!(outcome.change_pct.is_sign_positive());
    }
}
