use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;

use super::thresholds::{ThresholdLevels, ThresholdStrategy};
use crate::models::{AlertKind, AlertRecord, Position, QuoteSnapshot};

/// Decide which alerts fire for `position` at `current_price`, without
/// touching its flags.
///
/// Order is fixed: add-buy, then target, then take-profit. Take-profit is
/// suppressed when target fires in the same evaluation or has already
/// fired, so one upward move never produces both. A missing or
/// non-positive price yields nothing.
pub fn evaluate_position(
    position: &Position,
    current_price: Option<Decimal>,
    levels: &ThresholdLevels,
) -> Vec<AlertRecord> {
    let Some(current) = current_price.filter(|p| *p > Decimal::ZERO) else {
        return Vec::new();
    };

    let mut alerts = Vec::with_capacity(2);

    if current <= levels.add_buy && !position.alerted_add_buy {
        alerts.push(make_record(position, AlertKind::AddBuy, current, levels));
    }

    if current >= levels.target && !position.alerted_target {
        alerts.push(make_record(position, AlertKind::Target, current, levels));
    } else if current >= levels.take_profit
        && !position.alerted_take_profit
        && !position.alerted_target
    {
        alerts.push(make_record(position, AlertKind::TakeProfit, current, levels));
    }

    alerts
}

/// Evaluate and latch every fired alert on the position.
pub fn evaluate_and_latch(
    position: &mut Position,
    current_price: Option<Decimal>,
    levels: &ThresholdLevels,
) -> Vec<AlertRecord> {
    let alerts = evaluate_position(position, current_price, levels);
    for alert in &alerts {
        position.latch(alert.kind);
    }
    alerts
}

/// Evaluate a whole portfolio against a map of quotes keyed by ticker.
/// Positions without a quote, or whose levels cannot be computed, are left
/// untouched.
pub fn evaluate_portfolio(
    positions: &mut [Position],
    quotes: &HashMap<String, QuoteSnapshot>,
    strategy: &ThresholdStrategy,
) -> Vec<AlertRecord> {
    let mut fired = Vec::new();
    for position in positions.iter_mut() {
        let Some(quote) = quotes.get(&position.ticker) else {
            continue;
        };
        let Some(levels) = strategy.levels_for(position.purchase_price, &quote.bars) else {
            tracing::warn!(
                ticker = %position.ticker,
                purchase = %position.purchase_price,
                "Threshold levels overflow, skipping position"
            );
            continue;
        };
        fired.extend(evaluate_and_latch(position, Some(quote.last_close), &levels));
    }
    fired
}

fn make_record(
    position: &Position,
    kind: AlertKind,
    current_price: Decimal,
    levels: &ThresholdLevels,
) -> AlertRecord {
    let (threshold_price, percent_offset) = match kind {
        AlertKind::AddBuy => (levels.add_buy, -levels.add_buy_pct),
        AlertKind::TakeProfit => (levels.take_profit, levels.take_profit_pct),
        AlertKind::Target => (levels.target, levels.target_pct),
    };

    AlertRecord {
        kind,
        ticker: position.ticker.clone(),
        name: position.name.clone(),
        purchase_price: position.purchase_price,
        current_price,
        threshold_price,
        percent_offset,
        fired_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(price: i64) -> Position {
        Position::new("Test Corp", "TEST", Decimal::from(price)).unwrap()
    }

    fn levels(price: i64) -> ThresholdLevels {
        ThresholdStrategy::default()
            .levels_for(Decimal::from(price), &[])
            .unwrap()
    }

    fn kinds(alerts: &[AlertRecord]) -> Vec<AlertKind> {
        alerts.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn test_add_buy_fires_below_level() {
        let mut pos = position(100);
        let alerts = evaluate_and_latch(&mut pos, Some(Decimal::from(87)), &levels(100));
        assert_eq!(kinds(&alerts), vec![AlertKind::AddBuy]);
        assert!(pos.alerted_add_buy);
        assert!(!pos.alerted_take_profit);
        assert!(!pos.alerted_target);

        let alert = &alerts[0];
        assert_eq!(alert.threshold_price, Decimal::from(88));
        assert_eq!(alert.percent_offset, Decimal::from(-12));
        assert_eq!(alert.current_price, Decimal::from(87));
    }

    #[test]
    fn test_add_buy_fires_exactly_at_level() {
        let pos = position(100);
        let alerts = evaluate_position(&pos, Some(Decimal::from(88)), &levels(100));
        assert_eq!(kinds(&alerts), vec![AlertKind::AddBuy]);
    }

    #[test]
    fn test_target_takes_priority_over_take_profit() {
        let mut pos = position(100);
        let alerts = evaluate_and_latch(&mut pos, Some(Decimal::from(126)), &levels(100));
        assert_eq!(kinds(&alerts), vec![AlertKind::Target]);
        assert!(pos.alerted_target);
        assert!(!pos.alerted_take_profit);

        // Falling back into the take-profit band does not fire take-profit later
        let alerts = evaluate_and_latch(&mut pos, Some(Decimal::from(112)), &levels(100));
        assert!(alerts.is_empty());
        assert!(!pos.alerted_take_profit);
    }

    #[test]
    fn test_take_profit_then_target() {
        let mut pos = position(100);
        let first = evaluate_and_latch(&mut pos, Some(Decimal::from(111)), &levels(100));
        assert_eq!(kinds(&first), vec![AlertKind::TakeProfit]);

        let second = evaluate_and_latch(&mut pos, Some(Decimal::from(125)), &levels(100));
        assert_eq!(kinds(&second), vec![AlertKind::Target]);
        assert!(pos.alerted_take_profit && pos.alerted_target);
    }

    #[test]
    fn test_no_reset_after_retreat() {
        let mut pos = position(100);
        let first = evaluate_and_latch(&mut pos, Some(Decimal::from(111)), &levels(100));
        assert_eq!(kinds(&first), vec![AlertKind::TakeProfit]);

        let second = evaluate_and_latch(&mut pos, Some(Decimal::from(109)), &levels(100));
        assert!(second.is_empty());
        assert!(pos.alerted_take_profit);

        let third = evaluate_and_latch(&mut pos, Some(Decimal::from(111)), &levels(100));
        assert!(third.is_empty());
    }

    #[test]
    fn test_each_kind_fires_at_most_once() {
        let mut pos = position(100);
        let prices = [87, 80, 111, 130, 50, 140, 87, 115, 200];
        let mut all = Vec::new();
        for p in prices {
            all.extend(evaluate_and_latch(&mut pos, Some(Decimal::from(p)), &levels(100)));
        }
        for kind in [AlertKind::AddBuy, AlertKind::TakeProfit, AlertKind::Target] {
            assert_eq!(all.iter().filter(|a| a.kind == kind).count(), 1, "{kind}");
        }
    }

    #[test]
    fn test_missing_price_changes_nothing() {
        let mut pos = position(100);
        let before = pos.clone();
        let alerts = evaluate_and_latch(&mut pos, None, &levels(100));
        assert!(alerts.is_empty());
        assert_eq!(pos, before);
    }

    #[test]
    fn test_non_positive_price_changes_nothing() {
        let mut pos = position(100);
        let before = pos.clone();
        for p in [Decimal::ZERO, Decimal::from(-1)] {
            assert!(evaluate_and_latch(&mut pos, Some(p), &levels(100)).is_empty());
        }
        assert_eq!(pos, before);
    }

    #[test]
    fn test_evaluate_portfolio_skips_overflowing_levels() {
        let mut huge = Position::new("Big", "BIG", Decimal::ONE).unwrap();
        huge.purchase_price = Decimal::MAX;
        let mut positions = vec![huge.clone(), Position::new("A", "AAA", Decimal::from(100)).unwrap()];

        let mut quotes = HashMap::new();
        for ticker in ["BIG", "AAA"] {
            quotes.insert(
                ticker.to_string(),
                QuoteSnapshot {
                    last_close: Decimal::ONE,
                    bars: vec![],
                },
            );
        }

        let fired = evaluate_portfolio(&mut positions, &quotes, &ThresholdStrategy::default());
        assert_eq!(kinds(&fired), vec![AlertKind::AddBuy]);
        assert_eq!(fired[0].ticker, "AAA");
        assert_eq!(positions[0], huge);
    }

    #[test]
    fn test_between_levels_is_quiet() {
        let pos = position(100);
        for p in [89, 100, 109] {
            assert!(evaluate_position(&pos, Some(Decimal::from(p)), &levels(100)).is_empty());
        }
    }

    #[test]
    fn test_evaluate_portfolio_skips_unquoted() {
        let mut positions = vec![
            Position::new("A", "AAA", Decimal::from(100)).unwrap(),
            Position::new("B", "BBB", Decimal::from(100)).unwrap(),
        ];
        let mut quotes = HashMap::new();
        quotes.insert(
            "AAA".to_string(),
            QuoteSnapshot {
                last_close: Decimal::from(130),
                bars: vec![],
            },
        );

        let fired = evaluate_portfolio(&mut positions, &quotes, &ThresholdStrategy::default());
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].ticker, "AAA");
        assert_eq!(fired[0].kind, AlertKind::Target);
        assert!(positions[0].alerted_target);
        assert_eq!(positions[1], Position::new("B", "BBB", Decimal::from(100)).unwrap());
    }
}
