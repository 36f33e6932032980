use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AlertKind;

/// Largest accepted purchase price. Keeps every derived level and percent
/// change well inside `Decimal` range.
pub const MAX_PURCHASE_PRICE: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PositionError {
    #[error("ticker must not be empty")]
    EmptyTicker,

    #[error("purchase price must be positive, got {0}")]
    NonPositivePrice(Decimal),

    #[error("purchase price {0} exceeds the maximum of {max}", max = MAX_PURCHASE_PRICE)]
    PriceTooLarge(Decimal),
}

/// Check a purchase price against `(0, MAX_PURCHASE_PRICE]`.
pub fn validate_purchase_price(price: Decimal) -> Result<(), PositionError> {
    if price <= Decimal::ZERO {
        return Err(PositionError::NonPositivePrice(price));
    }
    if price > MAX_PURCHASE_PRICE {
        return Err(PositionError::PriceTooLarge(price));
    }
    Ok(())
}

/// A tracked holding. `ticker` is the store key.
///
/// Older portfolio files used `buy_price` and `alerted_avg_down`; both are
/// still accepted on load. Missing flags default to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub name: String,
    pub ticker: String,
    #[serde(alias = "buy_price")]
    pub purchase_price: Decimal,
    #[serde(default, alias = "alerted_avg_down")]
    pub alerted_add_buy: bool,
    #[serde(default)]
    pub alerted_take_profit: bool,
    #[serde(default)]
    pub alerted_target: bool,
}

impl Position {
    /// Build a fresh position with every alert flag cleared.
    pub fn new(
        name: impl Into<String>,
        ticker: &str,
        purchase_price: Decimal,
    ) -> Result<Self, PositionError> {
        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(PositionError::EmptyTicker);
        }
        validate_purchase_price(purchase_price)?;

        Ok(Self {
            name: name.into(),
            ticker,
            purchase_price,
            alerted_add_buy: false,
            alerted_take_profit: false,
            alerted_target: false,
        })
    }

    pub fn is_latched(&self, kind: AlertKind) -> bool {
        match kind {
            AlertKind::AddBuy => self.alerted_add_buy,
            AlertKind::TakeProfit => self.alerted_take_profit,
            AlertKind::Target => self.alerted_target,
        }
    }

    /// Latch the flag for `kind`. Returns true if it was previously clear.
    pub fn latch(&mut self, kind: AlertKind) -> bool {
        let flag = match kind {
            AlertKind::AddBuy => &mut self.alerted_add_buy,
            AlertKind::TakeProfit => &mut self.alerted_take_profit,
            AlertKind::Target => &mut self.alerted_target,
        };
        let changed = !*flag;
        *flag = true;
        changed
    }

    /// Signed percent change of `current` against the purchase price.
    pub fn percent_change(&self, current: Decimal) -> Option<Decimal> {
        crate::engine::percent_change(self.purchase_price, current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_ticker() {
        let pos = Position::new("Samsung", " 005930.ks ", Decimal::from(70_000)).unwrap();
        assert_eq!(pos.ticker, "005930.KS");
        assert!(!pos.alerted_add_buy);
        assert!(!pos.alerted_take_profit);
        assert!(!pos.alerted_target);
    }

    #[test]
    fn test_new_rejects_bad_input() {
        assert_eq!(
            Position::new("x", "  ", Decimal::ONE),
            Err(PositionError::EmptyTicker)
        );
        assert_eq!(
            Position::new("x", "AAPL", Decimal::ZERO),
            Err(PositionError::NonPositivePrice(Decimal::ZERO))
        );
        assert!(Position::new("x", "AAPL", Decimal::from(-5)).is_err());
    }

    #[test]
    fn test_new_rejects_oversized_price() {
        assert_eq!(MAX_PURCHASE_PRICE, Decimal::from(1_000_000_000_000i64));
        assert!(Position::new("x", "BIG", MAX_PURCHASE_PRICE).is_ok());

        let huge = Decimal::from_str_exact("1000000000000000000000000000").unwrap();
        assert_eq!(
            Position::new("Big", "BIG", huge),
            Err(PositionError::PriceTooLarge(huge))
        );
    }

    #[test]
    fn test_latch_is_one_way() {
        let mut pos = Position::new("Apple", "AAPL", Decimal::from(100)).unwrap();
        assert!(pos.latch(AlertKind::TakeProfit));
        assert!(!pos.latch(AlertKind::TakeProfit));
        assert!(pos.is_latched(AlertKind::TakeProfit));
        assert!(!pos.is_latched(AlertKind::Target));
    }

    #[test]
    fn test_legacy_fields_are_migrated() {
        let json = r#"{"name":"Apple","ticker":"AAPL","buy_price":150.5,"alerted_avg_down":true}"#;
        let pos: Position = serde_json::from_str(json).unwrap();
        assert_eq!(pos.purchase_price, Decimal::new(1505, 1));
        assert!(pos.alerted_add_buy);
        assert!(!pos.alerted_take_profit);
        assert!(!pos.alerted_target);
    }
}
