use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::DailyBar;

/// Price levels derived from a purchase price, with the percentages used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdLevels {
    pub add_buy: Decimal,
    pub take_profit: Decimal,
    pub target: Decimal,
    pub add_buy_pct: Decimal,
    pub take_profit_pct: Decimal,
    pub target_pct: Decimal,
}

impl ThresholdLevels {
    /// All percentages are magnitudes: `add_buy_pct = 12` means -12%.
    /// `None` when a level does not fit in a `Decimal`.
    pub fn from_percentages(
        purchase_price: Decimal,
        add_buy_pct: Decimal,
        take_profit_pct: Decimal,
        target_pct: Decimal,
    ) -> Option<Self> {
        let scale = |pct: Decimal| {
            purchase_price
                .checked_mul(Decimal::ONE_HUNDRED.checked_add(pct)?)?
                .checked_div(Decimal::ONE_HUNDRED)
        };
        Some(Self {
            add_buy: scale(-add_buy_pct)?,
            take_profit: scale(take_profit_pct)?,
            target: scale(target_pct)?,
            add_buy_pct,
            take_profit_pct,
            target_pct,
        })
    }
}

/// How the three percentages are chosen for a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ThresholdStrategy {
    /// Fixed offsets from the purchase price.
    Fixed {
        add_buy_pct: Decimal,
        take_profit_pct: Decimal,
        target_pct: Decimal,
    },
    /// Fixed offsets scaled by recent average daily range relative to a
    /// reference range, clamped to `[min_scale, max_scale]`.
    VolatilityScaled {
        add_buy_pct: Decimal,
        take_profit_pct: Decimal,
        target_pct: Decimal,
        reference_range_pct: Decimal,
        min_scale: Decimal,
        max_scale: Decimal,
    },
}

impl Default for ThresholdStrategy {
    fn default() -> Self {
        ThresholdStrategy::fixed(Decimal::from(12), Decimal::from(10), Decimal::from(25))
    }
}

impl ThresholdStrategy {
    pub fn fixed(add_buy_pct: Decimal, take_profit_pct: Decimal, target_pct: Decimal) -> Self {
        ThresholdStrategy::Fixed {
            add_buy_pct,
            take_profit_pct,
            target_pct,
        }
    }

    pub fn volatility_scaled(add_buy_pct: Decimal, take_profit_pct: Decimal, target_pct: Decimal) -> Self {
        ThresholdStrategy::VolatilityScaled {
            add_buy_pct,
            take_profit_pct,
            target_pct,
            reference_range_pct: Decimal::from(2),
            min_scale: Decimal::new(5, 1),
            max_scale: Decimal::from(2),
        }
    }

    /// Parse a strategy name; anything unrecognised is `fixed`.
    pub fn from_name(
        name: &str,
        add_buy_pct: Decimal,
        take_profit_pct: Decimal,
        target_pct: Decimal,
    ) -> Self {
        match name.to_lowercase().as_str() {
            "volatility" | "volatility_scaled" => {
                Self::volatility_scaled(add_buy_pct, take_profit_pct, target_pct)
            }
            _ => Self::fixed(add_buy_pct, take_profit_pct, target_pct),
        }
    }

    /// Compute levels for `purchase_price`. `bars` is only consulted by the
    /// volatility variant; with no usable bars it behaves like `Fixed`.
    /// `None` when the levels overflow, in which case the position cannot be
    /// evaluated.
    pub fn levels_for(&self, purchase_price: Decimal, bars: &[DailyBar]) -> Option<ThresholdLevels> {
        match *self {
            ThresholdStrategy::Fixed {
                add_buy_pct,
                take_profit_pct,
                target_pct,
            } => ThresholdLevels::from_percentages(
                purchase_price,
                add_buy_pct,
                take_profit_pct,
                target_pct,
            ),
            ThresholdStrategy::VolatilityScaled {
                add_buy_pct,
                take_profit_pct,
                target_pct,
                reference_range_pct,
                min_scale,
                max_scale,
            } => {
                let scale = average_range_pct(bars)
                    .filter(|_| !reference_range_pct.is_zero())
                    .and_then(|avg| avg.checked_div(reference_range_pct))
                    .map(|ratio| ratio.max(min_scale).min(max_scale))
                    .unwrap_or(Decimal::ONE);
                let scaled = |pct: Decimal| pct.checked_mul(scale).map(|v| v.round_dp(2));

                ThresholdLevels::from_percentages(
                    purchase_price,
                    scaled(add_buy_pct)?,
                    scaled(take_profit_pct)?,
                    scaled(target_pct)?,
                )
            }
        }
    }
}

impl fmt::Display for ThresholdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdStrategy::Fixed { .. } => write!(f, "fixed"),
            ThresholdStrategy::VolatilityScaled { .. } => write!(f, "volatility"),
        }
    }
}

/// Mean of `(high - low) / close * 100` over bars with a positive close.
/// Bars whose range overflows are ignored.
pub fn average_range_pct(bars: &[DailyBar]) -> Option<Decimal> {
    let ranges: Vec<Decimal> = bars
        .iter()
        .filter(|b| b.close > Decimal::ZERO && b.high >= b.low)
        .filter_map(|b| {
            b.high
                .checked_sub(b.low)?
                .checked_div(b.close)?
                .checked_mul(Decimal::ONE_HUNDRED)
        })
        .collect();

    if ranges.is_empty() {
        return None;
    }
    let total = ranges
        .iter()
        .try_fold(Decimal::ZERO, |acc, r| acc.checked_add(*r))?;
    total.checked_div(Decimal::from(ranges.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(high: i64, low: i64, close: i64) -> DailyBar {
        DailyBar {
            high: Decimal::from(high),
            low: Decimal::from(low),
            close: Decimal::from(close),
        }
    }

    #[test]
    fn test_fixed_levels() {
        let levels = ThresholdStrategy::default().levels_for(Decimal::from(100), &[])
            .unwrap();
        assert_eq!(levels.add_buy, Decimal::from(88));
        assert_eq!(levels.take_profit, Decimal::from(110));
        assert_eq!(levels.target, Decimal::from(125));
        assert_eq!(levels.add_buy_pct, Decimal::from(12));
    }

    #[test]
    fn test_fixed_levels_fractional_price() {
        let levels = ThresholdStrategy::default().levels_for(Decimal::new(15050, 2), &[]).unwrap();
        assert_eq!(levels.add_buy, Decimal::new(13244, 2));
        assert_eq!(levels.take_profit, Decimal::new(16555, 2));
        assert_eq!(levels.target, Decimal::new(188125, 3));
    }

    #[test]
    fn test_volatility_without_bars_matches_fixed() {
        let fixed = ThresholdStrategy::default().levels_for(Decimal::from(100), &[])
            .unwrap();
        let vol = ThresholdStrategy::volatility_scaled(Decimal::from(12), Decimal::from(10), Decimal::from(25))
            .levels_for(Decimal::from(100), &[])
            .unwrap();
        assert_eq!(fixed.add_buy, vol.add_buy);
        assert_eq!(fixed.take_profit, vol.take_profit);
        assert_eq!(fixed.target, vol.target);
    }

    #[test]
    fn test_volatility_scales_with_range() {
        // 4% average range against a 2% reference doubles every offset
        let bars = vec![bar(102, 98, 100), bar(104, 100, 100)];
        let levels = ThresholdStrategy::volatility_scaled(Decimal::from(12), Decimal::from(10), Decimal::from(25))
            .levels_for(Decimal::from(100), &bars)
            .unwrap();
        assert_eq!(levels.add_buy_pct, Decimal::from(24));
        assert_eq!(levels.add_buy, Decimal::from(76));
        assert_eq!(levels.target, Decimal::from(150));
    }

    #[test]
    fn test_volatility_scale_is_clamped() {
        // 20% range would be 10x, capped at 2x
        let bars = vec![bar(110, 90, 100)];
        let levels = ThresholdStrategy::volatility_scaled(Decimal::from(12), Decimal::from(10), Decimal::from(25))
            .levels_for(Decimal::from(100), &bars)
            .unwrap();
        assert_eq!(levels.take_profit_pct, Decimal::from(20));

        // Flat bars floor at 0.5x
        let flat = vec![bar(100, 100, 100)];
        let levels = ThresholdStrategy::volatility_scaled(Decimal::from(12), Decimal::from(10), Decimal::from(25))
            .levels_for(Decimal::from(100), &flat)
            .unwrap();
        assert_eq!(levels.take_profit_pct, Decimal::from(5));
    }

    #[test]
    fn test_levels_overflow_is_none() {
        let strategy = ThresholdStrategy::default();
        assert!(strategy.levels_for(Decimal::MAX, &[]).is_none());
        assert!(ThresholdLevels::from_percentages(
            Decimal::from_str_exact("1000000000000000000000000000").unwrap(),
            Decimal::from(12),
            Decimal::from(10),
            Decimal::from(25),
        )
        .is_none());
    }

    #[test]
    fn test_average_range_skips_overflowing_bars() {
        let tiny_close = DailyBar {
            high: Decimal::MAX,
            low: Decimal::ZERO,
            close: Decimal::new(1, 28),
        };
        assert_eq!(
            average_range_pct(&[tiny_close, bar(102, 98, 100)]),
            Some(Decimal::from(4))
        );
    }

    #[test]
    fn test_from_name() {
        let p = |n: i64| Decimal::from(n);
        assert_eq!(
            ThresholdStrategy::from_name("VOLATILITY", p(12), p(10), p(25)).to_string(),
            "volatility"
        );
        assert_eq!(
            ThresholdStrategy::from_name("whatever", p(12), p(10), p(25)),
            ThresholdStrategy::default()
        );
    }
}
