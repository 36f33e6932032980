pub mod evaluator;
pub mod thresholds;

pub use evaluator::{evaluate_and_latch, evaluate_portfolio, evaluate_position};
pub use thresholds::{ThresholdLevels, ThresholdStrategy};

use rust_decimal::Decimal;

/// Percent change from `from` to `to`. Zero when `from` is zero, `None`
/// when the result does not fit in a `Decimal`.
pub fn percent_change(from: Decimal, to: Decimal) -> Option<Decimal> {
    if from.is_zero() {
        return Some(Decimal::ZERO);
    }
    to.checked_sub(from)?
        .checked_div(from)?
        .checked_mul(Decimal::ONE_HUNDRED)
}
