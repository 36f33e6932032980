use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One trading day as reported by the quote provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBar {
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

/// Latest close plus the recent history it was taken from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub last_close: Decimal,
    pub bars: Vec<DailyBar>,
}

impl QuoteSnapshot {
    /// Bars with a non-positive close are discarded. `None` when nothing
    /// usable is left.
    pub fn from_bars(mut bars: Vec<DailyBar>) -> Option<Self> {
        bars.retain(|b| b.close > Decimal::ZERO);
        let last_close = bars.last()?.close;
        Some(Self { last_close, bars })
    }
}

/// Display currency for a ticker: Korean exchange suffixes get won.
pub fn currency_symbol(ticker: &str) -> &'static str {
    if [".KS", ".KQ", ".KR"].iter().any(|s| ticker.contains(s)) {
        "₩"
    } else {
        "$"
    }
}
