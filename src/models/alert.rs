use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    AddBuy,
    TakeProfit,
    Target,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::AddBuy => "add_buy",
            AlertKind::TakeProfit => "take_profit",
            AlertKind::Target => "target",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fired alert, carrying enough context for any message template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub kind: AlertKind,
    pub ticker: String,
    pub name: String,
    pub purchase_price: Decimal,
    pub current_price: Decimal,
    pub threshold_price: Decimal,
    /// Signed offset of the threshold from the purchase price, in percent.
    pub percent_offset: Decimal,
    pub fired_at: DateTime<Utc>,
}
