pub mod alert;
pub mod position;
pub mod quote;

pub use alert::{AlertKind, AlertRecord};
pub use position::{validate_purchase_price, Position, PositionError, MAX_PURCHASE_PRICE};
pub use quote::{currency_symbol, DailyBar, QuoteSnapshot};
