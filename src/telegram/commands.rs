use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

use crate::models::MAX_PURCHASE_PRICE;

pub const BUY_USAGE: &str = "buy <name> <ticker> <price>";

/// A chat command understood by the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Buy {
        name: String,
        ticker: String,
        price: Decimal,
    },
    Remove {
        ticker: String,
    },
    Report,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("invalid price: {0}")]
    BadPrice(String),

    #[error("price must be positive: {0}")]
    NonPositivePrice(Decimal),

    #[error("price {0} exceeds the maximum of {max}", max = MAX_PURCHASE_PRICE)]
    PriceTooLarge(Decimal),
}

/// Parse a chat message. Unrecognised text is `Ok(None)`.
///
/// `buy`/`매수` take `<name> <ticker> <price>`; extra tokens are ignored and
/// the price may carry thousands separators. `report`/`보고` must be the
/// whole message. `remove`/`삭제` take a ticker.
pub fn parse_command(text: &str) -> Result<Option<Command>, CommandError> {
    let text = text.trim();
    let mut parts = text.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = parts.collect();

    match head.to_lowercase().as_str() {
        "buy" | "/buy" | "매수" => {
            let [name, ticker, price, ..] = args.as_slice() else {
                return Err(CommandError::Usage(BUY_USAGE));
            };
            let price = parse_price(price)?;
            Ok(Some(Command::Buy {
                name: (*name).to_string(),
                ticker: ticker.to_uppercase(),
                price,
            }))
        }
        "remove" | "/remove" | "삭제" => match args.first() {
            Some(ticker) => Ok(Some(Command::Remove {
                ticker: ticker.to_uppercase(),
            })),
            None => Err(CommandError::Usage("remove <ticker>")),
        },
        "report" | "/report" | "보고" if args.is_empty() => Ok(Some(Command::Report)),
        _ => Ok(None),
    }
}

fn parse_price(raw: &str) -> Result<Decimal, CommandError> {
    let cleaned = raw.replace(',', "");
    let price = Decimal::from_str(&cleaned).map_err(|_| CommandError::BadPrice(raw.to_string()))?;
    if price <= Decimal::ZERO {
        return Err(CommandError::NonPositivePrice(price));
    }
    if price > MAX_PURCHASE_PRICE {
        return Err(CommandError::PriceTooLarge(price));
    }
    Ok(price)
}
