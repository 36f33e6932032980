use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{DailyBar, QuoteSnapshot};

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no trading data for {0}")]
    NoData(String),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

/// Source of recent daily prices for a ticker.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Recent daily bars, oldest first. Days without a close are omitted.
    async fn daily_bars(&self, ticker: &str) -> Result<Vec<DailyBar>, QuoteError>;

    async fn snapshot(&self, ticker: &str) -> Result<QuoteSnapshot, QuoteError> {
        let bars = self.daily_bars(ticker).await?;
        QuoteSnapshot::from_bars(bars).ok_or_else(|| QuoteError::NoData(ticker.to_string()))
    }

    async fn latest_close(&self, ticker: &str) -> Result<Decimal, QuoteError> {
        Ok(self.snapshot(ticker).await?.last_close)
    }
}
