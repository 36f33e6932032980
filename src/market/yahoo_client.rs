use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use super::provider::{QuoteError, QuoteProvider};
use super::types::{ChartResponse, QuoteSeries};
use crate::models::DailyBar;

pub const YAHOO_API_BASE: &str = "https://query1.finance.yahoo.com";

/// Daily history from the Yahoo Finance chart endpoint.
#[derive(Debug, Clone)]
pub struct YahooQuoteClient {
    http: Client,
    base_url: String,
    range: String,
}

impl YahooQuoteClient {
    pub fn new(http: Client, base_url: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            range: range.into(),
        }
    }
}

#[async_trait]
impl QuoteProvider for YahooQuoteClient {
    async fn daily_bars(&self, ticker: &str) -> Result<Vec<DailyBar>, QuoteError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        let resp = self
            .http
            .get(&url)
            .query(&[("range", self.range.as_str()), ("interval", "1d")])
            .send()
            .await?
            .error_for_status()?;

        let body: ChartResponse = resp.json().await?;

        if let Some(err) = body.chart.error {
            return Err(QuoteError::Unexpected(format!(
                "{}: {}",
                err.code.unwrap_or_default(),
                err.description.unwrap_or_default()
            )));
        }

        let series = body
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.swap_remove(0)) })
            .and_then(|r| r.indicators.quote.into_iter().next())
            .ok_or_else(|| QuoteError::NoData(ticker.to_string()))?;

        let bars = bars_from_series(&series);
        if bars.is_empty() {
            return Err(QuoteError::NoData(ticker.to_string()));
        }
        Ok(bars)
    }
}

/// Zip the parallel arrays into bars, dropping days with no close or a
/// non-positive one. A missing high or low falls back to the close.
pub fn bars_from_series(series: &QuoteSeries) -> Vec<DailyBar> {
    series
        .close
        .iter()
        .enumerate()
        .filter_map(|(i, close)| {
            let close = to_decimal((*close)?).filter(|c| *c > Decimal::ZERO)?;
            let pick = |v: &[Option<f64>]| {
                v.get(i).copied().flatten().and_then(to_decimal).unwrap_or(close)
            };
            Some(DailyBar {
                high: pick(&series.high),
                low: pick(&series.low),
                close,
            })
        })
        .collect()
}

fn to_decimal(v: f64) -> Option<Decimal> {
    if !v.is_finite() {
        return None;
    }
    Decimal::from_f64(v).map(|d| d.round_dp(4))
}
