use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::provider::{QuoteError, QuoteProvider};
use crate::models::DailyBar;

/// Per-ticker TTL cache in front of another provider. Failures are not
/// cached.
pub struct CachedQuotes<P> {
    inner: P,
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, Vec<DailyBar>)>>,
}

impl<P: QuoteProvider> CachedQuotes<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<P: QuoteProvider> QuoteProvider for CachedQuotes<P> {
    async fn daily_bars(&self, ticker: &str) -> Result<Vec<DailyBar>, QuoteError> {
        {
            let entries = self.entries.lock().await;
            if let Some((at, bars)) = entries.get(ticker) {
                if at.elapsed() < self.ttl {
                    return Ok(bars.clone());
                }
            }
        }

        let bars = self.inner.daily_bars(ticker).await?;
        self.entries
            .lock()
            .await
            .insert(ticker.to_string(), (Instant::now(), bars.clone()));
        Ok(bars)
    }
}
