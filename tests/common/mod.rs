use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::{broadcast, Mutex};

use tactical_alert::api::ws_types::WsMessage;
use tactical_alert::config::AppConfig;
use tactical_alert::engine::ThresholdStrategy;
use tactical_alert::market::{QuoteError, QuoteProvider};
use tactical_alert::models::DailyBar;
use tactical_alert::services::{AlertSink, LatchPolicy, NotifyError, ThresholdMonitor};
use tactical_alert::store::PortfolioStore;
use tactical_alert::AppState;

/// A fresh, not-yet-existing portfolio path under the system temp dir.
#[allow(dead_code)]
pub fn temp_store_path() -> PathBuf {
    std::env::temp_dir().join(format!("portfolio_{}.json", uuid::Uuid::new_v4()))
}

/// Quote provider whose prices are set by the test. Unknown tickers fail.
#[derive(Default)]
pub struct FakeQuotes {
    prices: StdMutex<HashMap<String, Decimal>>,
}

#[allow(dead_code)]
impl FakeQuotes {
    pub fn set(&self, ticker: &str, price: i64) {
        self.prices
            .lock()
            .unwrap()
            .insert(ticker.to_string(), Decimal::from(price));
    }

    pub fn clear(&self, ticker: &str) {
        self.prices.lock().unwrap().remove(ticker);
    }
}

#[async_trait]
impl QuoteProvider for FakeQuotes {
    async fn daily_bars(&self, ticker: &str) -> Result<Vec<DailyBar>, QuoteError> {
        let price = self.prices.lock().unwrap().get(ticker).copied();
        match price {
            Some(p) => Ok(vec![DailyBar {
                high: p,
                low: p,
                close: p,
            }]),
            None => Err(QuoteError::NoData(ticker.to_string())),
        }
    }
}

/// Sink that records delivered text and can be switched into failure mode.
#[derive(Default)]
pub struct RecordingSink {
    sent: StdMutex<Vec<String>>,
    failing: AtomicBool,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Unavailable("sink offline".into()));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

#[allow(dead_code)]
pub struct Harness {
    pub state: AppState,
    pub store: Arc<Mutex<PortfolioStore>>,
    pub quotes: Arc<FakeQuotes>,
    pub sink: Arc<RecordingSink>,
    pub path: PathBuf,
}

#[allow(dead_code)]
pub fn build_harness(config: AppConfig, latch_policy: LatchPolicy) -> Harness {
    let path = temp_store_path();
    let store = Arc::new(Mutex::new(PortfolioStore::load(&path)));
    let quotes = Arc::new(FakeQuotes::default());
    let sink = Arc::new(RecordingSink::default());
    let (ws_tx, _) = broadcast::channel::<WsMessage>(16);

    let monitor = ThresholdMonitor::new(
        store.clone(),
        quotes.clone(),
        sink.clone(),
        ThresholdStrategy::default(),
        latch_policy,
    )
    .with_broadcast(ws_tx.clone());

    let state = AppState {
        store: store.clone(),
        alerts_enabled: Arc::new(AtomicBool::new(config.alerts_enabled)),
        config,
        quotes: quotes.clone(),
        sink: sink.clone(),
        monitor,
        ws_tx,
        metrics_handle: tactical_alert::metrics::detached_handle(),
    };

    Harness {
        state,
        store,
        quotes,
        sink,
        path,
    }
}
