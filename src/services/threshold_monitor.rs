use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::api::ws_types::WsMessage;
use crate::engine::{evaluate_portfolio, evaluate_position, ThresholdStrategy};
use crate::market::QuoteProvider;
use crate::models::{AlertRecord, QuoteSnapshot};
use crate::services::notifier::{format_alert, AlertSink};
use crate::store::{PortfolioStore, StoreError};

/// When a fired alert's flag is latched relative to delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatchPolicy {
    /// Latch only once the sink accepts the message; failures retry next pass.
    AfterDelivery,
    /// Latch on firing whether or not delivery succeeds.
    AtMostOnce,
}

impl LatchPolicy {
    pub fn from_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "at_most_once" | "at-most-once" => LatchPolicy::AtMostOnce,
            _ => LatchPolicy::AfterDelivery,
        }
    }
}

/// Outcome of one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    /// Positions that had a quote and were evaluated.
    pub evaluated: usize,
    /// Positions skipped because the quote was unavailable.
    pub skipped: usize,
    /// Alerts whose flag was latched this pass.
    pub alerts_fired: usize,
    pub delivery_failures: usize,
    pub persisted: bool,
}

/// Evaluates every tracked position against fresh quotes and dispatches
/// the resulting alerts.
#[derive(Clone)]
pub struct ThresholdMonitor {
    store: Arc<Mutex<PortfolioStore>>,
    quotes: Arc<dyn QuoteProvider>,
    sink: Arc<dyn AlertSink>,
    strategy: ThresholdStrategy,
    latch_policy: LatchPolicy,
    ws_tx: Option<broadcast::Sender<WsMessage>>,
}

impl ThresholdMonitor {
    pub fn new(
        store: Arc<Mutex<PortfolioStore>>,
        quotes: Arc<dyn QuoteProvider>,
        sink: Arc<dyn AlertSink>,
        strategy: ThresholdStrategy,
        latch_policy: LatchPolicy,
    ) -> Self {
        Self {
            store,
            quotes,
            sink,
            strategy,
            latch_policy,
            ws_tx: None,
        }
    }

    pub fn with_broadcast(mut self, ws_tx: broadcast::Sender<WsMessage>) -> Self {
        self.ws_tx = Some(ws_tx);
        self
    }

    pub fn strategy(&self) -> &ThresholdStrategy {
        &self.strategy
    }

    /// One sequential pass: quotes are fetched without holding the store,
    /// then evaluation, delivery and a single persist happen under the lock
    /// so concurrent passes cannot double-fire.
    pub async fn run_pass(&self) -> Result<PassSummary, StoreError> {
        let started = Instant::now();
        let mut summary = PassSummary::default();

        let tickers: Vec<String> = {
            let store = self.store.lock().await;
            store.positions().iter().map(|p| p.ticker.clone()).collect()
        };

        let mut quotes: HashMap<String, QuoteSnapshot> = HashMap::with_capacity(tickers.len());
        for ticker in &tickers {
            match self.quotes.snapshot(ticker).await {
                Ok(snap) => {
                    quotes.insert(ticker.clone(), snap);
                }
                Err(e) => {
                    tracing::warn!(error = %e, ticker = %ticker, "Quote unavailable, skipping position");
                    counter!("quote_failures_total").increment(1);
                    summary.skipped += 1;
                }
            }
        }

        let mut store = self.store.lock().await;
        let mut changed = false;

        match self.latch_policy {
            LatchPolicy::AtMostOnce => {
                summary.evaluated = store
                    .positions()
                    .iter()
                    .filter(|p| quotes.contains_key(&p.ticker))
                    .count();

                let fired = evaluate_portfolio(store.positions_mut(), &quotes, &self.strategy);
                changed = !fired.is_empty();
                for alert in &fired {
                    self.deliver(alert, &mut summary).await;
                    self.record_fired(alert, &mut summary);
                }
            }
            LatchPolicy::AfterDelivery => {
                for position in store.positions_mut() {
                    let Some(quote) = quotes.get(&position.ticker) else {
                        continue;
                    };
                    let Some(levels) = self.strategy.levels_for(position.purchase_price, &quote.bars)
                    else {
                        tracing::warn!(
                            ticker = %position.ticker,
                            purchase = %position.purchase_price,
                            "Threshold levels overflow, skipping position"
                        );
                        summary.skipped += 1;
                        continue;
                    };
                    summary.evaluated += 1;

                    for alert in evaluate_position(position, Some(quote.last_close), &levels) {
                        if self.deliver(&alert, &mut summary).await {
                            position.latch(alert.kind);
                            changed = true;
                            self.record_fired(&alert, &mut summary);
                        }
                    }
                }
            }
        }

        if changed {
            store.save()?;
            summary.persisted = true;
        }

        gauge!("tracked_positions").set(store.len() as f64);
        counter!("monitor_passes_total").increment(1);
        histogram!("monitor_pass_seconds").record(started.elapsed().as_secs_f64());

        Ok(summary)
    }

    async fn deliver(&self, alert: &AlertRecord, summary: &mut PassSummary) -> bool {
        match self.sink.send(&format_alert(alert)).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    ticker = %alert.ticker,
                    kind = %alert.kind,
                    "Alert delivery failed"
                );
                counter!("alert_delivery_failures_total").increment(1);
                summary.delivery_failures += 1;
                false
            }
        }
    }

    fn record_fired(&self, alert: &AlertRecord, summary: &mut PassSummary) {
        tracing::info!(
            ticker = %alert.ticker,
            kind = %alert.kind,
            purchase = %alert.purchase_price,
            current = %alert.current_price,
            threshold = %alert.threshold_price,
            "Threshold alert fired"
        );
        counter!("alerts_fired_total", "kind" => alert.kind.as_str()).increment(1);
        summary.alerts_fired += 1;

        if let Some(tx) = &self.ws_tx {
            let _ = tx.send(WsMessage::AlertFired(alert.clone()));
        }
    }
}

/// Run passes every `interval_secs` while `alerts_enabled` is set.
pub async fn run_threshold_monitor(
    monitor: ThresholdMonitor,
    alerts_enabled: Arc<AtomicBool>,
    interval_secs: u64,
) {
    tracing::info!(
        interval_secs = interval_secs,
        strategy = %monitor.strategy(),
        "Threshold monitor started"
    );

    let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if !alerts_enabled.load(Ordering::Relaxed) {
            tracing::debug!("Threshold alerts disabled");
            continue;
        }

        match monitor.run_pass().await {
            Ok(summary) if summary.alerts_fired > 0 || summary.delivery_failures > 0 => {
                tracing::info!(
                    evaluated = summary.evaluated,
                    skipped = summary.skipped,
                    fired = summary.alerts_fired,
                    failures = summary.delivery_failures,
                    "Threshold pass complete"
                );
            }
            Ok(summary) => {
                tracing::debug!(
                    evaluated = summary.evaluated,
                    skipped = summary.skipped,
                    "Threshold pass complete"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "Threshold pass failed to persist portfolio");
            }
        }
    }
}
