pub mod api;
pub mod config;
pub mod engine;
pub mod errors;
pub mod market;
pub mod metrics;
pub mod models;
pub mod services;
pub mod store;
pub mod telegram;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};

use crate::api::ws_types::WsMessage;
use crate::config::AppConfig;
use crate::market::QuoteProvider;
use crate::services::{AlertSink, ThresholdMonitor};
use crate::store::PortfolioStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<PortfolioStore>>,
    pub config: AppConfig,
    pub quotes: Arc<dyn QuoteProvider>,
    pub sink: Arc<dyn AlertSink>,
    pub monitor: ThresholdMonitor,
    pub alerts_enabled: Arc<AtomicBool>,
    pub ws_tx: broadcast::Sender<WsMessage>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
