use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};

use tactical_alert::api::router::create_router;
use tactical_alert::api::ws_types::WsMessage;
use tactical_alert::config::AppConfig;
use tactical_alert::market::{CachedQuotes, QuoteProvider, YahooQuoteClient};
use tactical_alert::services::{
    run_command_poller, run_threshold_monitor, AlertSink, CommandContext, LogSink,
    ThresholdMonitor,
};
use tactical_alert::store::{PortfolioStore, StoreLock};
use tactical_alert::telegram::TelegramClient;
use tactical_alert::AppState;

const USER_AGENT: &str = concat!("tactical-alert/", env!("CARGO_PKG_VERSION"));

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);
    let metrics_handle = tactical_alert::metrics::init_metrics();

    // Single owner of the portfolio file for the life of the process
    let _lock = StoreLock::acquire(&config.portfolio_file)?;
    let store = Arc::new(Mutex::new(PortfolioStore::load(&config.portfolio_file)));

    let http = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(15))
        .build()?;

    let quotes: Arc<dyn QuoteProvider> = Arc::new(CachedQuotes::new(
        YahooQuoteClient::new(
            http.clone(),
            config.quote_api_base.clone(),
            config.quote_history_range.clone(),
        ),
        Duration::from_secs(config.quote_cache_ttl_secs),
    ));

    let telegram = config
        .telegram_credentials()
        .map(|(token, chat_id)| TelegramClient::new(http.clone(), token, chat_id));

    let sink: Arc<dyn AlertSink> = match &telegram {
        Some(client) => Arc::new(client.clone()),
        None => {
            tracing::warn!("No Telegram credentials, alerts will only be logged");
            Arc::new(LogSink)
        }
    };

    let (ws_tx, _) = broadcast::channel::<WsMessage>(256);
    let strategy = config.strategy();
    let alerts_enabled = Arc::new(AtomicBool::new(config.alerts_enabled));

    // --- Threshold monitor ---
    let monitor = ThresholdMonitor::new(
        store.clone(),
        quotes.clone(),
        sink.clone(),
        strategy,
        config.latch_policy,
    )
    .with_broadcast(ws_tx.clone());

    {
        let monitor = monitor.clone();
        let enabled = alerts_enabled.clone();
        let interval_secs = config.monitor_interval_secs;
        tokio::spawn(async move {
            run_threshold_monitor(monitor, enabled, interval_secs).await;
        });
    }

    // --- Telegram command poller ---
    match (&telegram, config.command_poll_enabled) {
        (Some(client), true) => {
            let ctx = CommandContext {
                store: store.clone(),
                quotes: quotes.clone(),
                strategy,
                ws_tx: Some(ws_tx.clone()),
            };
            let client = client.clone();
            let sink = sink.clone();
            let interval_secs = config.command_poll_interval_secs;
            tokio::spawn(async move {
                run_command_poller(client, sink, ctx, interval_secs).await;
            });
        }
        (None, true) => {
            tracing::info!("Command poller not started (Telegram not configured)");
        }
        (_, false) => {
            tracing::info!("Command poller disabled (COMMAND_POLL_ENABLED=false)");
        }
    }

    let state = AppState {
        store,
        config,
        quotes,
        sink,
        monitor,
        alerts_enabled,
        ws_tx,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Dashboard API listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down cleanly");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM so the store lock is released on either.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();
}
