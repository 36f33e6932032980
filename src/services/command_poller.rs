use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::{broadcast, Mutex};
use tokio::time::sleep;

use crate::api::ws_types::{RemovedPosition, WsMessage};
use crate::engine::ThresholdStrategy;
use crate::market::QuoteProvider;
use crate::models::Position;
use crate::services::notifier::AlertSink;
use crate::services::report::{build_full_report, build_position_report};
use crate::store::PortfolioStore;
use crate::telegram::client::next_offset;
use crate::telegram::{escape_markdown_v2, parse_command, Command, TelegramClient};

/// Everything a chat command may touch.
#[derive(Clone)]
pub struct CommandContext {
    pub store: Arc<Mutex<PortfolioStore>>,
    pub quotes: Arc<dyn QuoteProvider>,
    pub strategy: ThresholdStrategy,
    pub ws_tx: Option<broadcast::Sender<WsMessage>>,
}

impl CommandContext {
    fn publish(&self, msg: WsMessage) {
        if let Some(tx) = &self.ws_tx {
            let _ = tx.send(msg);
        }
    }
}

/// Apply one chat message and return the reply, if any. Malformed commands
/// never touch the store.
pub async fn handle_message(ctx: &CommandContext, text: &str) -> Option<String> {
    let command = match parse_command(text) {
        Ok(Some(cmd)) => cmd,
        Ok(None) => return None,
        Err(e) => {
            tracing::info!(error = %e, text = %text, "Rejected malformed command");
            return Some(escape_markdown_v2(&format!("⚠️ {e}")));
        }
    };
    counter!("commands_processed_total").increment(1);

    match command {
        Command::Buy { name, ticker, price } => {
            let position = match Position::new(name, &ticker, price) {
                Ok(p) => p,
                Err(e) => return Some(escape_markdown_v2(&format!("⚠️ {e}"))),
            };

            let idx = {
                let mut store = ctx.store.lock().await;
                if let Err(e) = store.upsert_by_ticker(position.clone()) {
                    tracing::error!(error = %e, ticker = %position.ticker, "Failed to persist new position");
                }
                store.len()
            };
            tracing::info!(
                ticker = %position.ticker,
                price = %position.purchase_price,
                "Position added via chat command"
            );
            ctx.publish(WsMessage::PositionUpdate(position.clone()));

            let report = build_position_report(idx, &position, ctx.quotes.as_ref(), &ctx.strategy).await;
            Some(format!(
                "🫡 {}\n{}",
                escape_markdown_v2("Order received. Tactical report:"),
                report
            ))
        }
        Command::Remove { ticker } => {
            let removed = ctx.store.lock().await.remove(&ticker);
            let reply = match removed {
                Ok(Some(_)) => {
                    tracing::info!(ticker = %ticker, "Position removed via chat command");
                    ctx.publish(WsMessage::PositionRemoved(RemovedPosition { ticker: ticker.clone() }));
                    format!("Stopped tracking {ticker}.")
                }
                Ok(None) => format!("{ticker} is not being tracked."),
                Err(e) => {
                    tracing::error!(error = %e, ticker = %ticker, "Failed to persist removal");
                    format!("Stopped tracking {ticker}, but saving failed.")
                }
            };
            Some(escape_markdown_v2(&reply))
        }
        Command::Report => {
            let positions = ctx.store.lock().await.positions().to_vec();
            Some(build_full_report(&positions, ctx.quotes.as_ref(), &ctx.strategy).await)
        }
    }
}

/// Poll the bot for new messages every `interval_secs` and answer them.
/// Messages from chats other than the configured one are ignored.
pub async fn run_command_poller(
    client: TelegramClient,
    sink: Arc<dyn AlertSink>,
    ctx: CommandContext,
    interval_secs: u64,
) {
    tracing::info!(interval_secs = interval_secs, "Telegram command poller started");

    let allowed_chat: Option<i64> = client.chat_id().parse().ok();
    let mut offset: Option<i64> = None;

    loop {
        sleep(Duration::from_secs(interval_secs)).await;

        let updates = match client.get_updates(offset).await {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(error = %e, "Command poller: getUpdates failed");
                continue;
            }
        };
        offset = next_offset(offset, &updates);

        for update in &updates {
            let Some(message) = update.any_message() else {
                continue;
            };
            if allowed_chat.is_some_and(|id| id != message.chat.id) {
                tracing::debug!(chat_id = message.chat.id, "Ignoring message from another chat");
                continue;
            }
            let Some(text) = message.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
                continue;
            };

            if let Some(reply) = handle_message(&ctx, text).await {
                if let Err(e) = sink.send(&reply).await {
                    tracing::warn!(error = %e, "Failed to send command reply");
                }
            }
        }
    }
}
