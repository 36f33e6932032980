use async_trait::async_trait;
use thiserror::Error;

use crate::models::{currency_symbol, AlertKind, AlertRecord};
use crate::services::report::{format_number, format_pct};
use crate::telegram::{escape_markdown_v2, TelegramClient, TelegramError};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error(transparent)]
    Telegram(#[from] TelegramError),

    #[error("notifier unavailable: {0}")]
    Unavailable(String),
}

/// Destination for alert and report text. Callers decide what a failure means.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

#[async_trait]
impl AlertSink for TelegramClient {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        self.send_message(text).await?;
        tracing::debug!(chars = text.len(), "Telegram message sent");
        Ok(())
    }
}

/// Used when no Telegram credentials are configured: every message is
/// logged and counts as delivered.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        tracing::info!(message = %text, "Notification (Telegram not configured)");
        Ok(())
    }
}

/// Format a fired threshold alert as MarkdownV2.
pub fn format_alert(alert: &AlertRecord) -> String {
    let (icon, title, level_label) = match alert.kind {
        AlertKind::AddBuy => ("📉", "Additional buy", "Buy level"),
        AlertKind::TakeProfit => ("💰", "Take profit", "Take-profit level"),
        AlertKind::Target => ("🏁", "Target reached", "Target"),
    };
    let sym = currency_symbol(&alert.ticker);
    let sign = if alert.percent_offset.is_sign_negative() { "-" } else { "+" };

    let header = format!(
        "{} *{}* — {}",
        icon,
        escape_markdown_v2(title),
        escape_markdown_v2(&format!("[{}] {}", alert.name, alert.ticker)),
    );
    let body = format!(
        "- Purchase: {sym}{}\n- Current: {sym}{}\n- {level_label}: {sym}{} ({sign}{}%)",
        format_number(alert.purchase_price),
        format_number(alert.current_price),
        format_number(alert.threshold_price),
        format_pct(alert.percent_offset),
    );

    format!("{}\n{}", header, escape_markdown_v2(&body))
}
