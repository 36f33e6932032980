use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;

use crate::engine::ThresholdStrategy;
use crate::market::yahoo_client::YAHOO_API_BASE;
use crate::services::LatchPolicy;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub portfolio_file: PathBuf,

    // Telegram (both required to enable delivery and commands)
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,

    // Threshold monitor
    pub alerts_enabled: bool,
    pub monitor_interval_secs: u64,
    pub threshold_strategy: String,
    pub add_buy_pct: Decimal,
    pub take_profit_pct: Decimal,
    pub target_pct: Decimal,
    pub latch_policy: LatchPolicy,

    // Command polling
    pub command_poll_enabled: bool,
    pub command_poll_interval_secs: u64,

    // Quotes
    pub quote_api_base: String,
    pub quote_cache_ttl_secs: u64,
    pub quote_history_range: String,

    pub api_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            portfolio_file: PathBuf::from("portfolio_db.json"),
            telegram_bot_token: None,
            telegram_chat_id: None,
            alerts_enabled: true,
            monitor_interval_secs: 60,
            threshold_strategy: "fixed".into(),
            add_buy_pct: Decimal::from(12),
            take_profit_pct: Decimal::from(10),
            target_pct: Decimal::from(25),
            latch_policy: LatchPolicy::AfterDelivery,
            command_poll_enabled: true,
            command_poll_interval_secs: 5,
            quote_api_base: YAHOO_API_BASE.into(),
            quote_cache_ttl_secs: 20,
            quote_history_range: "5d".into(),
            api_token: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let d = Self::default();

        Ok(Self {
            host: env::var("HOST").unwrap_or(d.host),
            port: env::var("PORT")
                .unwrap_or_else(|_| d.port.to_string())
                .parse()?,
            portfolio_file: env::var("PORTFOLIO_FILE")
                .map(PathBuf::from)
                .unwrap_or(d.portfolio_file),

            telegram_bot_token: non_empty("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: non_empty("TELEGRAM_CHAT_ID"),

            alerts_enabled: parse_or("ALERTS_ENABLED", d.alerts_enabled),
            monitor_interval_secs: parse_or("MONITOR_INTERVAL_SECS", d.monitor_interval_secs),
            threshold_strategy: env::var("THRESHOLD_STRATEGY").unwrap_or(d.threshold_strategy),
            add_buy_pct: parse_or("ADD_BUY_PCT", d.add_buy_pct),
            take_profit_pct: parse_or("TAKE_PROFIT_PCT", d.take_profit_pct),
            target_pct: parse_or("TARGET_PCT", d.target_pct),
            latch_policy: env::var("LATCH_POLICY")
                .map(|s| LatchPolicy::from_name(&s))
                .unwrap_or(d.latch_policy),

            command_poll_enabled: parse_or("COMMAND_POLL_ENABLED", d.command_poll_enabled),
            command_poll_interval_secs: parse_or(
                "COMMAND_POLL_INTERVAL_SECS",
                d.command_poll_interval_secs,
            ),

            quote_api_base: env::var("QUOTE_API_BASE").unwrap_or(d.quote_api_base),
            quote_cache_ttl_secs: parse_or("QUOTE_CACHE_TTL_SECS", d.quote_cache_ttl_secs),
            quote_history_range: env::var("QUOTE_HISTORY_RANGE").unwrap_or(d.quote_history_range),

            api_token: non_empty("API_TOKEN"),
        })
    }

    /// Bot token and chat id, if both are configured.
    pub fn telegram_credentials(&self) -> Option<(String, String)> {
        match (&self.telegram_bot_token, &self.telegram_chat_id) {
            (Some(token), Some(chat)) => Some((token.clone(), chat.clone())),
            _ => None,
        }
    }

    pub fn strategy(&self) -> ThresholdStrategy {
        ThresholdStrategy::from_name(
            &self.threshold_strategy,
            self.add_buy_pct,
            self.take_profit_pct,
            self.target_pct,
        )
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key = key, value = %raw, "Unparseable config value, using default");
            default
        }),
        Err(_) => default,
    }
}
