use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use thiserror::Error;

use super::types::{ApiResponse, Update};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);
const LONG_POLL_SECS: u64 = 5;
const UPDATES_LIMIT: u32 = 10;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram API returned {status}: {description}")]
    Api { status: u16, description: String },
}

/// Minimal Bot API client bound to one chat.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: Client,
    base_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramClient {
    pub fn new(http: Client, bot_token: String, chat_id: String) -> Self {
        Self {
            http,
            base_url: TELEGRAM_API_BASE.into(),
            bot_token,
            chat_id,
        }
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.bot_token, method)
    }

    /// Send a MarkdownV2 message to the configured chat.
    pub async fn send_message(&self, text: &str) -> Result<(), TelegramError> {
        let body = json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "MarkdownV2",
        });

        let resp = self
            .http
            .post(self.method_url("sendMessage"))
            .timeout(SEND_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let description = resp
                .json::<ApiResponse<serde_json::Value>>()
                .await
                .ok()
                .and_then(|r| r.description)
                .unwrap_or_default();
            return Err(TelegramError::Api {
                status: status.as_u16(),
                description,
            });
        }
        Ok(())
    }

    /// Long-poll for updates starting at `offset`.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, TelegramError> {
        let mut query = vec![
            ("timeout", LONG_POLL_SECS.to_string()),
            ("limit", UPDATES_LIMIT.to_string()),
        ];
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }

        let resp = self
            .http
            .get(self.method_url("getUpdates"))
            .query(&query)
            .timeout(SEND_TIMEOUT + Duration::from_secs(LONG_POLL_SECS))
            .send()
            .await?;

        let status = resp.status();
        let body: ApiResponse<Vec<Update>> = resp.json().await?;
        if !body.ok {
            return Err(TelegramError::Api {
                status: status.as_u16(),
                description: body.description.unwrap_or_default(),
            });
        }
        Ok(body.result.unwrap_or_default())
    }
}

/// Offset for the next `getUpdates` call: one past the highest id seen.
pub fn next_offset(current: Option<i64>, updates: &[Update]) -> Option<i64> {
    updates
        .iter()
        .map(|u| u.update_id + 1)
        .chain(current)
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn updates(json: &str) -> Vec<Update> {
        let body: ApiResponse<Vec<Update>> = serde_json::from_str(json).unwrap();
        assert!(body.ok);
        body.result.unwrap()
    }

    #[test]
    fn test_parse_updates() {
        let list = updates(
            r#"{"ok":true,"result":[
                {"update_id":10,"message":{"message_id":1,"chat":{"id":42,"type":"private"},"text":"report"}},
                {"update_id":11,"edited_message":{"message_id":1,"chat":{"id":42},"text":"buy Apple AAPL 150"}},
                {"update_id":12,"message":{"message_id":2,"chat":{"id":42},"sticker":{}}}
            ]}"#,
        );
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].any_message().unwrap().text.as_deref(), Some("report"));
        assert_eq!(
            list[1].any_message().unwrap().text.as_deref(),
            Some("buy Apple AAPL 150")
        );
        assert!(list[2].any_message().unwrap().text.is_none());
    }

    #[test]
    fn test_next_offset() {
        let list = updates(r#"{"ok":true,"result":[{"update_id":7},{"update_id":5}]}"#);
        assert_eq!(next_offset(None, &list), Some(8));
        assert_eq!(next_offset(Some(20), &list), Some(20));
        assert_eq!(next_offset(Some(3), &[]), Some(3));
        assert_eq!(next_offset(None, &[]), None);
    }

    #[test]
    fn test_error_envelope() {
        let body: ApiResponse<Vec<Update>> =
            serde_json::from_str(r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#).unwrap();
        assert!(!body.ok);
        assert!(body.result.is_none());
        assert_eq!(body.description.as_deref(), Some("Unauthorized"));
    }
}
