//! Alert delivery

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::types::{AlertError, Result};

/// Characters of the message that take part in dedup
const DEDUP_PREFIX_CHARS: usize = 160;
const TELEGRAM_API: &str = "https://api.telegram.org";

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

/// Hex SHA-256 of the first 160 characters
pub fn message_hash(text: &str) -> String {
    let prefix: String = text.chars().take(DEDUP_PREFIX_CHARS).collect();
    hex::encode(Sha256::digest(prefix.as_bytes()))
}

/// Telegram `sendMessage` with Markdown, suppressing back-to-back duplicates
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
    last_hash: Mutex<Option<String>>,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_id: String) -> Result<Self> {
        Self::with_api_base(TELEGRAM_API, token, chat_id)
    }

    pub fn with_api_base(api_base: &str, token: String, chat_id: String) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            chat_id,
            last_hash: Mutex::new(None),
        })
    }

    fn is_duplicate(&self, hash: &str) -> bool {
        self.last_hash
            .lock()
            .map(|last| last.as_deref() == Some(hash))
            .unwrap_or(false)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let hash = message_hash(text);
        if self.is_duplicate(&hash) {
            debug!("Duplicate alert suppressed");
            return Ok(());
        }

        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "chat_id": self.chat_id,
                "text": text,
                "parse_mode": "Markdown",
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AlertError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if let Ok(mut last) = self.last_hash.lock() {
            *last = Some(hash);
        }
        Ok(())
    }
}

/// Prints alerts when no Telegram credentials are configured
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        println!("\n--- ALERT ---\n{}\n-------------\n", text);
        Ok(())
    }
}

/// Telegram when both credentials are present, console otherwise
pub fn notifier_from_env() -> Result<Box<dyn Notifier>> {
    let token = std::env::var("TELEGRAM_BOT_TOKEN").ok().filter(|v| !v.is_empty());
    let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok().filter(|v| !v.is_empty());
    match (token, chat_id) {
        (Some(token), Some(chat_id)) => {
            info!("Delivering alerts to Telegram");
            Ok(Box::new(TelegramNotifier::new(token, chat_id)?))
        }
        _ => {
            info!("Telegram credentials missing, printing alerts to stdout");
            Ok(Box::new(ConsoleNotifier))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_covers_prefix_only() {
        let base = "x".repeat(160);
        assert_eq!(message_hash(&format!("{}tail-a", base)), message_hash(&format!("{}tail-b", base)));
        assert_ne!(message_hash("alert one"), message_hash("alert two"));
        assert_eq!(message_hash("abc").len(), 64);
    }

    #[tokio::test]
    async fn test_console_never_fails() {
        assert!(ConsoleNotifier.send("hello").await.is_ok());
    }
}
