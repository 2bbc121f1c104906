pub mod error;

pub use error::{Result, TelegramError};

use std::time::Duration;

use serde::{Deserialize, Serialize};

const BASE_URL: &str = "https://api.telegram.org";

/// Telegram rejects messages longer than 4096 characters.
pub const MESSAGE_LIMIT: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    #[serde(rename = "HTML")]
    Html,
    #[serde(rename = "MarkdownV2")]
    MarkdownV2,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<ParseMode>,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<SentMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
}

#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    bot_token: String,
    base_url: String,
}

impl TelegramClient {
    pub fn new(bot_token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            bot_token: bot_token.to_string(),
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<SentMessage> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);
        let text = clip(text, MESSAGE_LIMIT);

        let resp = self
            .client
            .post(&url)
            .json(&SendMessageRequest {
                chat_id,
                text: &text,
                parse_mode,
                disable_web_page_preview: false,
            })
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(TelegramError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: ApiResponse = serde_json::from_str(&body)?;
        match (parsed.ok, parsed.result) {
            (true, Some(sent)) => {
                tracing::debug!(chat_id, message_id = sent.message_id, "Sent Telegram message");
                Ok(sent)
            }
            _ => Err(TelegramError::Api {
                status: status.as_u16(),
                message: parsed.description.unwrap_or(body),
            }),
        }
    }
}

/// Escape text for `parse_mode=HTML`.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn clip(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_html_handles_reserved_characters() {
        assert_eq!(escape_html("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn request_serializes_parse_mode() {
        let json = serde_json::to_value(SendMessageRequest {
            chat_id: "-100",
            text: "hi",
            parse_mode: Some(ParseMode::Html),
            disable_web_page_preview: false,
        })
        .unwrap();
        assert_eq!(json["parse_mode"], "HTML");
        assert_eq!(json["chat_id"], "-100");
    }

    #[test]
    fn error_response_is_parsed() {
        let parsed: ApiResponse =
            serde_json::from_str(r#"{"ok":false,"description":"Bad Request: chat not found"}"#)
                .unwrap();
        assert!(!parsed.ok);
        assert_eq!(parsed.description.as_deref(), Some("Bad Request: chat not found"));
    }
}
