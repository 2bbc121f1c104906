pub mod error;
pub mod types;

pub use error::{DiscordError, Result};
pub use types::{snowflake_cmp, Embed, EmbedField, EmbedFooter, Message, MessagePayload, User};

use std::time::Duration;

use reqwest::{Method, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use types::RateLimitBody;

const BASE_URL: &str = "https://discord.com/api/v10";

/// Attempts per request when Discord answers 429.
const MAX_ATTEMPTS: u32 = 3;

/// Upper bound on how long we honour a `retry_after` before giving up.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct DiscordClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl DiscordClient {
    pub fn new(token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("DiscordBot (linkbrief, 0.1)")
            .build()?;

        Ok(Self {
            client,
            token: token.to_string(),
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| DiscordError::InvalidRequest("base URL cannot be a base".into()))?
            .extend(segments);
        Ok(url)
    }

    /// Send a request, sleeping through up to `MAX_ATTEMPTS` rate limits.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Response> {
        for attempt in 1..=MAX_ATTEMPTS {
            let mut request = self
                .client
                .request(method.clone(), url.clone())
                .header("Authorization", format!("Bot {}", self.token))
                .query(query);
            if let Some(body) = body {
                request = request.json(body);
            } else if method == Method::PUT {
                request = request.header("Content-Length", "0");
            }

            let resp = request.send().await?;
            let status = resp.status();

            if status.as_u16() == 429 {
                let text = resp.text().await.unwrap_or_default();
                let retry_after_secs = serde_json::from_str::<RateLimitBody>(&text)
                    .map(|b| b.retry_after)
                    .unwrap_or(1.0);
                let wait = Duration::from_secs_f64(retry_after_secs.max(0.0));
                if attempt == MAX_ATTEMPTS || wait > MAX_RETRY_AFTER {
                    return Err(DiscordError::RateLimited { retry_after_secs });
                }
                warn!(%url, attempt, retry_after_secs, "Discord rate limited, waiting");
                tokio::time::sleep(wait).await;
                continue;
            }

            if !status.is_success() {
                let message = resp.text().await.unwrap_or_default();
                return Err(DiscordError::Api {
                    status: status.as_u16(),
                    message,
                });
            }
            return Ok(resp);
        }

        Err(DiscordError::RateLimited { retry_after_secs: 0.0 })
    }

    async fn json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T> {
        let resp = self.send(method, url, query, body).await?;
        Ok(resp.json().await?)
    }

    /// The bot's own user, used to ignore its own messages.
    pub async fn current_user(&self) -> Result<User> {
        self.json(Method::GET, self.endpoint(&["users", "@me"])?, &[], None::<&()>)
            .await
    }

    pub async fn send_message(&self, channel_id: &str, payload: &MessagePayload) -> Result<Message> {
        let url = self.endpoint(&["channels", channel_id, "messages"])?;
        let message: Message = self.json(Method::POST, url, &[], Some(payload)).await?;
        debug!(channel_id, message_id = %message.id, "Sent Discord message");
        Ok(message)
    }

    pub async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        payload: &MessagePayload,
    ) -> Result<Message> {
        let url = self.endpoint(&["channels", channel_id, "messages", message_id])?;
        self.json(Method::PATCH, url, &[], Some(payload)).await
    }

    /// React to a message as the bot. `emoji` is the raw unicode emoji.
    pub async fn add_reaction(&self, channel_id: &str, message_id: &str, emoji: &str) -> Result<()> {
        let url = self.endpoint(&[
            "channels",
            channel_id,
            "messages",
            message_id,
            "reactions",
            emoji,
            "@me",
        ])?;
        self.send(Method::PUT, url, &[], None::<&()>).await?;
        Ok(())
    }

    /// Users who reacted with `emoji`, first page (up to 100).
    pub async fn reaction_users(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<Vec<User>> {
        let url = self.endpoint(&[
            "channels",
            channel_id,
            "messages",
            message_id,
            "reactions",
            emoji,
        ])?;
        self.json(Method::GET, url, &[("limit", "100".to_string())], None::<&()>)
            .await
    }

    /// Messages newer than `after`, oldest first. Without `after`, the most
    /// recent `limit` messages.
    pub async fn messages_after(
        &self,
        channel_id: &str,
        after: Option<&str>,
        limit: u8,
    ) -> Result<Vec<Message>> {
        let url = self.endpoint(&["channels", channel_id, "messages"])?;
        let mut query = vec![("limit", limit.clamp(1, 100).to_string())];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let mut messages: Vec<Message> = self.json(Method::GET, url, &query, None::<&()>).await?;
        messages.sort_by(|a, b| snowflake_cmp(&a.id, &b.id));
        Ok(messages)
    }

    /// Id of the newest message in the channel, if any.
    pub async fn latest_message_id(&self, channel_id: &str) -> Result<Option<String>> {
        let messages = self.messages_after(channel_id, None, 1).await?;
        Ok(messages.into_iter().last().map(|m| m.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_encodes_emoji_segment() {
        let client = DiscordClient::new("token").unwrap();
        let url = client
            .endpoint(&["channels", "1", "messages", "2", "reactions", "🔄", "@me"])
            .unwrap();
        assert!(url.as_str().starts_with("https://discord.com/api/v10/channels/1/messages/2/reactions/"));
        assert!(!url.as_str().contains('🔄'));
        assert!(url.as_str().ends_with("/@me"));
    }

    #[test]
    fn message_deserializes_from_api_shape() {
        let message: Message = serde_json::from_str(
            r#"{"id":"10","channel_id":"5","content":"look https://a.dev",
                "author":{"id":"7","username":"kim","bot":false},
                "timestamp":"2024-05-01T00:00:00+00:00","embeds":[]}"#,
        )
        .unwrap();
        assert_eq!(message.author.id, "7");
        assert!(!message.author.bot);
        assert_eq!(message.content, "look https://a.dev");
    }
}
