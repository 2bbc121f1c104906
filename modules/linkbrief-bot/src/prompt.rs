use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use discord_client::{DiscordClient, Embed, MessagePayload};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::notify::discord::{duplicate_embed, resolved_embed, EMOJI_SKIP, EMOJI_UPDATE};
use crate::reconcile::OPERATOR_TIMEOUT;
use crate::traits::{DuplicateNotice, OperatorChoice, OperatorPrompt, PromptResolution};

const REACTION_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Asks the user who posted a link, via reactions on a duplicate embed.
/// One instance serves the URLs of one chat message, in order.
pub struct DiscordPrompt {
    client: Arc<DiscordClient>,
    channel_id: String,
    requester_id: String,
    timeout: Duration,
    /// The prompt message currently on screen, for `conclude`.
    posted: Mutex<Option<(String, Embed)>>,
}

impl DiscordPrompt {
    pub fn new(client: Arc<DiscordClient>, channel_id: &str, requester_id: &str) -> Self {
        Self {
            client,
            channel_id: channel_id.to_string(),
            requester_id: requester_id.to_string(),
            timeout: OPERATOR_TIMEOUT,
            posted: Mutex::new(None),
        }
    }

    /// The wait advertised in the embed. The caller enforces it.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn reacted(&self, message_id: &str, emoji: &str) -> Result<bool> {
        let users = self
            .client
            .reaction_users(&self.channel_id, message_id, emoji)
            .await?;
        Ok(users.iter().any(|u| u.id == self.requester_id))
    }
}

#[async_trait]
impl OperatorPrompt for DiscordPrompt {
    async fn ask(&self, notice: &DuplicateNotice) -> Result<Option<OperatorChoice>> {
        let embed = duplicate_embed(notice, self.timeout.as_secs());
        let message = self
            .client
            .send_message(&self.channel_id, &MessagePayload::embed(embed.clone()))
            .await
            .context("Failed to post duplicate prompt")?;
        *self.posted.lock().await = Some((message.id.clone(), embed));

        for emoji in [EMOJI_UPDATE, EMOJI_SKIP] {
            self.client
                .add_reaction(&self.channel_id, &message.id, emoji)
                .await
                .context("Failed to add prompt reaction")?;
        }

        loop {
            tokio::time::sleep(REACTION_POLL_INTERVAL).await;
            match self.reacted(&message.id, EMOJI_UPDATE).await {
                Ok(true) => return Ok(Some(OperatorChoice::Update)),
                Ok(false) => {}
                Err(e) => warn!(message_id = %message.id, error = %e, "Reaction poll failed"),
            }
            match self.reacted(&message.id, EMOJI_SKIP).await {
                Ok(true) => return Ok(Some(OperatorChoice::Skip)),
                Ok(false) => {}
                Err(e) => warn!(message_id = %message.id, error = %e, "Reaction poll failed"),
            }
            debug!(message_id = %message.id, "No decision yet");
        }
    }

    async fn conclude(&self, _notice: &DuplicateNotice, resolution: PromptResolution) -> Result<()> {
        let Some((message_id, embed)) = self.posted.lock().await.take() else {
            return Ok(());
        };
        self.client
            .edit_message(
                &self.channel_id,
                &message_id,
                &MessagePayload::embed(resolved_embed(embed, resolution)),
            )
            .await
            .context("Failed to update duplicate prompt")?;
        Ok(())
    }
}
