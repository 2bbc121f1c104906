use std::sync::Arc;

use async_trait::async_trait;
use discord_client::{DiscordClient, MessagePayload};
use tracing::{debug, warn};

use crate::notify::discord::result_embed;
use crate::pipeline::PipelineReport;
use crate::traits::ProgressSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CheckingDuplicate,
    Extracting,
    Summarizing,
    Narrating,
    Saving,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::CheckingDuplicate => "🔍 **Checking for duplicates...**",
            Stage::Extracting => "📄 **Extracting page content...**",
            Stage::Summarizing => "🤖 **Summarizing...**",
            Stage::Narrating => "🎙️ **Generating narration...**",
            Stage::Saving => "💾 **Saving record...**",
        }
    }
}

/// Discards progress. Used by batch runs.
pub struct NoProgress;

#[async_trait]
impl ProgressSink for NoProgress {
    async fn stage(&self, _url: &str, _stage: Stage) {}
}

/// Logs stage transitions.
pub struct LogProgress;

#[async_trait]
impl ProgressSink for LogProgress {
    async fn stage(&self, url: &str, stage: Stage) {
        debug!(url, ?stage, "Stage");
    }
}

/// Edits one Discord status message as the URL moves through the pipeline,
/// then replaces it with the result embed.
pub struct DiscordProgress {
    client: Arc<DiscordClient>,
    channel_id: String,
    message_id: String,
}

impl DiscordProgress {
    pub fn new(client: Arc<DiscordClient>, channel_id: &str, message_id: &str) -> Self {
        Self {
            client,
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
        }
    }

    async fn edit(&self, payload: MessagePayload) {
        if let Err(e) = self
            .client
            .edit_message(&self.channel_id, &self.message_id, &payload)
            .await
        {
            warn!(message_id = %self.message_id, error = %e, "Failed to edit status message");
        }
    }
}

#[async_trait]
impl ProgressSink for DiscordProgress {
    async fn stage(&self, url: &str, stage: Stage) {
        self.edit(MessagePayload::text(format!("{}\nURL: {url}", stage.label())))
            .await;
    }

    async fn finish(&self, report: &PipelineReport) {
        self.edit(MessagePayload::embed(result_embed(report))).await;
    }
}
