use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use discord_client::{DiscordClient, Message, MessagePayload};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use linkbrief_common::{extract_urls, DuplicateMode};

use crate::pipeline::Pipeline;
use crate::progress::{DiscordProgress, LogProgress};
use crate::prompt::DiscordPrompt;
use crate::reconcile::{Mode, WritePolicy};
use crate::traits::ProgressSink;

const FETCH_LIMIT: u8 = 50;

/// Duplicate handling for messages from the chat channel.
#[derive(Debug, Clone, Copy)]
pub struct ListenerPolicy {
    pub duplicate_mode: DuplicateMode,
    pub write: WritePolicy,
    pub prompt_timeout: Duration,
}

impl ListenerPolicy {
    /// Interactive prompting only makes sense when duplicates are checked.
    pub fn interactive(&self) -> bool {
        self.write.check_duplicates && self.duplicate_mode == DuplicateMode::Interactive
    }
}

/// Polls one channel for new messages and runs each linked URL through the
/// pipeline.
pub struct ChatListener {
    client: Arc<DiscordClient>,
    channel_id: String,
    pipeline: Arc<Pipeline>,
    policy: ListenerPolicy,
    poll_interval: Duration,
    permits: Arc<Semaphore>,
}

impl ChatListener {
    pub fn new(
        client: Arc<DiscordClient>,
        channel_id: &str,
        pipeline: Arc<Pipeline>,
        policy: ListenerPolicy,
    ) -> Self {
        Self {
            client,
            channel_id: channel_id.to_string(),
            pipeline,
            policy,
            poll_interval: Duration::from_secs(3),
            permits: Arc::new(Semaphore::new(4)),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(max.max(1)));
        self
    }

    /// Poll until `shutdown` resolves, then wait for in-flight messages.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let me = self
            .client
            .current_user()
            .await
            .context("Failed to identify bot user")?;
        let mut last_seen = self
            .client
            .latest_message_id(&self.channel_id)
            .await
            .context("Failed to read channel")?;

        info!(
            bot = %me.username,
            channel_id = %self.channel_id,
            interactive = self.policy.interactive(),
            check_duplicates = self.policy.write.check_duplicates,
            update_if_duplicate = self.policy.write.update_if_duplicate,
            "Listening for links"
        );

        tokio::pin!(shutdown);
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            let messages = match self
                .client
                .messages_after(&self.channel_id, last_seen.as_deref(), FETCH_LIMIT)
                .await
            {
                Ok(messages) => messages,
                Err(e) => {
                    warn!(error = %e, "Channel poll failed");
                    continue;
                }
            };

            for message in messages {
                last_seen = Some(message.id.clone());
                if message.author.id == me.id {
                    continue;
                }
                let urls = extract_urls(&message.content);
                if urls.is_empty() {
                    continue;
                }
                info!(message_id = %message.id, author = %message.author.username, urls = urls.len(), "Links received");

                let job = MessageJob {
                    client: self.client.clone(),
                    pipeline: self.pipeline.clone(),
                    policy: self.policy,
                    message,
                    urls,
                };
                let permits = self.permits.clone();
                tasks.spawn(async move {
                    let Ok(_permit) = permits.acquire_owned().await else {
                        return;
                    };
                    job.run().await;
                });
            }

            while let Some(joined) = tasks.try_join_next() {
                if let Err(e) = joined {
                    warn!(error = %e, "Message task panicked");
                }
            }
        }

        info!(in_flight = tasks.len(), "Shutting down, waiting for in-flight messages");
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Message task panicked");
            }
        }
        Ok(())
    }
}

/// The URLs of one chat message, processed in order.
struct MessageJob {
    client: Arc<DiscordClient>,
    pipeline: Arc<Pipeline>,
    policy: ListenerPolicy,
    message: Message,
    urls: Vec<String>,
}

impl MessageJob {
    async fn run(self) {
        let channel_id = self.message.channel_id.as_str();
        let mode = if self.policy.interactive() {
            let prompt = DiscordPrompt::new(self.client.clone(), channel_id, &self.message.author.id)
                .with_timeout(self.policy.prompt_timeout);
            Mode::Interactive {
                prompt: Arc::new(prompt),
                timeout: self.policy.prompt_timeout,
            }
        } else {
            Mode::Automatic(self.policy.write)
        };

        for url in &self.urls {
            let status = MessagePayload::text(format!("🔄 **Starting website summary**\nURL: {url}"));
            let progress: Box<dyn ProgressSink> =
                match self.client.send_message(channel_id, &status).await {
                    Ok(m) => Box::new(DiscordProgress::new(self.client.clone(), channel_id, &m.id)),
                    Err(e) => {
                        warn!(url, error = %e, "Failed to post status message, progress goes to the log");
                        Box::new(LogProgress)
                    }
                };
            self.pipeline.process(url, &mode, progress.as_ref()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(mode: DuplicateMode, check_duplicates: bool) -> ListenerPolicy {
        ListenerPolicy {
            duplicate_mode: mode,
            write: WritePolicy {
                check_duplicates,
                update_if_duplicate: false,
            },
            prompt_timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn interactive_requires_duplicate_checks() {
        assert!(policy(DuplicateMode::Interactive, true).interactive());
        assert!(!policy(DuplicateMode::Interactive, false).interactive());
        assert!(!policy(DuplicateMode::Auto, true).interactive());
    }
}
