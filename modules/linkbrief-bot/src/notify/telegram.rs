use anyhow::{Context, Result};
use async_trait::async_trait;

use linkbrief_common::{Action, Outcome, Record};
use telegram_client::{escape_html, ParseMode, TelegramClient};

use crate::traits::{Delivery, Notifier};

pub struct TelegramNotifier {
    client: TelegramClient,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(client: TelegramClient, chat_id: &str) -> Self {
        Self {
            client,
            chat_id: chat_id.to_string(),
        }
    }
}

fn action_label(action: Action) -> &'static str {
    match action {
        Action::Created => "new",
        Action::Updated => "updated",
        Action::Skipped => "duplicate, skipped",
        Action::Error => "failed",
    }
}

/// HTML message body for a written record.
pub fn render_message(outcome: &Outcome, record: &Record) -> String {
    let mut text = format!(
        "📝 Website summary ({})\n\n{}\n\n{}",
        action_label(outcome.action),
        escape_html(&record.summary),
        escape_html(&record.url)
    );
    if let Some(tts_url) = record.tts_url.as_deref().filter(|u| u.starts_with("http")) {
        text.push_str(&format!("\n\n🎙️ English narration: {}", escape_html(tts_url)));
    }
    text
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    /// Only new and updated records are announced.
    async fn notify(&self, outcome: &Outcome, record: &Record) -> Result<Delivery> {
        if !matches!(outcome.action, Action::Created | Action::Updated) {
            return Ok(Delivery::NotApplicable);
        }
        self.client
            .send_message(&self.chat_id, &render_message(outcome, record), Some(ParseMode::Html))
            .await
            .context("Telegram sendMessage failed")?;
        Ok(Delivery::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkbrief_common::RecordId;

    #[test]
    fn message_has_summary_url_and_escaped_html() {
        let mut record = Record::new("https://tool.example/?a=1&b=2");
        record.summary = "Writes <b>drafts</b>".into();

        let text = render_message(&Outcome::created(RecordId::from("rec1")), &record);

        assert!(text.starts_with("📝 Website summary (new)"));
        assert!(text.contains("Writes &lt;b&gt;drafts&lt;/b&gt;"));
        assert!(text.contains("https://tool.example/?a=1&amp;b=2"));
        assert!(!text.contains("narration"));
    }

    #[test]
    fn narration_link_is_appended() {
        let mut record = Record::new("https://tool.example");
        record.tts_url = Some("https://drive.google.com/uc?id=abc".into());

        let text = render_message(&Outcome::updated(RecordId::from("rec1")), &record);

        assert!(text.contains("(updated)"));
        assert!(text.ends_with("🎙️ English narration: https://drive.google.com/uc?id=abc"));
    }
}
