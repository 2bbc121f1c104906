//! Discord embeds for results and duplicate prompts.

use discord_client::Embed;
use linkbrief_common::{Action, Record};

use crate::pipeline::{NotificationStatus, PipelineReport};
use crate::traits::{DuplicateNotice, PromptResolution};

pub const COLOR_CREATED: u32 = 0x2ecc71;
pub const COLOR_UPDATED: u32 = 0x3498db;
pub const COLOR_SKIPPED: u32 = 0x95a5a6;
pub const COLOR_ERROR: u32 = 0xe74c3c;
pub const COLOR_PENDING: u32 = 0xffa500;

pub const EMOJI_UPDATE: &str = "🔄";
pub const EMOJI_SKIP: &str = "❌";

fn action_style(action: Action) -> (&'static str, &'static str, u32) {
    match action {
        Action::Created => ("✅", "created", COLOR_CREATED),
        Action::Updated => ("🔄", "updated", COLOR_UPDATED),
        Action::Skipped => ("⏭️", "skipped as duplicate", COLOR_SKIPPED),
        Action::Error => ("❌", "failed", COLOR_ERROR),
    }
}

fn notification_label(status: Option<&NotificationStatus>) -> String {
    match status {
        Some(NotificationStatus::Sent) => "✅ Sent".to_string(),
        Some(NotificationStatus::NotApplicable) | None => "➖ Not sent".to_string(),
        Some(NotificationStatus::Failed(e)) => format!("❌ Failed: {e}"),
    }
}

/// Final embed for one processed URL.
pub fn result_embed(report: &PipelineReport) -> Embed {
    let outcome = &report.outcome;
    let (emoji, label, color) = action_style(outcome.action);

    if outcome.action == Action::Error {
        return Embed::new(format!("{emoji} Processing failed"))
            .description(outcome.message.clone())
            .color(color)
            .footer(format!("URL: {}", report.url));
    }

    let empty = Record::default();
    let record = report.record.as_ref().unwrap_or(&empty);
    let mut embed = Embed::new(format!("{emoji} Website processed ({label})"))
        .description(format!("**{}**\n{}", record.display_name(), record.summary))
        .color(color)
        .field("Category", record.category.join(", "), true)
        .field(
            "Rating",
            record.rating.map(|r| r.label_ko()).unwrap_or_default(),
            true,
        )
        .field("Use case", record.use_case.clone(), true);

    if outcome.action != Action::Skipped {
        embed = embed
            .field("English narration", report.narration.label(), true)
            .field("Store", format!("✅ {label}"), false)
            .field("Telegram", notification_label(report.notification("telegram")), false);
        if let Some(tts_url) = &record.tts_url {
            embed = embed.field("🎙️ Narration file", format!("[Play]({tts_url})"), false);
        }
    }
    if outcome.is_duplicate {
        embed = embed.field("ℹ️ Duplicate", outcome.message.clone(), false);
    }
    embed.footer(format!("URL: {}", report.url))
}

/// Prompt shown when a posted URL is already stored.
pub fn duplicate_embed(notice: &DuplicateNotice, timeout_secs: u64) -> Embed {
    let existing = &notice.existing.record;
    Embed::new("⚠️ Duplicate URL")
        .description("This URL is already in the database.")
        .color(COLOR_PENDING)
        .field("URL", notice.url.clone(), false)
        .field("Existing site name", existing.display_name().to_string(), true)
        .field(
            "Registered",
            existing
                .registered_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            true,
        )
        .field("Existing category", existing.category.join(", "), true)
        .field(
            "What to do",
            format!(
                "React with {EMOJI_UPDATE} to update or {EMOJI_SKIP} to skip.\n\
                 Skipped automatically after {timeout_secs} seconds without a reaction."
            ),
            false,
        )
        .footer("Waiting for a decision...")
}

/// Restyle a duplicate prompt once it is resolved.
pub fn resolved_embed(embed: Embed, resolution: PromptResolution) -> Embed {
    let (color, footer) = match resolution {
        PromptResolution::Update => (0x00ff00, "Updating..."),
        PromptResolution::Skip => (0xff0000, "Skipped"),
        PromptResolution::NoResponse => (0x808080, "Timed out - skipped automatically"),
    };
    embed.color(color).footer(footer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{NarrationStatus, NotificationResult};
    use crate::testing::{record, stored};
    use linkbrief_common::{Outcome, RecordId};

    fn report(outcome: Outcome, record: Option<Record>) -> PipelineReport {
        PipelineReport {
            url: "https://tool.example".into(),
            outcome,
            record,
            narration: NarrationStatus::Done,
            notifications: vec![NotificationResult {
                notifier: "telegram".into(),
                status: NotificationStatus::Sent,
            }],
        }
    }

    fn field<'a>(embed: &'a Embed, name: &str) -> Option<&'a str> {
        embed
            .fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    #[test]
    fn created_embed_is_green_with_delivery_fields() {
        let embed = result_embed(&report(
            Outcome::created(RecordId::from("rec1")),
            Some(record("https://tool.example", "Tool")),
        ));
        assert_eq!(embed.color, Some(COLOR_CREATED));
        assert!(embed.title.as_deref().unwrap().starts_with("✅"));
        assert_eq!(field(&embed, "Rating"), Some("높음"));
        assert_eq!(field(&embed, "Telegram"), Some("✅ Sent"));
    }

    #[test]
    fn skipped_embed_is_grey_and_explains_duplicate() {
        let existing = stored("https://tool.example", "Tool");
        let outcome = crate::reconcile::writer::skip_outcome(&existing);
        let embed = result_embed(&report(outcome, Some(existing.record)));
        assert_eq!(embed.color, Some(COLOR_SKIPPED));
        assert!(field(&embed, "ℹ️ Duplicate").unwrap().contains("Tool"));
        assert!(field(&embed, "Telegram").is_none());
    }

    #[test]
    fn error_embed_carries_message() {
        let embed = result_embed(&report(Outcome::error("Airtable 422"), None));
        assert_eq!(embed.color, Some(COLOR_ERROR));
        assert_eq!(embed.description.as_deref(), Some("Airtable 422"));
    }

    #[test]
    fn timed_out_prompt_turns_grey() {
        let notice = DuplicateNotice {
            url: "https://tool.example".into(),
            existing: stored("https://tool.example", "Tool"),
        };
        let embed = resolved_embed(duplicate_embed(&notice, 30), PromptResolution::NoResponse);
        assert_eq!(embed.color, Some(0x808080));
        assert_eq!(embed.footer.unwrap().text, "Timed out - skipped automatically");
    }
}
