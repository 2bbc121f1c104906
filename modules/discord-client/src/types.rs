use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub content: String,
    pub author: User,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmbedFooter {
    pub text: String,
}

/// Discord caps embed field values at 1024 characters and descriptions at 4096.
pub const FIELD_VALUE_LIMIT: usize = 1024;
pub const DESCRIPTION_LIMIT: usize = 4096;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
}

impl Embed {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(clip(&description.into(), DESCRIPTION_LIMIT));
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    /// Empty values are rendered as "-" since Discord rejects blank fields.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        let value = value.into();
        let value = if value.trim().is_empty() {
            "-".to_string()
        } else {
            clip(&value, FIELD_VALUE_LIMIT)
        };
        self.fields.push(EmbedField {
            name: name.into(),
            value,
            inline,
        });
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(EmbedFooter { text: text.into() });
        self
    }
}

fn clip(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Body for creating or editing a message.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MessagePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Vec<Embed>>,
}

impl MessagePayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            embeds: None,
        }
    }

    /// Replace the message body with a single embed and clear any text.
    pub fn embed(embed: Embed) -> Self {
        Self {
            content: Some(String::new()),
            embeds: Some(vec![embed]),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RateLimitBody {
    pub retry_after: f64,
}

/// Order two snowflake ids numerically (they are decimal strings of u64).
pub fn snowflake_cmp(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_field_values_become_dash() {
        let embed = Embed::new("t").field("Category", "  ", true);
        assert_eq!(embed.fields[0].value, "-");
        assert!(embed.fields[0].inline);
    }

    #[test]
    fn long_field_values_are_clipped() {
        let long = "a".repeat(FIELD_VALUE_LIMIT + 50);
        let embed = Embed::new("t").field("Summary", long, false);
        assert_eq!(embed.fields[0].value.chars().count(), FIELD_VALUE_LIMIT);
        assert!(embed.fields[0].value.ends_with('…'));
    }

    #[test]
    fn embed_payload_clears_content() {
        let json = serde_json::to_value(MessagePayload::embed(Embed::new("Done").color(0x2ecc71)))
            .unwrap();
        assert_eq!(json["content"], "");
        assert_eq!(json["embeds"][0]["title"], "Done");
        assert_eq!(json["embeds"][0]["color"], 0x2ecc71);
        assert!(json["embeds"][0].get("fields").is_none());
    }

    #[test]
    fn snowflakes_compare_numerically() {
        assert_eq!(snowflake_cmp("99", "100"), Ordering::Less);
        assert_eq!(snowflake_cmp("1234567890123456789", "1234567890123456788"), Ordering::Greater);
    }
}
