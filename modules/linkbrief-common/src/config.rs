use std::path::PathBuf;
use std::time::Duration;

use crate::error::LinkBriefError;

type Result<T> = std::result::Result<T, LinkBriefError>;

/// How the chat listener resolves duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateMode {
    /// Ask the user who posted the link.
    Interactive,
    /// Apply `UPDATE_IF_DUPLICATE` without asking.
    Auto,
}

/// Application configuration loaded once from the environment at start-up.
#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub discord_channel_id: String,
    pub poll_interval: Duration,
    pub max_concurrent_messages: usize,

    // Generative text
    pub gemini_api_key: String,
    pub gemini_model: String,

    // Telegram
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,

    // Airtable
    pub airtable_api_key: String,
    pub airtable_base_id: String,
    pub airtable_table_name: String,

    // Duplicate policy
    pub check_duplicates: bool,
    pub update_if_duplicate: bool,
    pub duplicate_mode: DuplicateMode,
    pub duplicate_prompt_timeout: Duration,

    // Narration
    pub google_credentials: Option<PathBuf>,
    pub drive_folder_id: String,
    pub tts_voice: String,
    pub tts_enabled: bool,

    // Batch migration
    pub migration_sheet_id: String,
    pub migration_sheet_name: String,
    pub process_delay: Duration,
}

impl Config {
    /// Config for the chat bot. Discord settings are required.
    pub fn bot_from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|k| std::env::var(k).ok(), Target::Bot)
    }

    /// Config for the batch migration. The spreadsheet id is required.
    pub fn migration_from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|k| std::env::var(k).ok(), Target::Migration)
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>, target: Target) -> Result<Self> {
        let get = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| LinkBriefError::Config(format!("{key} is required")))
        };
        let required_for = |key: &str, needed: bool| {
            if needed {
                required(key)
            } else {
                Ok(get(key).unwrap_or_default())
            }
        };
        let flag = |key: &str, default: bool| -> Result<bool> {
            match get(key) {
                None => Ok(default),
                Some(v) => parse_bool(&v)
                    .ok_or_else(|| LinkBriefError::Config(format!("{key} must be true or false, got {v:?}"))),
            }
        };
        let secs = |key: &str, default: u64| -> Result<Duration> {
            match get(key) {
                None => Ok(Duration::from_secs(default)),
                Some(v) => v
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| LinkBriefError::Config(format!("{key} must be a number of seconds"))),
            }
        };

        let duplicate_mode = match get("DUPLICATE_MODE").as_deref() {
            None | Some("interactive") => DuplicateMode::Interactive,
            Some("auto") | Some("automatic") => DuplicateMode::Auto,
            Some(other) => {
                return Err(LinkBriefError::Config(format!(
                    "DUPLICATE_MODE must be interactive or auto, got {other:?}"
                )))
            }
        };

        let max_concurrent_messages = match get("MAX_CONCURRENT_MESSAGES") {
            None => 4,
            Some(v) => v
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    LinkBriefError::Config("MAX_CONCURRENT_MESSAGES must be a positive number".into())
                })?,
        };

        let google_credentials = get("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from);
        let tts_enabled = flag("TTS_ENABLED", true)? && google_credentials.is_some();

        Ok(Self {
            discord_token: required_for("DISCORD_TOKEN", target == Target::Bot)?,
            discord_channel_id: required_for("DISCORD_CHANNEL_ID", target == Target::Bot)?,
            poll_interval: secs("DISCORD_POLL_INTERVAL_SECS", 3)?,
            max_concurrent_messages,
            gemini_api_key: required("GEMINI_API_KEY")?,
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| "gemini-1.5-pro".to_string()),
            telegram_bot_token: get("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: get("TELEGRAM_CHAT_ID"),
            airtable_api_key: required("AIRTABLE_API_KEY")?,
            airtable_base_id: required("AIRTABLE_BASE_ID")?,
            airtable_table_name: required("AIRTABLE_TABLE_NAME")?,
            check_duplicates: flag("CHECK_DUPLICATES", true)?,
            update_if_duplicate: flag("UPDATE_IF_DUPLICATE", false)?,
            duplicate_mode,
            duplicate_prompt_timeout: secs("DUPLICATE_PROMPT_TIMEOUT_SECS", 30)?,
            google_credentials,
            drive_folder_id: get("GOOGLE_DRIVE_FOLDER_ID").unwrap_or_else(|| "root".to_string()),
            tts_voice: get("TTS_VOICE").unwrap_or_else(|| "en-US-Journey-F".to_string()),
            tts_enabled,
            migration_sheet_id: required_for("MIGRATION_SHEET_ID", target == Target::Migration)?,
            migration_sheet_name: get("MIGRATION_SHEET_NAME")
                .unwrap_or_else(|| "migration_tooly".to_string()),
            process_delay: secs("PROCESS_DELAY_SECS", 30)?,
        })
    }

    /// Telegram chat target when both token and chat id are set.
    pub fn telegram(&self) -> Option<(&str, &str)> {
        match (&self.telegram_bot_token, &self.telegram_chat_id) {
            (Some(token), Some(chat)) => Some((token.as_str(), chat.as_str())),
            _ => None,
        }
    }

    /// Log which settings are present, showing only a prefix of each secret.
    pub fn log_redacted(&self) {
        fn preview(val: &str) -> String {
            if val.is_empty() {
                return "<not set>".to_string();
            }
            let n = val.char_indices().nth(5).map(|(i, _)| i).unwrap_or(val.len());
            format!("{}...({} chars)", &val[..n], val.len())
        }
        fn preview_opt(val: &Option<String>) -> String {
            val.as_deref().map(preview).unwrap_or_else(|| "<not set>".to_string())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  DISCORD_TOKEN: {}", preview(&self.discord_token));
        tracing::info!("  DISCORD_CHANNEL_ID: {}", self.discord_channel_id);
        tracing::info!("  GEMINI_API_KEY: {}", preview(&self.gemini_api_key));
        tracing::info!("  GEMINI_MODEL: {}", self.gemini_model);
        tracing::info!("  TELEGRAM_BOT_TOKEN: {}", preview_opt(&self.telegram_bot_token));
        tracing::info!("  AIRTABLE_API_KEY: {}", preview(&self.airtable_api_key));
        tracing::info!("  AIRTABLE_TABLE_NAME: {}", self.airtable_table_name);
        tracing::info!(
            "  CHECK_DUPLICATES: {} UPDATE_IF_DUPLICATE: {} DUPLICATE_MODE: {:?}",
            self.check_duplicates,
            self.update_if_duplicate,
            self.duplicate_mode
        );
        tracing::info!("  TTS_ENABLED: {} voice={}", self.tts_enabled, self.tts_voice);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Bot,
    Migration,
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
