use std::sync::{Arc, LazyLock};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone};
use regex::Regex;
use tracing::{info, warn};

use google_client::{AudioEncoding, Drive, ServiceAccountAuth, TextToSpeech, VoiceSelection};

use crate::traits::{Narration, Narrator};

const MAX_NAME_CHARS: usize = 30;

static FORBIDDEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());

/// English script → Cloud TTS MP3 → public Drive file.
pub struct GoogleNarrator {
    tts: TextToSpeech,
    drive: Drive,
    voice: VoiceSelection,
    folder_id: String,
}

impl GoogleNarrator {
    pub fn new(auth: Arc<ServiceAccountAuth>, voice: &str, folder_id: &str) -> Self {
        Self {
            tts: TextToSpeech::new(auth.clone()),
            drive: Drive::new(auth),
            voice: VoiceSelection::named(voice),
            folder_id: folder_id.to_string(),
        }
    }
}

#[async_trait]
impl Narrator for GoogleNarrator {
    async fn narrate(&self, site_name: &str, script: &str) -> Result<Narration> {
        if script.trim().is_empty() {
            anyhow::bail!("Nothing to narrate");
        }

        let audio = self
            .tts
            .synthesize(script, &self.voice, AudioEncoding::Mp3)
            .await
            .context("Speech synthesis failed")?;

        let filename = narration_filename(site_name, &chrono::Local::now());
        let file = self
            .drive
            .upload(&filename, &self.folder_id, AudioEncoding::Mp3.mime_type(), &audio)
            .await
            .context("Drive upload failed")?;

        if let Err(e) = self.drive.share_public(&file.id).await {
            warn!(file_id = %file.id, error = %e, "Could not make narration public");
        }

        info!(file_id = %file.id, filename = %filename, bytes = audio.len(), "Narration uploaded");
        Ok(Narration {
            url: file.download_url(),
            filename,
            file_id: file.id,
        })
    }
}

/// `[YYYY-MM-DD] HHMM <site name>.mp3`
pub fn narration_filename<Tz: TimeZone>(site_name: &str, at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "[{}] {} {}.mp3",
        at.format("%Y-%m-%d"),
        at.format("%H%M"),
        sanitize_name(site_name)
    )
}

/// Strip characters that are awkward in file names, collapse whitespace and
/// cap the length.
pub fn sanitize_name(name: &str) -> String {
    let cleaned = FORBIDDEN_RE.replace_all(name, "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let clipped: String = collapsed.chars().take(MAX_NAME_CHARS).collect();
    let clipped = clipped.trim();
    if clipped.is_empty() {
        "unknown".to_string()
    } else {
        clipped.to_string()
    }
}
