use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::ServiceAccountAuth;
use crate::error::{check, Result};

const TTS_API_URL: &str = "https://texttospeech.googleapis.com/v1";

/// The synthesize endpoint rejects input over 5000 bytes.
pub const MAX_INPUT_BYTES: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioEncoding {
    Mp3,
    OggOpus,
    Linear16,
}

impl AudioEncoding {
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioEncoding::Mp3 => "audio/mpeg",
            AudioEncoding::OggOpus => "audio/ogg",
            AudioEncoding::Linear16 => "audio/wav",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSelection {
    pub language_code: String,
    pub name: String,
}

impl VoiceSelection {
    /// Build from a voice name such as `en-US-Journey-F`; the language code
    /// is its first two dash-separated parts.
    pub fn named(name: &str) -> Self {
        let language_code = name.split('-').take(2).collect::<Vec<_>>().join("-");
        Self {
            language_code,
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: AudioEncoding,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: &'a VoiceSelection,
    audio_config: AudioConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

pub struct TextToSpeech {
    auth: Arc<ServiceAccountAuth>,
    http: reqwest::Client,
    base_url: String,
}

impl TextToSpeech {
    pub fn new(auth: Arc<ServiceAccountAuth>) -> Self {
        Self {
            auth,
            http: reqwest::Client::new(),
            base_url: TTS_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Synthesize `text` and return the decoded audio bytes.
    pub async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceSelection,
        encoding: AudioEncoding,
    ) -> Result<Vec<u8>> {
        let text = truncate_bytes(text, MAX_INPUT_BYTES);
        let token = self.auth.access_token().await?;

        info!(voice = %voice.name, chars = text.chars().count(), "Synthesizing speech");

        let resp = self
            .http
            .post(format!("{}/text:synthesize", self.base_url))
            .bearer_auth(token)
            .json(&SynthesizeRequest {
                input: SynthesisInput { text },
                voice,
                audio_config: AudioConfig {
                    audio_encoding: encoding,
                },
            })
            .send()
            .await?;
        let resp = check(resp).await?;

        let body: SynthesizeResponse = resp.json().await?;
        Ok(STANDARD.decode(body.audio_content)?)
    }
}

fn truncate_bytes(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
