mod client;
pub(crate) mod types;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{AiError, Result};
use crate::traits::TextGenerator;

use client::GeminiClient;
use types::*;

// =============================================================================
// Gemini Agent
// =============================================================================

#[derive(Clone)]
pub struct Gemini {
    api_key: String,
    model: String,
    system_instruction: Option<String>,
    temperature: Option<f32>,
    base_url: Option<String>,
    http: reqwest::Client,
}

impl Gemini {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            system_instruction: None,
            temperature: None,
            base_url: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn client(&self) -> GeminiClient {
        let client = GeminiClient::new(&self.api_key, self.http.clone());
        match self.base_url {
            Some(ref url) => client.with_base_url(url),
            None => client,
        }
    }

    fn request(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            system_instruction: self.system_instruction.as_deref().map(Content::system),
            generation_config: self.temperature.map(|t| GenerationConfig {
                temperature: Some(t),
                max_output_tokens: None,
            }),
        }
    }

    /// Send one user prompt and return the first candidate's text.
    pub async fn generate_text(&self, prompt: &str) -> Result<String> {
        let response = self
            .client()
            .generate_content(&self.model, &self.request(prompt))
            .await?;

        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
        {
            return Err(AiError::Blocked(reason));
        }

        match response.text() {
            Some(text) => Ok(text),
            None => {
                let finish = response
                    .candidates
                    .first()
                    .and_then(|c| c.finish_reason.clone())
                    .unwrap_or_default();
                warn!(model = %self.model, finish_reason = %finish, "Gemini returned no text");
                Err(AiError::EmptyResponse)
            }
        }
    }
}

#[async_trait]
impl TextGenerator for Gemini {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_text(prompt).await
    }

    fn model(&self) -> &str {
        &self.model
    }
}
