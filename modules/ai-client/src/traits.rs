use async_trait::async_trait;

use crate::error::Result;

// =============================================================================
// TextGenerator Trait
// =============================================================================

/// A single-shot prompt → text completion.
///
/// Callers that only need "send a prompt, get text back" depend on this
/// instead of a concrete provider, so tests can substitute canned output.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}
