// Seams between the reconciliation core and the outside world.
//
// RecordStore: the tabular store (Airtable in production).
// OperatorPrompt: asks a human whether to overwrite a duplicate.
// RecordBuilder: turns a URL into a Record (scrape, summarize, narrate).
// Notifier / ProgressSink: report what happened.
//
// Every seam has an in-memory double in `testing`.

use anyhow::Result;
use async_trait::async_trait;

use linkbrief_common::{CanonicalUrl, FieldSet, Outcome, Record, RecordId, StoredRecord};

use crate::pipeline::PipelineReport;
use crate::progress::Stage;

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Records whose stored URL may normalize to `url`, in the store's native
    /// order. May return extra candidates; callers compare normalized URLs.
    /// A transport or auth failure is an `Err`, never an empty list.
    async fn find_by_url(&self, url: &CanonicalUrl) -> Result<Vec<StoredRecord>>;

    async fn create(&self, fields: &FieldSet) -> Result<RecordId>;

    /// Partial update: fields absent from `fields` keep their stored values.
    async fn update(&self, id: &RecordId, fields: &FieldSet) -> Result<()>;

    /// Every stored URL, as written.
    async fn list_urls(&self) -> Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// OperatorPrompt
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorChoice {
    Update,
    Skip,
}

/// How a duplicate prompt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptResolution {
    Update,
    Skip,
    NoResponse,
}

impl PromptResolution {
    pub fn updates(&self) -> bool {
        matches!(self, PromptResolution::Update)
    }
}

/// What the operator is shown.
#[derive(Debug, Clone)]
pub struct DuplicateNotice {
    pub url: String,
    pub existing: StoredRecord,
}

#[async_trait]
pub trait OperatorPrompt: Send + Sync {
    /// Present the duplicate and wait for a choice. May wait indefinitely;
    /// the caller bounds the wait and drops the future on timeout.
    /// `Ok(None)` means the prompt gave up without an answer.
    async fn ask(&self, notice: &DuplicateNotice) -> Result<Option<OperatorChoice>>;

    /// Reflect the final resolution back to the operator.
    async fn conclude(&self, _notice: &DuplicateNotice, _resolution: PromptResolution) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PageScraper: Send + Sync {
    /// Readable text of the page. Empty when nothing could be extracted.
    async fn scrape(&self, url: &str) -> Result<String>;
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Structured summary of `page_text`. `url` is the page it came from.
    async fn summarize(&self, url: &str, page_text: &str) -> Result<Record>;
}

/// An uploaded narration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narration {
    pub url: String,
    pub filename: String,
    pub file_id: String,
}

#[async_trait]
pub trait Narrator: Send + Sync {
    async fn narrate(&self, site_name: &str, script: &str) -> Result<Narration>;
}

#[async_trait]
pub trait RecordBuilder: Send + Sync {
    /// Build the record for `url`. Reports its own stages to `progress`.
    async fn build(&self, url: &str, progress: &dyn ProgressSink) -> Result<Record>;
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// The notifier does not report this kind of outcome.
    NotApplicable,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, outcome: &Outcome, record: &Record) -> Result<Delivery>;
}

/// Receives stage transitions for one URL. Implementations swallow their
/// own delivery errors.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn stage(&self, url: &str, stage: Stage);

    async fn finish(&self, _report: &PipelineReport) {}
}
