use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use linkbrief_common::{CanonicalUrl, DuplicateCheckResult, Outcome, Record, StoredRecord};

use super::lock::UrlLocks;
use super::resolver::DuplicateResolver;
use super::writer::{skip_outcome, RecordWriter, WritePolicy};
use crate::progress::Stage;
use crate::traits::{
    DuplicateNotice, OperatorChoice, OperatorPrompt, ProgressSink, PromptResolution, RecordBuilder,
    RecordStore,
};

/// How long an operator has to answer a duplicate prompt.
pub const OPERATOR_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub enum Mode {
    /// Fixed policy, no human involved.
    Automatic(WritePolicy),
    /// Duplicates are put to an operator; silence counts as skip.
    Interactive {
        prompt: Arc<dyn OperatorPrompt>,
        timeout: Duration,
    },
}

impl Mode {
    pub fn interactive(prompt: Arc<dyn OperatorPrompt>) -> Self {
        Mode::Interactive {
            prompt,
            timeout: OPERATOR_TIMEOUT,
        }
    }

    fn checks_duplicates(&self) -> bool {
        match self {
            Mode::Automatic(policy) => policy.check_duplicates,
            Mode::Interactive { .. } => true,
        }
    }
}

/// Result of reconciling one URL.
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    pub outcome: Outcome,
    /// The record that was written, or the existing one when skipped.
    pub record: Option<Record>,
}

impl WorkflowRun {
    fn failed(outcome: Outcome) -> Self {
        Self {
            outcome,
            record: None,
        }
    }
}

/// Per-URL state machine: check, decide, build, write.
///
/// The duplicate check runs before the record is built so skipped URLs cost
/// no scraping or summarization. The store is not held across the operator
/// pause; a per-URL lock only serializes concurrent runs for the same URL
/// within this process.
#[derive(Clone)]
pub struct Workflow {
    resolver: DuplicateResolver,
    writer: RecordWriter,
    locks: UrlLocks,
}

impl Workflow {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            resolver: DuplicateResolver::new(store.clone()),
            writer: RecordWriter::new(store),
            locks: UrlLocks::new(),
        }
    }

    pub async fn run(
        &self,
        url: &str,
        mode: &Mode,
        builder: &dyn RecordBuilder,
        progress: &dyn ProgressSink,
    ) -> WorkflowRun {
        let canonical = CanonicalUrl::normalize(url);
        let _guard = self.locks.acquire(&canonical).await;

        let (check, update) = if mode.checks_duplicates() && !canonical.is_empty() {
            progress.stage(url, Stage::CheckingDuplicate).await;
            let check = self.resolver.find_duplicate(url).await;

            if let Some(error) = &check.error {
                return WorkflowRun::failed(Outcome::error(format!(
                    "Duplicate check failed: {error}"
                )));
            }

            match check.existing() {
                Some(existing) => {
                    if !self.decide_update(url, &existing, mode).await {
                        info!(url = %canonical, record_id = %existing.id, "Duplicate skipped");
                        return WorkflowRun {
                            outcome: skip_outcome(&existing),
                            record: Some(existing.record),
                        };
                    }
                    (check, true)
                }
                None => (check, false),
            }
        } else {
            (DuplicateCheckResult::none(), false)
        };

        let mut record = match builder.build(url, progress).await {
            Ok(record) => record,
            Err(e) => {
                warn!(url = %canonical, error = %e, "Failed to build record");
                return WorkflowRun::failed(
                    Outcome::error(format!("Failed to build record: {e:#}"))
                        .with_duplicate(check.is_duplicate),
                );
            }
        };
        if record.canonical_url() != canonical {
            record.url = url.trim().to_string();
        }

        progress.stage(url, Stage::Saving).await;
        let outcome = self.writer.write_resolved(&record, &check, update).await;
        WorkflowRun {
            outcome,
            record: Some(record),
        }
    }

    async fn decide_update(&self, url: &str, existing: &StoredRecord, mode: &Mode) -> bool {
        let (prompt, timeout) = match mode {
            Mode::Automatic(policy) => return policy.update_if_duplicate,
            Mode::Interactive { prompt, timeout } => (prompt, *timeout),
        };

        let notice = DuplicateNotice {
            url: url.to_string(),
            existing: existing.clone(),
        };
        let resolution = match tokio::time::timeout(timeout, prompt.ask(&notice)).await {
            Ok(Ok(Some(OperatorChoice::Update))) => PromptResolution::Update,
            Ok(Ok(Some(OperatorChoice::Skip))) => PromptResolution::Skip,
            Ok(Ok(None)) | Err(_) => PromptResolution::NoResponse,
            Ok(Err(e)) => {
                warn!(url, error = %e, "Operator prompt failed, treating as no response");
                PromptResolution::NoResponse
            }
        };
        info!(url, ?resolution, "Duplicate prompt resolved");

        if let Err(e) = prompt.conclude(&notice, resolution).await {
            warn!(url, error = %e, "Failed to show prompt resolution");
        }
        resolution.updates()
    }
}
