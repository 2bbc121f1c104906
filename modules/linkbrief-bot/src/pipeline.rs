use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use tracing::{info, warn};

use linkbrief_common::{Action, Outcome, Rating, Record};

use crate::progress::Stage;
use crate::reconcile::{Mode, Workflow};
use crate::traits::{
    Delivery, Narrator, Notifier, PageScraper, ProgressSink, RecordBuilder, Summarizer,
};

// ---------------------------------------------------------------------------
// Enricher: URL -> Record
// ---------------------------------------------------------------------------

/// Scrapes, summarizes and optionally narrates a page. Scrape, summary and
/// narration failures all degrade instead of failing the record.
pub struct Enricher {
    scraper: Arc<dyn PageScraper>,
    summarizer: Arc<dyn Summarizer>,
    narrator: Option<Arc<dyn Narrator>>,
}

impl Enricher {
    pub fn new(scraper: Arc<dyn PageScraper>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            scraper,
            summarizer,
            narrator: None,
        }
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn Narrator>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    pub fn narrates(&self) -> bool {
        self.narrator.is_some()
    }
}

/// Stand-in record used when the model could not summarize the page.
pub fn fallback_record(url: &str) -> Record {
    Record {
        url: url.trim().to_string(),
        site_name: "제목 없음".to_string(),
        rating: Some(Rating::Medium),
        summary: "요약 생성 실패".to_string(),
        script_ko: "스크립트 생성 실패".to_string(),
        script_en: "Script generation failed".to_string(),
        ..Record::default()
    }
}

#[async_trait]
impl RecordBuilder for Enricher {
    async fn build(&self, url: &str, progress: &dyn ProgressSink) -> Result<Record> {
        progress.stage(url, Stage::Extracting).await;
        let text = match self.scraper.scrape(url).await {
            Ok(text) => text,
            Err(e) => {
                warn!(url, error = %e, "Scrape failed, summarizing without page text");
                String::new()
            }
        };

        progress.stage(url, Stage::Summarizing).await;
        let (mut record, summarized) = match self.summarizer.summarize(url, &text).await {
            Ok(record) => (record, true),
            Err(e) => {
                warn!(url, error = %e, "Summary failed, using fallback record");
                (fallback_record(url), false)
            }
        };
        record.url = url.trim().to_string();
        record.registered_date = Some(chrono::Local::now().date_naive());

        if let Some(narrator) = &self.narrator {
            if summarized && !record.script_en.trim().is_empty() {
                progress.stage(url, Stage::Narrating).await;
                match narrator.narrate(&record.site_name, &record.script_en).await {
                    Ok(narration) => {
                        record.tts_url = Some(narration.url);
                        record.tts_filename = Some(narration.filename);
                        record.tts_file_id = Some(narration.file_id);
                    }
                    Err(e) => warn!(url, error = %e, "Narration failed, continuing without audio"),
                }
            }
        }

        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Pipeline: Workflow + notifiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationStatus {
    Done,
    Failed,
    Disabled,
    NotAttempted,
}

impl NarrationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            NarrationStatus::Done => "✅ Done",
            NarrationStatus::Failed => "❌ Failed",
            NarrationStatus::Disabled => "➖ Disabled",
            NarrationStatus::NotAttempted => "➖ Not attempted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationStatus {
    Sent,
    NotApplicable,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct NotificationResult {
    pub notifier: String,
    pub status: NotificationStatus,
}

/// Everything that happened to one URL. The outcome reflects the store
/// write only; notification failures are listed separately.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub url: String,
    pub outcome: Outcome,
    pub record: Option<Record>,
    pub narration: NarrationStatus,
    pub notifications: Vec<NotificationResult>,
}

impl PipelineReport {
    pub fn notification(&self, name: &str) -> Option<&NotificationStatus> {
        self.notifications
            .iter()
            .find(|n| n.notifier == name)
            .map(|n| &n.status)
    }
}

pub struct Pipeline {
    workflow: Workflow,
    enricher: Enricher,
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl Pipeline {
    pub fn new(workflow: Workflow, enricher: Enricher) -> Self {
        Self {
            workflow,
            enricher,
            notifiers: Vec::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub async fn process(&self, url: &str, mode: &Mode, progress: &dyn ProgressSink) -> PipelineReport {
        info!(url, "Processing URL");
        let run = self.workflow.run(url, mode, &self.enricher, progress).await;

        let narration = match (&run.outcome.action, &run.record) {
            (Action::Skipped, _) | (_, None) => NarrationStatus::NotAttempted,
            (_, Some(record)) if record.tts_url.is_some() => NarrationStatus::Done,
            _ if self.enricher.narrates() => NarrationStatus::Failed,
            _ => NarrationStatus::Disabled,
        };

        let notifications = match &run.record {
            Some(record) => {
                let outcome = &run.outcome;
                join_all(self.notifiers.iter().map(|notifier| async move {
                    let status = match notifier.notify(outcome, record).await {
                        Ok(Delivery::Sent) => NotificationStatus::Sent,
                        Ok(Delivery::NotApplicable) => NotificationStatus::NotApplicable,
                        Err(e) => {
                            warn!(url, notifier = notifier.name(), error = %e, "Notification failed");
                            NotificationStatus::Failed(format!("{e:#}"))
                        }
                    };
                    NotificationResult {
                        notifier: notifier.name().to_string(),
                        status,
                    }
                }))
                .await
            }
            None => Vec::new(),
        };

        info!(
            url,
            action = %run.outcome.action,
            success = run.outcome.success,
            record_id = ?run.outcome.record_id,
            "Finished URL"
        );

        let report = PipelineReport {
            url: url.to_string(),
            outcome: run.outcome,
            record: run.record,
            narration,
            notifications,
        };
        progress.finish(&report).await;
        report
    }
}
