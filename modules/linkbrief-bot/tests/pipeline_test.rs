//! Enrichment and reporting around a single URL: degraded scrapes and
//! summaries, narration, notifier isolation and progress stages. No I/O.

use std::sync::Arc;

use linkbrief_bot::pipeline::{Enricher, NarrationStatus, NotificationStatus, Pipeline};
use linkbrief_bot::progress::Stage;
use linkbrief_bot::reconcile::{Mode, WritePolicy, Workflow};
use linkbrief_bot::testing::{
    stored, MemoryStore, MockNarrator, MockScraper, MockSummarizer, NoProgress, RecordingNotifier,
    RecordingProgress,
};
use linkbrief_common::Action;

const URL: &str = "https://notes.example/app";

fn mode() -> Mode {
    Mode::Automatic(WritePolicy::default())
}

fn scraper() -> Arc<MockScraper> {
    Arc::new(MockScraper::new().on_page(URL, "Notes\nA note taking app."))
}

#[tokio::test]
async fn created_record_carries_summary_and_narration() {
    let store = Arc::new(MemoryStore::new());
    let narrator = Arc::new(MockNarrator::new());
    let enricher = Enricher::new(scraper(), Arc::new(MockSummarizer::new())).with_narrator(narrator.clone());
    let pipeline = Pipeline::new(Workflow::new(store.clone()), enricher);

    let report = pipeline.process(URL, &mode(), &NoProgress).await;

    assert_eq!(report.outcome.action, Action::Created);
    assert_eq!(report.narration, NarrationStatus::Done);
    assert_eq!(narrator.calls(), 1);

    let saved = &store.records()[0];
    assert_eq!(saved.site_name, "Notes");
    assert_eq!(saved.url, URL);
    assert!(saved.tts_url.as_deref().is_some_and(|u| u.starts_with("https://drive.google.com/uc?id=")));
    assert!(saved.registered_date.is_some());
}

#[tokio::test]
async fn unreachable_page_is_still_summarized() {
    let store = Arc::new(MemoryStore::new());
    let summarizer = Arc::new(MockSummarizer::new());
    let enricher = Enricher::new(Arc::new(MockScraper::new()), summarizer.clone());
    let pipeline = Pipeline::new(Workflow::new(store.clone()), enricher);

    let report = pipeline.process(URL, &mode(), &NoProgress).await;

    assert_eq!(report.outcome.action, Action::Created);
    assert_eq!(summarizer.seen(), vec![(URL.to_string(), String::new())]);
    assert_eq!(store.records()[0].site_name, "Untitled");
}

#[tokio::test]
async fn failed_summary_saves_fallback_without_narration() {
    let store = Arc::new(MemoryStore::new());
    let narrator = Arc::new(MockNarrator::new());
    let enricher =
        Enricher::new(scraper(), Arc::new(MockSummarizer::failing())).with_narrator(narrator.clone());
    let pipeline = Pipeline::new(Workflow::new(store.clone()), enricher);

    let report = pipeline.process(URL, &mode(), &NoProgress).await;

    assert_eq!(report.outcome.action, Action::Created);
    assert_eq!(narrator.calls(), 0);
    assert_eq!(report.narration, NarrationStatus::Failed);

    let saved = &store.records()[0];
    assert_eq!(saved.site_name, "제목 없음");
    assert_eq!(saved.summary, "요약 생성 실패");
    assert!(saved.tts_url.is_none());
}

#[tokio::test]
async fn narration_failure_does_not_block_the_record() {
    let store = Arc::new(MemoryStore::new());
    let enricher = Enricher::new(scraper(), Arc::new(MockSummarizer::new()))
        .with_narrator(Arc::new(MockNarrator::failing()));
    let pipeline = Pipeline::new(Workflow::new(store.clone()), enricher);

    let report = pipeline.process(URL, &mode(), &NoProgress).await;

    assert_eq!(report.outcome.action, Action::Created);
    assert_eq!(report.narration, NarrationStatus::Failed);
    assert!(store.records()[0].tts_url.is_none());
}

#[tokio::test]
async fn narration_disabled_without_narrator() {
    let pipeline = Pipeline::new(
        Workflow::new(Arc::new(MemoryStore::new())),
        Enricher::new(scraper(), Arc::new(MockSummarizer::new())),
    );

    let report = pipeline.process(URL, &mode(), &NoProgress).await;

    assert_eq!(report.narration, NarrationStatus::Disabled);
}

#[tokio::test]
async fn failing_notifier_does_not_change_the_outcome() {
    let store = Arc::new(MemoryStore::new());
    let broken = Arc::new(RecordingNotifier::failing("telegram"));
    let healthy = Arc::new(RecordingNotifier::new("audit"));
    let pipeline = Pipeline::new(
        Workflow::new(store.clone()),
        Enricher::new(scraper(), Arc::new(MockSummarizer::new())),
    )
    .with_notifier(broken.clone())
    .with_notifier(healthy.clone());

    let report = pipeline.process(URL, &mode(), &NoProgress).await;

    assert_eq!(report.outcome.action, Action::Created);
    assert!(report.outcome.success);
    assert!(matches!(report.notification("telegram"), Some(NotificationStatus::Failed(_))));
    assert_eq!(report.notification("audit"), Some(&NotificationStatus::Sent));
    assert_eq!(healthy.seen().len(), 1);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn skipped_duplicate_notifies_with_existing_record() {
    let existing = stored(URL, "Notes (old)");
    let notifier = Arc::new(RecordingNotifier::new("audit"));
    let pipeline = Pipeline::new(
        Workflow::new(Arc::new(MemoryStore::new().with_record(existing))),
        Enricher::new(scraper(), Arc::new(MockSummarizer::new())),
    )
    .with_notifier(notifier.clone());

    let report = pipeline.process(URL, &mode(), &NoProgress).await;

    assert_eq!(report.outcome.action, Action::Skipped);
    assert_eq!(report.narration, NarrationStatus::NotAttempted);
    let seen = notifier.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].1.site_name, "Notes (old)");
    assert!(seen[0].0.message.contains("Notes (old)"));
}

#[tokio::test]
async fn progress_reports_each_stage_then_finishes() {
    let progress = RecordingProgress::new();
    let pipeline = Pipeline::new(
        Workflow::new(Arc::new(MemoryStore::new())),
        Enricher::new(scraper(), Arc::new(MockSummarizer::new()))
            .with_narrator(Arc::new(MockNarrator::new())),
    );

    pipeline.process(URL, &mode(), &progress).await;

    assert_eq!(
        progress.stages(),
        vec![
            Stage::CheckingDuplicate,
            Stage::Extracting,
            Stage::Summarizing,
            Stage::Narrating,
            Stage::Saving,
        ]
    );
    let finished = progress.finished();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].outcome.action, Action::Created);
}

#[tokio::test]
async fn store_write_failure_is_reported_as_error() {
    let pipeline = Pipeline::new(
        Workflow::new(Arc::new(MemoryStore::new().failing_writes("INVALID_PERMISSIONS"))),
        Enricher::new(scraper(), Arc::new(MockSummarizer::new())),
    );

    let report = pipeline.process(URL, &mode(), &NoProgress).await;

    assert_eq!(report.outcome.action, Action::Error);
    assert!(report.outcome.message.contains("INVALID_PERMISSIONS"));
}
