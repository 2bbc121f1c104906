//! Duplicate reconciliation through the full pipeline.
//!
//! Every seam is an in-memory double from `linkbrief_bot::testing`. No I/O.

use std::sync::Arc;
use std::time::Duration;

use linkbrief_bot::pipeline::{Enricher, Pipeline};
use linkbrief_bot::reconcile::{Mode, WritePolicy, Workflow};
use linkbrief_bot::testing::{
    stored, MemoryStore, MockScraper, MockSummarizer, NoProgress, ScriptedPrompt,
};
use linkbrief_bot::traits::{OperatorChoice, PromptResolution};
use linkbrief_common::{Action, RecordField};

fn automatic(check_duplicates: bool, update_if_duplicate: bool) -> Mode {
    Mode::Automatic(WritePolicy {
        check_duplicates,
        update_if_duplicate,
    })
}

fn interactive(prompt: Arc<ScriptedPrompt>, timeout: Duration) -> Mode {
    Mode::Interactive { prompt, timeout }
}

struct Harness {
    store: Arc<MemoryStore>,
    summarizer: Arc<MockSummarizer>,
    pipeline: Pipeline,
}

fn harness(store: MemoryStore) -> Harness {
    let store = Arc::new(store);
    let summarizer = Arc::new(MockSummarizer::new());
    let scraper = MockScraper::new()
        .on_page("https://tool.example", "Tool\nA tool for things.")
        .on_page("http://www.Tool.example/", "Tool v2\nNow with more things.");
    let enricher = Enricher::new(Arc::new(scraper), summarizer.clone());
    Harness {
        pipeline: Pipeline::new(Workflow::new(store.clone()), enricher),
        store,
        summarizer,
    }
}

// =========================================================================
// Automatic mode
// =========================================================================

#[tokio::test]
async fn same_url_twice_creates_once_then_skips() {
    let h = harness(MemoryStore::new());
    let mode = automatic(true, false);

    let first = h.pipeline.process("https://tool.example", &mode, &NoProgress).await;
    let second = h.pipeline.process("https://tool.example", &mode, &NoProgress).await;

    assert_eq!(first.outcome.action, Action::Created);
    assert_eq!(second.outcome.action, Action::Skipped);
    assert!(second.outcome.is_duplicate);
    assert_eq!(second.outcome.record_id, first.outcome.record_id);
    assert_eq!(h.store.count_url("https://tool.example"), 1);
    assert_eq!(h.summarizer.seen().len(), 1, "skip must not summarize again");
}

#[tokio::test]
async fn equivalent_spellings_are_one_record() {
    let h = harness(MemoryStore::new());
    let mode = automatic(true, false);

    h.pipeline.process("https://tool.example", &mode, &NoProgress).await;
    let again = h.pipeline.process("http://www.Tool.example/", &mode, &NoProgress).await;

    assert_eq!(again.outcome.action, Action::Skipped);
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn update_if_duplicate_rewrites_the_existing_record() {
    let h = harness(MemoryStore::new());

    let first = h
        .pipeline
        .process("https://tool.example", &automatic(true, false), &NoProgress)
        .await;
    let second = h
        .pipeline
        .process("http://www.Tool.example/", &automatic(true, true), &NoProgress)
        .await;

    assert_eq!(second.outcome.action, Action::Updated);
    assert_eq!(second.outcome.record_id, first.outcome.record_id);
    assert_eq!(h.store.len(), 1);

    let id = second.outcome.record_id.expect("updated id");
    let fields = h.store.fields(&id).expect("record still present");
    assert_eq!(fields.text(RecordField::SiteName), Some("Tool v2"));
}

#[tokio::test]
async fn disabled_duplicate_check_always_creates() {
    let h = harness(MemoryStore::new());
    let mode = automatic(false, false);

    let first = h.pipeline.process("https://tool.example", &mode, &NoProgress).await;
    let second = h.pipeline.process("https://tool.example", &mode, &NoProgress).await;

    assert_eq!(first.outcome.action, Action::Created);
    assert_eq!(second.outcome.action, Action::Created);
    assert_eq!(h.store.count_url("https://tool.example"), 2);
    assert_eq!(h.store.find_calls(), 0);
}

#[tokio::test]
async fn concurrent_submissions_of_one_url_create_one_record() {
    let h = harness(MemoryStore::new());
    let mode = automatic(true, false);

    let (a, b) = tokio::join!(
        h.pipeline.process("https://tool.example", &mode, &NoProgress),
        h.pipeline.process("http://www.Tool.example/", &mode, &NoProgress),
    );

    let mut actions = vec![a.outcome.action, b.outcome.action];
    actions.sort_by_key(|a| a.as_str());
    assert_eq!(actions, vec![Action::Created, Action::Skipped]);
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn lookup_failure_is_an_error_without_writes() {
    let h = harness(MemoryStore::new().failing_reads("rate limited"));

    let report = h
        .pipeline
        .process("https://tool.example", &automatic(true, false), &NoProgress)
        .await;

    assert_eq!(report.outcome.action, Action::Error);
    assert!(!report.outcome.success);
    assert!(report.outcome.message.contains("rate limited"));
    assert_eq!(h.store.write_calls(), 0);
    assert!(h.summarizer.seen().is_empty());
}

// =========================================================================
// Interactive mode
// =========================================================================

#[tokio::test]
async fn operator_update_rewrites_existing() {
    let existing = stored("https://tool.example", "Tool");
    let id = existing.id.clone();
    let h = harness(MemoryStore::new().with_record(existing));
    let prompt = Arc::new(ScriptedPrompt::answering(OperatorChoice::Update));

    let report = h
        .pipeline
        .process(
            "http://www.Tool.example/",
            &interactive(prompt.clone(), Duration::from_secs(30)),
            &NoProgress,
        )
        .await;

    assert_eq!(report.outcome.action, Action::Updated);
    assert_eq!(report.outcome.record_id, Some(id));
    assert_eq!(prompt.resolutions(), vec![PromptResolution::Update]);
}

#[tokio::test]
async fn operator_skip_leaves_store_untouched() {
    let h = harness(MemoryStore::new().with_record(stored("https://tool.example", "Tool")));
    let prompt = Arc::new(ScriptedPrompt::answering(OperatorChoice::Skip));

    let report = h
        .pipeline
        .process(
            "https://tool.example",
            &interactive(prompt.clone(), Duration::from_secs(30)),
            &NoProgress,
        )
        .await;

    assert_eq!(report.outcome.action, Action::Skipped);
    assert_eq!(h.store.write_calls(), 0);
    assert!(h.summarizer.seen().is_empty());
}

#[tokio::test(start_paused = true)]
async fn silent_operator_times_out_to_skip() {
    let h = harness(MemoryStore::new().with_record(stored("https://tool.example", "Tool")));
    let prompt = Arc::new(ScriptedPrompt::silent());
    let skipping = Arc::new(ScriptedPrompt::answering(OperatorChoice::Skip));

    let skip = h
        .pipeline
        .process(
            "https://tool.example",
            &interactive(skipping, Duration::from_secs(30)),
            &NoProgress,
        )
        .await;
    let started = tokio::time::Instant::now();
    let report = h
        .pipeline
        .process(
            "https://tool.example",
            &interactive(prompt.clone(), Duration::from_secs(30)),
            &NoProgress,
        )
        .await;

    assert!(started.elapsed() >= Duration::from_secs(30));
    assert_eq!(report.outcome, skip.outcome);
    assert_eq!(skip.outcome.action, Action::Skipped);
    assert_eq!(prompt.resolutions(), vec![PromptResolution::NoResponse]);
    assert_eq!(h.store.write_calls(), 0);
}

#[tokio::test]
async fn broken_prompt_counts_as_no_response() {
    let h = harness(MemoryStore::new().with_record(stored("https://tool.example", "Tool")));
    let prompt = Arc::new(ScriptedPrompt::failing("missing permissions"));

    let report = h
        .pipeline
        .process(
            "https://tool.example",
            &interactive(prompt.clone(), Duration::from_secs(30)),
            &NoProgress,
        )
        .await;

    assert_eq!(report.outcome.action, Action::Skipped);
    assert_eq!(prompt.resolutions(), vec![PromptResolution::NoResponse]);
}

#[tokio::test]
async fn new_url_never_prompts() {
    let h = harness(MemoryStore::new());
    let prompt = Arc::new(ScriptedPrompt::answering(OperatorChoice::Skip));

    let report = h
        .pipeline
        .process(
            "https://tool.example",
            &interactive(prompt.clone(), Duration::from_secs(30)),
            &NoProgress,
        )
        .await;

    assert_eq!(report.outcome.action, Action::Created);
    assert_eq!(prompt.asked(), 0);
}
