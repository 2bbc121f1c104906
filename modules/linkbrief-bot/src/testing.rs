// In-memory doubles for every seam in `traits`.
//
// - MemoryStore (RecordStore): ordered Vec of rows, partial-update semantics,
//   injectable read/write failures, call counters
// - ScriptedPrompt (OperatorPrompt): fixed answer, silence, or error
// - StaticBuilder (RecordBuilder): returns a canned record
// - MockScraper / MockSummarizer / MockNarrator: URL-keyed canned responses
// - RecordingNotifier / RecordingProgress: capture what they were given
// - MemorySheet (SheetSource): rows plus a log of status writes

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::NaiveDate;

use linkbrief_common::{
    CanonicalUrl, FieldSet, Outcome, Rating, Record, RecordId, StoredRecord,
};

use crate::migration::{SheetRow, SheetSource};
use crate::pipeline::PipelineReport;
use crate::progress::Stage;
use crate::traits::{
    Delivery, DuplicateNotice, Narration, Narrator, Notifier, OperatorChoice, OperatorPrompt,
    PageScraper, ProgressSink, PromptResolution, RecordBuilder, RecordStore, Summarizer,
};

pub use crate::progress::NoProgress;

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

fn next_id() -> RecordId {
    RecordId(format!("rec{:05}", NEXT_ID.fetch_add(1, Ordering::Relaxed)))
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A fully populated record for `url`.
pub fn record(url: &str, site_name: &str) -> Record {
    Record {
        url: url.to_string(),
        site_name: site_name.to_string(),
        category: vec!["AI".to_string(), "Productivity".to_string()],
        rating: Some(Rating::High),
        summary: format!("{site_name} helps you get things done."),
        script_ko: "스크립트".to_string(),
        script_en: format!("Meet {site_name}."),
        registered_date: NaiveDate::from_ymd_opt(2024, 5, 1),
        ..Record::default()
    }
}

/// A record as if already persisted, with a fresh id.
pub fn stored(url: &str, site_name: &str) -> StoredRecord {
    StoredRecord {
        id: next_id(),
        record: record(url, site_name),
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<(RecordId, FieldSet)>>,
    read_error: Option<String>,
    write_error: Option<String>,
    find_calls: AtomicUsize,
    write_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, record: StoredRecord) -> Self {
        self.rows
            .lock()
            .unwrap()
            .push((record.id, record.record.to_field_set()));
        self
    }

    /// Every lookup fails with `message`.
    pub fn failing_reads(mut self, message: &str) -> Self {
        self.read_error = Some(message.to_string());
        self
    }

    /// Every create/update fails with `message`.
    pub fn failing_writes(mut self, message: &str) -> Self {
        self.write_error = Some(message.to_string());
        self
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.rows.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn fields(&self, id: &RecordId) -> Option<FieldSet> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|(rid, _)| rid == id)
            .map(|(_, f)| f.clone())
    }

    pub fn records(&self) -> Vec<Record> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .map(|(_, f)| Record::from_field_set(f))
            .collect()
    }

    /// Rows whose URL normalizes to `url`.
    pub fn count_url(&self, url: &str) -> usize {
        let canonical = CanonicalUrl::normalize(url);
        self.records()
            .iter()
            .filter(|r| r.canonical_url() == canonical)
            .count()
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_by_url(&self, url: &CanonicalUrl) -> Result<Vec<StoredRecord>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = &self.read_error {
            bail!("MemoryStore: {msg}");
        }
        // Mimic a substring prefilter: return anything containing the host/path.
        let needle = url.without_scheme();
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, f)| {
                Record::from_field_set(f)
                    .url
                    .to_lowercase()
                    .contains(needle)
            })
            .map(|(id, f)| StoredRecord {
                id: id.clone(),
                record: Record::from_field_set(f),
            })
            .collect())
    }

    async fn create(&self, fields: &FieldSet) -> Result<RecordId> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = &self.write_error {
            bail!("MemoryStore: {msg}");
        }
        let id = next_id();
        self.rows.lock().unwrap().push((id.clone(), fields.clone()));
        Ok(id)
    }

    async fn update(&self, id: &RecordId, fields: &FieldSet) -> Result<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = &self.write_error {
            bail!("MemoryStore: {msg}");
        }
        let mut rows = self.rows.lock().unwrap();
        let (_, existing) = rows
            .iter_mut()
            .find(|(rid, _)| rid == id)
            .ok_or_else(|| anyhow!("MemoryStore: no record {id}"))?;
        for (field, value) in fields.iter() {
            existing.set(field, value.clone());
        }
        Ok(())
    }

    async fn list_urls(&self) -> Result<Vec<String>> {
        if let Some(msg) = &self.read_error {
            bail!("MemoryStore: {msg}");
        }
        Ok(self.records().into_iter().map(|r| r.url).collect())
    }
}

// ---------------------------------------------------------------------------
// ScriptedPrompt
// ---------------------------------------------------------------------------

enum Script {
    Answer(OperatorChoice),
    Silent,
    Fail(String),
}

pub struct ScriptedPrompt {
    script: Script,
    asked: AtomicUsize,
    resolutions: Mutex<Vec<PromptResolution>>,
}

impl ScriptedPrompt {
    fn with(script: Script) -> Self {
        Self {
            script,
            asked: AtomicUsize::new(0),
            resolutions: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(choice: OperatorChoice) -> Self {
        Self::with(Script::Answer(choice))
    }

    /// Never answers.
    pub fn silent() -> Self {
        Self::with(Script::Silent)
    }

    pub fn failing(message: &str) -> Self {
        Self::with(Script::Fail(message.to_string()))
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }

    pub fn resolutions(&self) -> Vec<PromptResolution> {
        self.resolutions.lock().unwrap().clone()
    }
}

#[async_trait]
impl OperatorPrompt for ScriptedPrompt {
    async fn ask(&self, _notice: &DuplicateNotice) -> Result<Option<OperatorChoice>> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Answer(choice) => Ok(Some(*choice)),
            Script::Silent => std::future::pending().await,
            Script::Fail(msg) => bail!("ScriptedPrompt: {msg}"),
        }
    }

    async fn conclude(&self, _notice: &DuplicateNotice, resolution: PromptResolution) -> Result<()> {
        self.resolutions.lock().unwrap().push(resolution);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// StaticBuilder
// ---------------------------------------------------------------------------

pub struct StaticBuilder {
    site_name: String,
    url: Option<String>,
    error: Option<String>,
    calls: AtomicUsize,
}

impl StaticBuilder {
    pub fn new(site_name: &str) -> Self {
        Self {
            site_name: site_name.to_string(),
            url: None,
            error: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::new("")
        }
    }

    /// Report a different URL than the one asked for.
    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordBuilder for StaticBuilder {
    async fn build(&self, url: &str, _progress: &dyn ProgressSink) -> Result<Record> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = &self.error {
            bail!("StaticBuilder: {msg}");
        }
        Ok(record(self.url.as_deref().unwrap_or(url), &self.site_name))
    }
}

// ---------------------------------------------------------------------------
// Enrichment mocks
// ---------------------------------------------------------------------------

/// URL → page text. Unregistered URLs fail.
#[derive(Default)]
pub struct MockScraper {
    pages: HashMap<String, String>,
}

impl MockScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_page(mut self, url: &str, text: &str) -> Self {
        self.pages.insert(url.to_string(), text.to_string());
        self
    }
}

#[async_trait]
impl PageScraper for MockScraper {
    async fn scrape(&self, url: &str) -> Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("MockScraper: no page registered for {url}"))
    }
}

/// Builds a record from the page text: the first line becomes the site name.
/// Fails when `failing` is set.
#[derive(Default)]
pub struct MockSummarizer {
    failing: bool,
    seen: Mutex<Vec<(String, String)>>,
}

impl MockSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// `(url, page_text)` pairs it was asked to summarize.
    pub fn seen(&self) -> Vec<(String, String)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, url: &str, page_text: &str) -> Result<Record> {
        self.seen
            .lock()
            .unwrap()
            .push((url.to_string(), page_text.to_string()));
        if self.failing {
            bail!("MockSummarizer: model unavailable");
        }
        let name = page_text.lines().next().unwrap_or("").trim();
        let name = if name.is_empty() { "Untitled" } else { name };
        let mut record = record(url, name);
        record.registered_date = None;
        Ok(record)
    }
}

pub struct MockNarrator {
    failing: bool,
    calls: AtomicUsize,
}

impl MockNarrator {
    pub fn new() -> Self {
        Self {
            failing: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Narrator for MockNarrator {
    async fn narrate(&self, site_name: &str, _script: &str) -> Result<Narration> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            bail!("MockNarrator: TTS quota exceeded");
        }
        Ok(Narration {
            url: format!("https://drive.google.com/uc?id=file{n}"),
            filename: format!("{site_name}.mp3"),
            file_id: format!("file{n}"),
        })
    }
}

// ---------------------------------------------------------------------------
// Reporting doubles
// ---------------------------------------------------------------------------

pub struct RecordingNotifier {
    name: String,
    failing: bool,
    seen: Mutex<Vec<(Outcome, Record)>>,
}

impl RecordingNotifier {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            failing: false,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            failing: true,
            ..Self::new(name)
        }
    }

    pub fn seen(&self) -> Vec<(Outcome, Record)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn notify(&self, outcome: &Outcome, record: &Record) -> Result<Delivery> {
        self.seen
            .lock()
            .unwrap()
            .push((outcome.clone(), record.clone()));
        if self.failing {
            bail!("{}: chat not found", self.name);
        }
        Ok(Delivery::Sent)
    }
}

#[derive(Default)]
pub struct RecordingProgress {
    stages: Mutex<Vec<Stage>>,
    finished: Mutex<Vec<PipelineReport>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.stages.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<PipelineReport> {
        self.finished.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressSink for RecordingProgress {
    async fn stage(&self, _url: &str, stage: Stage) {
        self.stages.lock().unwrap().push(stage);
    }

    async fn finish(&self, report: &PipelineReport) {
        self.finished.lock().unwrap().push(report.clone());
    }
}

// ---------------------------------------------------------------------------
// MemorySheet
// ---------------------------------------------------------------------------

/// Spreadsheet rows (row 1 is the header) plus a log of status writes.
pub struct MemorySheet {
    rows: Mutex<Vec<Vec<String>>>,
    writes: Mutex<Vec<(usize, String)>>,
}

impl MemorySheet {
    /// `rows` excludes the header; the first entry is sheet row 2.
    pub fn new(rows: &[(&str, &str)]) -> Self {
        let mut all = vec![vec!["URL".to_string(), "Status".to_string()]];
        all.extend(rows.iter().map(|(url, status)| {
            if status.is_empty() {
                vec![url.to_string()]
            } else {
                vec![url.to_string(), status.to_string()]
            }
        }));
        Self {
            rows: Mutex::new(all),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Current status cell of 1-based sheet row `row`.
    pub fn status(&self, row: usize) -> String {
        self.rows
            .lock()
            .unwrap()
            .get(row - 1)
            .and_then(|r| r.get(1))
            .cloned()
            .unwrap_or_default()
    }

    pub fn writes(&self) -> Vec<(usize, String)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl SheetSource for MemorySheet {
    async fn rows(&self) -> Result<Vec<SheetRow>> {
        Ok(crate::migration::rows_from_values(&self.rows.lock().unwrap()))
    }

    async fn set_status(&self, row: usize, status: &str) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let cells = rows
            .get_mut(row - 1)
            .ok_or_else(|| anyhow!("MemorySheet: no row {row}"))?;
        if cells.len() < 2 {
            cells.resize(2, String::new());
        }
        cells[1] = status.to_string();
        self.writes.lock().unwrap().push((row, status.to_string()));
        Ok(())
    }
}
