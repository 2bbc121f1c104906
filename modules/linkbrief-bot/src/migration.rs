//! Batch migration: run every pending spreadsheet URL through the pipeline
//! in automatic mode, recording per-row status back into the sheet.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use google_client::{sheets::a1, Sheets};
use linkbrief_common::{Action, CanonicalUrl};

use crate::pipeline::Pipeline;
use crate::progress::LogProgress;
use crate::reconcile::{Mode, WritePolicy};
use crate::traits::RecordStore;

pub mod status {
    pub const DONE: &str = "완료";
    pub const FAILED: &str = "실패";
    pub const DUPLICATE: &str = "중복";
    pub const IN_PROGRESS: &str = "처리중";
    pub const INTERRUPTED: &str = "중단";

    /// Rows with one of these statuses are never picked up again.
    pub const FINISHED: [&str; 5] = [DONE, "done", "processed", DUPLICATE, IN_PROGRESS];
}

/// One data row. `row` is the 1-based sheet row number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    pub row: usize,
    pub url: String,
    pub status: String,
}

#[async_trait]
pub trait SheetSource: Send + Sync {
    /// Data rows below the header, in sheet order.
    async fn rows(&self) -> Result<Vec<SheetRow>>;

    async fn set_status(&self, row: usize, status: &str) -> Result<()>;
}

/// Column A is the URL, column B the status; row 1 is a header.
pub fn rows_from_values(values: &[Vec<String>]) -> Vec<SheetRow> {
    values
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, cells)| SheetRow {
            row: i + 1,
            url: cells.first().map(|s| s.trim().to_string()).unwrap_or_default(),
            status: cells.get(1).map(|s| s.trim().to_string()).unwrap_or_default(),
        })
        .collect()
}

pub struct GoogleSheetSource {
    sheets: Sheets,
    spreadsheet_id: String,
    sheet_name: String,
}

impl GoogleSheetSource {
    pub fn new(sheets: Sheets, spreadsheet_id: &str, sheet_name: &str) -> Self {
        Self {
            sheets,
            spreadsheet_id: spreadsheet_id.to_string(),
            sheet_name: sheet_name.to_string(),
        }
    }
}

#[async_trait]
impl SheetSource for GoogleSheetSource {
    async fn rows(&self) -> Result<Vec<SheetRow>> {
        let values = self
            .sheets
            .get_values(&self.spreadsheet_id, &a1(&self.sheet_name, "A:B"))
            .await
            .context("Failed to read spreadsheet")?;
        Ok(rows_from_values(&values))
    }

    async fn set_status(&self, row: usize, status: &str) -> Result<()> {
        self.sheets
            .update_cell(&self.spreadsheet_id, &a1(&self.sheet_name, &format!("B{row}")), status)
            .await
            .with_context(|| format!("Failed to mark row {row}"))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MigrationPlan {
    pub pending: Vec<SheetRow>,
    /// Already in the store, or repeated earlier in the sheet.
    pub duplicates: Vec<SheetRow>,
    /// Rows skipped for their status.
    pub already_handled: usize,
    /// Rows without an http(s) URL.
    pub invalid: usize,
}

/// Sort rows into pending, duplicate and skipped. `limit` caps `pending`.
pub fn plan(rows: Vec<SheetRow>, stored_urls: &[String], limit: Option<usize>) -> MigrationPlan {
    let mut seen: HashSet<CanonicalUrl> = stored_urls
        .iter()
        .map(|u| CanonicalUrl::normalize(u))
        .filter(|u| !u.is_empty())
        .collect();
    let mut plan = MigrationPlan::default();

    for row in rows {
        if limit.is_some_and(|n| plan.pending.len() >= n) {
            break;
        }
        let lowered = row.status.to_lowercase();
        if status::FINISHED.contains(&lowered.as_str()) {
            plan.already_handled += 1;
            continue;
        }
        if !row.url.starts_with("http") {
            plan.invalid += 1;
            continue;
        }
        if seen.insert(CanonicalUrl::normalize(&row.url)) {
            plan.pending.push(row);
        } else {
            plan.duplicates.push(row);
        }
    }
    plan
}

// ---------------------------------------------------------------------------
// Running
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub limit: Option<usize>,
    pub dry_run: bool,
    pub delay: Duration,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            limit: None,
            dry_run: false,
            delay: Duration::from_secs(30),
        }
    }
}

impl MigrationOptions {
    /// Time spent in delays between `rows` processed rows. Saturates at
    /// `Duration::MAX`.
    pub fn estimated_delay(&self, rows: usize) -> Duration {
        let gaps = u32::try_from(rows.saturating_sub(1)).unwrap_or(u32::MAX);
        self.delay.checked_mul(gaps).unwrap_or(Duration::MAX)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    pub succeeded: usize,
    pub failed: usize,
    pub duplicates: usize,
    /// Rows a dry run would have processed.
    pub would_process: usize,
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl MigrationReport {
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed
    }
}

pub struct Migration {
    source: Arc<dyn SheetSource>,
    store: Arc<dyn RecordStore>,
    pipeline: Arc<Pipeline>,
    policy: WritePolicy,
}

impl Migration {
    pub fn new(
        source: Arc<dyn SheetSource>,
        store: Arc<dyn RecordStore>,
        pipeline: Arc<Pipeline>,
        policy: WritePolicy,
    ) -> Self {
        Self {
            source,
            store,
            pipeline,
            policy,
        }
    }

    /// Read the sheet and the store's URLs and decide what to process.
    pub async fn prepare(&self, limit: Option<usize>) -> Result<MigrationPlan> {
        let rows = self.source.rows().await?;
        let stored = self.store.list_urls().await.context("Failed to load stored URLs")?;
        let plan = plan(rows, &stored, limit);
        info!(
            pending = plan.pending.len(),
            duplicates = plan.duplicates.len(),
            already_handled = plan.already_handled,
            invalid = plan.invalid,
            stored = stored.len(),
            "Migration planned"
        );
        Ok(plan)
    }

    async fn mark(&self, row: usize, status: &str) {
        match self.source.set_status(row, status).await {
            Ok(()) => info!(row, status, "Row status updated"),
            Err(e) => warn!(row, status, error = %e, "Row status update failed"),
        }
    }

    /// Process `plan.pending` one row at a time. When `shutdown` resolves
    /// the current row is marked interrupted and the run stops.
    pub async fn run(
        &self,
        plan: &MigrationPlan,
        options: &MigrationOptions,
        shutdown: impl Future<Output = ()>,
    ) -> MigrationReport {
        let started = Instant::now();
        let mut report = MigrationReport {
            duplicates: plan.duplicates.len(),
            ..MigrationReport::default()
        };
        tokio::pin!(shutdown);

        if options.dry_run {
            for row in &plan.pending {
                info!(row = row.row, url = %row.url, "[dry run] would process");
            }
            report.would_process = plan.pending.len();
            report.elapsed = started.elapsed();
            return report;
        }

        for row in &plan.duplicates {
            self.mark(row.row, status::DUPLICATE).await;
        }

        let mode = Mode::Automatic(self.policy);
        let total = plan.pending.len();
        for (i, row) in plan.pending.iter().enumerate() {
            info!(progress = %format!("[{}/{total}]", i + 1), row = row.row, url = %row.url, "Migrating");
            self.mark(row.row, status::IN_PROGRESS).await;

            let result = tokio::select! {
                result = self.pipeline.process(&row.url, &mode, &LogProgress) => result,
                _ = &mut shutdown => {
                    warn!(row = row.row, "Interrupted");
                    self.mark(row.row, status::INTERRUPTED).await;
                    report.interrupted = true;
                    break;
                }
            };

            let status = match result.outcome.action {
                Action::Created | Action::Updated => {
                    report.succeeded += 1;
                    status::DONE
                }
                Action::Skipped => {
                    report.duplicates += 1;
                    status::DUPLICATE
                }
                Action::Error => {
                    report.failed += 1;
                    warn!(row = row.row, message = %result.outcome.message, "Row failed");
                    status::FAILED
                }
            };
            self.mark(row.row, status).await;

            if i + 1 < total {
                tokio::select! {
                    _ = tokio::time::sleep(options.delay) => {}
                    _ = &mut shutdown => {
                        warn!("Interrupted between rows");
                        report.interrupted = true;
                        break;
                    }
                }
            }
        }

        report.elapsed = started.elapsed();
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            duplicates = report.duplicates,
            processed = report.processed(),
            interrupted = report.interrupted,
            elapsed_secs = report.elapsed.as_secs(),
            "Migration finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(n: usize, url: &str, status: &str) -> SheetRow {
        SheetRow {
            row: n,
            url: url.into(),
            status: status.into(),
        }
    }

    #[test]
    fn estimated_delay_counts_gaps_and_saturates() {
        let options = MigrationOptions::default();
        assert_eq!(options.estimated_delay(0), Duration::ZERO);
        assert_eq!(options.estimated_delay(1), Duration::ZERO);
        assert_eq!(options.estimated_delay(3), Duration::from_secs(60));

        let slow = MigrationOptions {
            delay: Duration::from_secs(u64::MAX / 2),
            ..MigrationOptions::default()
        };
        assert_eq!(slow.estimated_delay(3), Duration::MAX);
        assert_eq!(options.estimated_delay(usize::MAX), Duration::from_secs(30) * u32::MAX);
    }

    #[test]
    fn values_skip_header_and_pad_missing_status() {
        let values = vec![
            vec!["URL".to_string(), "Status".to_string()],
            vec!["https://a.example".to_string()],
            vec![" https://b.example ".to_string(), "완료".to_string()],
        ];
        let rows = rows_from_values(&values);
        assert_eq!(rows, vec![row(2, "https://a.example", ""), row(3, "https://b.example", "완료")]);
    }

    #[test]
    fn finished_statuses_are_skipped_case_insensitively() {
        let rows = vec![
            row(2, "https://a.example", "완료"),
            row(3, "https://b.example", "DONE"),
            row(4, "https://c.example", "처리중"),
            row(5, "https://d.example", "실패"),
        ];
        let plan = plan(rows, &[], None);
        assert_eq!(plan.already_handled, 3);
        assert_eq!(plan.pending, vec![row(5, "https://d.example", "실패")]);
    }

    #[test]
    fn stored_and_repeated_urls_are_duplicates() {
        let rows = vec![
            row(2, "http://www.stored.example/", ""),
            row(3, "https://new.example", ""),
            row(4, "https://NEW.example/", ""),
            row(5, "not a url", ""),
        ];
        let plan = plan(rows, &["https://stored.example".to_string()], None);
        assert_eq!(plan.pending.len(), 1);
        assert_eq!(plan.duplicates.iter().map(|r| r.row).collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(plan.invalid, 1);
    }

    #[test]
    fn limit_caps_pending() {
        let rows = (0..10)
            .map(|i| row(i + 2, &format!("https://site{i}.example"), ""))
            .collect();
        let plan = plan(rows, &[], Some(3));
        assert_eq!(plan.pending.len(), 3);
        assert_eq!(plan.pending[2].row, 4);
    }
}
