use std::sync::Arc;

use tracing::{info, warn};

use linkbrief_common::{DuplicateCheckResult, Outcome, Record, StoredRecord};

use super::resolver::DuplicateResolver;
use crate::traits::RecordStore;

/// Duplicate handling for a single write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePolicy {
    pub check_duplicates: bool,
    pub update_if_duplicate: bool,
}

impl Default for WritePolicy {
    fn default() -> Self {
        Self {
            check_duplicates: true,
            update_if_duplicate: false,
        }
    }
}

/// Creates or updates one row, given a duplicate check and a decision.
#[derive(Clone)]
pub struct RecordWriter {
    store: Arc<dyn RecordStore>,
    resolver: DuplicateResolver,
}

impl RecordWriter {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            resolver: DuplicateResolver::new(store.clone()),
            store,
        }
    }

    /// Check for a duplicate (unless the policy or a missing URL says not
    /// to), then create, update or skip.
    pub async fn write(&self, record: &Record, policy: WritePolicy) -> Outcome {
        if !policy.check_duplicates || record.url.trim().is_empty() {
            return self.create(record).await;
        }
        let check = self.resolver.find_duplicate(&record.url).await;
        self.write_resolved(record, &check, policy.update_if_duplicate).await
    }

    /// Apply a decision to an already-completed duplicate check.
    pub async fn write_resolved(
        &self,
        record: &Record,
        check: &DuplicateCheckResult,
        update_if_duplicate: bool,
    ) -> Outcome {
        if let Some(error) = &check.error {
            return Outcome::error(format!("Duplicate check failed: {error}"));
        }

        let Some(existing) = check.existing() else {
            return self.create(record).await;
        };

        if !update_if_duplicate {
            return skip_outcome(&existing);
        }

        let fields = record.to_field_set();
        match self.store.update(&existing.id, &fields).await {
            Ok(()) => {
                info!(url = %record.url, record_id = %existing.id, fields = fields.len(), "Updated existing record");
                Outcome::updated(existing.id)
            }
            Err(e) => {
                warn!(url = %record.url, record_id = %existing.id, error = %e, "Record update failed");
                Outcome::error(format!("Failed to update record {}: {e:#}", existing.id))
                    .with_duplicate(true)
            }
        }
    }

    async fn create(&self, record: &Record) -> Outcome {
        let fields = record.to_field_set();
        match self.store.create(&fields).await {
            Ok(id) => {
                info!(url = %record.url, record_id = %id, fields = fields.len(), "Created record");
                Outcome::created(id)
            }
            Err(e) => {
                warn!(url = %record.url, error = %e, "Record create failed");
                Outcome::error(format!("Failed to create record: {e:#}"))
            }
        }
    }
}

/// The outcome for leaving an existing record untouched.
pub fn skip_outcome(existing: &StoredRecord) -> Outcome {
    let date = existing
        .record
        .registered_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown date".to_string());
    Outcome::skipped(
        Some(existing.id.clone()),
        format!(
            "Already registered as '{}' ({date}); skipped",
            existing.record.display_name()
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record, stored, MemoryStore};
    use linkbrief_common::{Action, RecordField};

    fn policy(check_duplicates: bool, update_if_duplicate: bool) -> WritePolicy {
        WritePolicy {
            check_duplicates,
            update_if_duplicate,
        }
    }

    #[tokio::test]
    async fn unchecked_write_always_creates() {
        let store = Arc::new(MemoryStore::new().with_record(stored("https://tool.example", "Old")));
        let writer = RecordWriter::new(store.clone());

        let outcome = writer.write(&record("https://tool.example/", "New"), policy(false, true)).await;

        assert_eq!(outcome.action, Action::Created);
        assert!(outcome.success);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn missing_url_skips_duplicate_check() {
        let store = Arc::new(MemoryStore::new().failing_reads("should not be called"));
        let writer = RecordWriter::new(store.clone());

        let outcome = writer.write(&record("", "No URL"), policy(true, false)).await;

        assert_eq!(outcome.action, Action::Created);
        assert_eq!(store.find_calls(), 0);
    }

    #[tokio::test]
    async fn duplicate_without_update_is_a_successful_skip() {
        let existing = stored("https://tool.example", "Tool");
        let store = Arc::new(MemoryStore::new().with_record(existing));
        let writer = RecordWriter::new(store.clone());

        let outcome = writer.write(&record("http://www.tool.example/", "Tool v2"), policy(true, false)).await;

        assert_eq!(outcome.action, Action::Skipped);
        assert!(outcome.success);
        assert!(outcome.is_duplicate);
        assert!(outcome.message.contains("Tool"));
        assert!(outcome.message.contains("2024-05-01"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.write_calls(), 0);
    }

    #[tokio::test]
    async fn duplicate_with_update_overwrites_fields() {
        let store = Arc::new(MemoryStore::new().with_record(stored("https://tool.example", "Tool")));
        let id = store.ids()[0].clone();
        let writer = RecordWriter::new(store.clone());

        let mut new = record("https://tool.example", "Tool v2");
        new.summary = "Rewritten summary".into();
        let outcome = writer.write(&new, policy(true, true)).await;

        assert_eq!(outcome.action, Action::Updated);
        assert_eq!(outcome.record_id, Some(id.clone()));
        let fields = store.fields(&id).unwrap();
        assert_eq!(fields.text(RecordField::SiteName), Some("Tool v2"));
        assert_eq!(fields.text(RecordField::Summary), Some("Rewritten summary"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn update_never_nulls_fields_missing_from_new_record() {
        let mut old = stored("https://tool.example", "Tool");
        old.record.use_case = "Drafting emails".into();
        let store = Arc::new(MemoryStore::new().with_record(old));
        let id = store.ids()[0].clone();
        let writer = RecordWriter::new(store.clone());

        let outcome = writer.write(&record("https://tool.example", "Tool v2"), policy(true, true)).await;

        assert_eq!(outcome.action, Action::Updated);
        let fields = store.fields(&id).unwrap();
        assert_eq!(fields.text(RecordField::UseCase), Some("Drafting emails"));
    }

    #[tokio::test]
    async fn resolver_error_becomes_error_outcome() {
        let store = Arc::new(MemoryStore::new().failing_reads("connection reset"));
        let writer = RecordWriter::new(store.clone());

        let outcome = writer.write(&record("https://tool.example", "Tool"), policy(true, false)).await;

        assert_eq!(outcome.action, Action::Error);
        assert!(!outcome.success);
        assert!(outcome.message.contains("connection reset"));
        assert_eq!(store.write_calls(), 0);
    }

    #[tokio::test]
    async fn store_write_failure_is_terminal() {
        let store = Arc::new(MemoryStore::new().failing_writes("422 INVALID_VALUE"));
        let writer = RecordWriter::new(store.clone());

        let outcome = writer.write(&record("https://tool.example", "Tool"), policy(true, false)).await;

        assert_eq!(outcome.action, Action::Error);
        assert!(outcome.message.contains("422"));
        assert_eq!(store.write_calls(), 1);
    }
}
