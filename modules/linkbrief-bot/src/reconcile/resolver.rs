use std::sync::Arc;

use tracing::{debug, warn};

use linkbrief_common::{CanonicalUrl, DuplicateCheckResult};

use crate::traits::RecordStore;

/// Looks up an existing record for a URL.
#[derive(Clone)]
pub struct DuplicateResolver {
    store: Arc<dyn RecordStore>,
}

impl DuplicateResolver {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// The first stored record whose normalized URL equals `url`'s wins.
    /// A failed lookup is reported in `error`, with `is_duplicate` false.
    pub async fn find_duplicate(&self, url: &str) -> DuplicateCheckResult {
        let canonical = CanonicalUrl::normalize(url);
        if canonical.is_empty() {
            return DuplicateCheckResult::none();
        }

        let candidates = match self.store.find_by_url(&canonical).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(url = %canonical, error = %e, "Duplicate lookup failed");
                return DuplicateCheckResult::failed(format!("{e:#}"));
            }
        };

        let first = candidates
            .into_iter()
            .find(|c| CanonicalUrl::normalize(&c.record.url) == canonical);

        match first {
            Some(existing) => {
                debug!(url = %canonical, record_id = %existing.id, "Duplicate found");
                DuplicateCheckResult::found(existing)
            }
            None => DuplicateCheckResult::none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{stored, MemoryStore};

    #[tokio::test]
    async fn empty_store_has_no_duplicate() {
        let resolver = DuplicateResolver::new(Arc::new(MemoryStore::new()));
        let result = resolver.find_duplicate("https://anything.example/page").await;
        assert!(!result.is_duplicate);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn matches_across_scheme_www_case_and_slash() {
        let store = MemoryStore::new().with_record(stored("https://Example.com/", "Example"));
        let resolver = DuplicateResolver::new(Arc::new(store));

        let result = resolver.find_duplicate("http://www.example.com").await;
        assert!(result.is_duplicate);
        assert_eq!(result.existing_record.unwrap().site_name, "Example");
        assert!(result.existing_record_id.is_some());
    }

    #[tokio::test]
    async fn first_match_in_store_order_wins() {
        let store = MemoryStore::new()
            .with_record(stored("https://a.example/", "First"))
            .with_record(stored("http://www.a.example", "Second"));
        let ids = store.ids();
        let resolver = DuplicateResolver::new(Arc::new(store));

        let result = resolver.find_duplicate("a.example").await;
        assert_eq!(result.existing_record_id, Some(ids[0].clone()));
    }

    #[tokio::test]
    async fn candidates_that_do_not_normalize_equal_are_ignored() {
        // Substring prefilters return near-misses like this one.
        let store = MemoryStore::new().with_record(stored("https://a.example/page/2", "Deeper"));
        let resolver = DuplicateResolver::new(Arc::new(store));

        let result = resolver.find_duplicate("https://a.example/page").await;
        assert!(!result.is_duplicate);
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_error() {
        let store = MemoryStore::new().failing_reads("401 unauthorized");
        let resolver = DuplicateResolver::new(Arc::new(store));

        let result = resolver.find_duplicate("https://a.example").await;
        assert!(!result.is_duplicate);
        assert!(result.error.unwrap().contains("401"));
    }
}
