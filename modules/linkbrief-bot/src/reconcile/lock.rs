use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;

use linkbrief_common::CanonicalUrl;

type Slot = Arc<tokio::sync::Mutex<()>>;

/// Process-local mutual exclusion keyed by canonical URL.
#[derive(Clone, Default)]
pub struct UrlLocks {
    slots: Arc<Mutex<HashMap<CanonicalUrl, Slot>>>,
}

/// Held while one URL is being reconciled. The slot is removed from the map
/// when the last holder or waiter lets go.
pub struct UrlGuard {
    key: CanonicalUrl,
    slots: Arc<Mutex<HashMap<CanonicalUrl, Slot>>>,
    _held: OwnedMutexGuard<()>,
}

impl UrlLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, url: &CanonicalUrl) -> UrlGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            // A waiter cancelled after the holder let go leaves an entry only
            // the map references.
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(url.clone()).or_default().clone()
        };
        let held = slot.lock_owned().await;
        UrlGuard {
            key: url.clone(),
            slots: self.slots.clone(),
            _held: held,
        }
    }

    /// Number of URLs currently locked or waited on.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for UrlGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlGuard").field("url", &self.key).finish()
    }
}

impl Drop for UrlGuard {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one inside our guard. Anything more is a waiter.
        if let Some(slot) = slots.get(&self.key) {
            if Arc::strong_count(slot) <= 2 {
                slots.remove(&self.key);
            }
        }
    }
}
