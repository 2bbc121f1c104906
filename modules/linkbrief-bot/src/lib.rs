pub mod listener;
pub mod logging;
pub mod migration;
pub mod narration;
pub mod notify;
pub mod pipeline;
pub mod progress;
pub mod prompt;
pub mod reconcile;
pub mod scraper;
pub mod store;
pub mod summarizer;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
