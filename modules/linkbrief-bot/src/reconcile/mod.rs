//! Duplicate detection and create/update/skip decisions for one URL.

pub mod lock;
pub mod resolver;
pub mod workflow;
pub mod writer;

pub use lock::{UrlGuard, UrlLocks};
pub use resolver::DuplicateResolver;
pub use workflow::{Mode, Workflow, WorkflowRun, OPERATOR_TIMEOUT};
pub use writer::{RecordWriter, WritePolicy};
