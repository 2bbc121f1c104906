pub mod config;
pub mod error;
pub mod types;
pub mod url;

pub use config::{Config, DuplicateMode};
pub use error::LinkBriefError;
pub use types::*;
pub use url::{extract_urls, CanonicalUrl};
