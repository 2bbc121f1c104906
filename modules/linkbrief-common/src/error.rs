use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinkBriefError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Scraping error: {0}")]
    Scrape(String),

    #[error("Summarization error: {0}")]
    Summarize(String),

    #[error("Narration error: {0}")]
    Narration(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
