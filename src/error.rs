use thiserror::Error;

/// A required field could not be read from the page.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Infected not found")]
    InfectedNotFound,
    #[error("Deceased not found")]
    DeceasedNotFound,
    #[error("lastUpdatedAtSource not found")]
    UpdatedAtNotFound,
    #[error("Image recognition failed: {0}")]
    Recognition(String),
}

/// Anything that ends a run. None of these are retried.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Scrape didn't finish, fetching {url} failed: {reason}")]
    FetchFailed { url: String, reason: String },
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("Storage failed: {0}")]
    Store(String),
}

impl From<anyhow::Error> for RunError {
    fn from(e: anyhow::Error) -> Self {
        RunError::Store(format!("{:#}", e))
    }
}

impl From<rusqlite::Error> for RunError {
    fn from(e: rusqlite::Error) -> Self {
        RunError::Store(e.to_string())
    }
}
