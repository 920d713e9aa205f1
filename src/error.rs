use crate::results::{ErrorEntry, Phase};
use std::time::Duration;
use thiserror::Error;

/// Failures of a scrape pipeline stage.
///
/// None of these escape [`crate::engine::Engine::scrape`]; each is turned
/// into an [`ErrorEntry`] inside the returned result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    /// Malformed URL or a scheme outside the allow-list
    #[error("Invalid URL: {0}")]
    Validation(String),

    /// Static or dynamic network failure, including non-2xx responses
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// The browser could not produce rendered HTML
    #[error("Render failed: {0}")]
    Render(String),

    /// A single interaction sub-step failed
    #[error("Interaction failed: {0}")]
    Interaction(String),

    /// The global deadline expired
    #[error("Scraping exceeded global timeout")]
    Timeout,
}

impl ScrapeError {
    /// The pipeline phase this error is reported under
    pub fn phase(&self) -> Phase {
        match self {
            ScrapeError::Validation(_) => Phase::Validation,
            ScrapeError::Fetch(_) => Phase::Fetch,
            ScrapeError::Render(_) => Phase::Render,
            ScrapeError::Interaction(_) => Phase::Interaction,
            ScrapeError::Timeout => Phase::Timeout,
        }
    }

    /// Convert into the serialized error record
    pub fn to_entry(&self) -> ErrorEntry {
        ErrorEntry::new(self.to_string(), self.phase())
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => ScrapeError::Fetch(format!("HTTP status {}", status)),
            None => ScrapeError::Fetch(error.to_string()),
        }
    }
}

/// Failures reported by the page-automation collaborator
#[derive(Error, Debug)]
pub enum PageError {
    #[error("WebDriver command failed: {0}")]
    Command(#[from] fantoccini::error::CmdError),

    #[error("Failed to start WebDriver session: {0}")]
    Session(#[from] fantoccini::error::NewSessionError),

    #[error("Browser operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unexpected script result: {0}")]
    Script(String),

    #[error("Element not found: {0}")]
    NotFound(String),

    #[error("Browser session already closed")]
    Closed,
}

impl From<PageError> for ScrapeError {
    fn from(error: PageError) -> Self {
        ScrapeError::Render(error.to_string())
    }
}
