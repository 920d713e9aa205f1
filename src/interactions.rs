use crate::error::ScrapeError;
use crate::results::{ErrorEntry, InteractionRecord};

/// What a single interaction sub-step produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// A click on an element matched by this selector succeeded
    Clicked(String),
    /// This many scroll-to-bottom iterations ran
    Scrolled(u32),
    /// Navigation landed on this URL
    Visited(String),
    /// The step failed; the enclosing phase carries on
    Failed { step: &'static str, message: String },
}

/// Per-request record of simulated actions and their failures.
///
/// Append-only: entries are never removed, and readers only ever get owned
/// copies.
#[derive(Debug, Clone)]
pub struct InteractionLedger {
    clicks: Vec<String>,
    scrolls: u32,
    pages: Vec<String>,
    errors: Vec<ErrorEntry>,
    max_depth: u8,
}

impl InteractionLedger {
    /// Start a ledger whose first visited page is `origin`
    pub fn new(origin: &str, max_depth: u8) -> Self {
        let mut pages = Vec::new();
        if !origin.is_empty() {
            pages.push(origin.to_string());
        }
        Self {
            clicks: Vec::new(),
            scrolls: 0,
            pages,
            errors: Vec::new(),
            max_depth,
        }
    }

    /// Fold a step outcome into the ledger
    pub fn record(&mut self, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Clicked(selector) => self.add_click(&selector),
            StepOutcome::Scrolled(count) => self.add_scroll(count),
            StepOutcome::Visited(url) => self.add_page(&url),
            StepOutcome::Failed { step, message } => {
                self.add_error(ScrapeError::Interaction(format!("{}: {}", step, message)))
            }
        }
    }

    pub fn add_click(&mut self, selector: &str) {
        if !selector.is_empty() {
            self.clicks.push(selector.to_string());
        }
    }

    pub fn add_scroll(&mut self, count: u32) {
        self.scrolls = self.scrolls.saturating_add(count);
    }

    /// Record a visited page; empty and already-seen URLs are ignored
    pub fn add_page(&mut self, url: &str) {
        if !url.is_empty() && !self.pages.iter().any(|p| p == url) {
            self.pages.push(url.to_string());
        }
    }

    pub fn add_error(&mut self, error: ScrapeError) {
        ::log::warn!("{}", error);
        self.errors.push(error.to_entry());
    }

    /// Whether pagination may go one level deeper than `current_depth`
    pub fn should_continue(&self, current_depth: u8) -> bool {
        current_depth < self.max_depth
    }

    /// Owned copy of the recorded interactions
    pub fn snapshot(&self) -> InteractionRecord {
        InteractionRecord {
            clicks: self.clicks.clone(),
            scrolls: self.scrolls,
            pages: self.pages.clone(),
        }
    }

    /// Owned copy of the recorded errors
    pub fn errors(&self) -> Vec<ErrorEntry> {
        self.errors.clone()
    }

    /// Consume the ledger, yielding its record and errors
    pub fn into_parts(self) -> (InteractionRecord, Vec<ErrorEntry>) {
        (
            InteractionRecord {
                clicks: self.clicks,
                scrolls: self.scrolls,
                pages: self.pages,
            },
            self.errors,
        )
    }
}
