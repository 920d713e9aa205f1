//! Page-automation interface consumed by the dynamic renderer.
//!
//! A [`BrowserLauncher`] opens one exclusively owned [`BrowserPage`] per
//! request. Every page operation takes its own timeout so a slow step never
//! stalls the phase around it.

use crate::error::PageError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// What to look for on a page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// A CSS selector
    Css(String),
    /// Elements named `tag` whose text contains `needle`, ignoring case
    Text { tag: String, needle: String },
}

impl Target {
    pub fn css(selector: &str) -> Self {
        Target::Css(selector.to_string())
    }

    pub fn text(tag: &str, needle: &str) -> Self {
        Target::Text {
            tag: tag.to_string(),
            needle: needle.to_string(),
        }
    }

    /// XPath equivalent of a text target
    pub fn to_xpath(&self) -> Option<String> {
        match self {
            Target::Css(_) => None,
            Target::Text { tag, needle } => {
                let needle = needle.to_lowercase().replace('\'', "");
                Some(format!(
                    "//{}[contains(translate(normalize-space(.), \
                     'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), '{}')]",
                    tag, needle
                ))
            }
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Css(selector) => write!(f, "{}", selector),
            Target::Text { tag, needle } => write!(f, "{}:has-text(\"{}\")", tag, needle),
        }
    }
}

/// Snapshot of one element matched by a [`Target`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementInfo {
    /// Position among the target's matches at query time
    pub index: usize,
    pub visible: bool,
    pub href: Option<String>,
}

/// One open browser page, exclusively owned by a single request
#[async_trait]
pub trait BrowserPage: Send {
    /// Load `url` and wait for the document to finish loading
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), PageError>;

    /// Wait until no more resources are being requested
    async fn wait_for_network_idle(&mut self, timeout: Duration) -> Result<(), PageError>;

    /// Wait until an element matching the CSS `selector` exists
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration)
    -> Result<(), PageError>;

    /// Run a WebDriver-style script body (`arguments[i]`, explicit `return`)
    async fn evaluate(
        &mut self,
        script: &str,
        args: Vec<Value>,
        timeout: Duration,
    ) -> Result<Value, PageError>;

    /// All current matches for `target`
    async fn query_selector_all(
        &mut self,
        target: &Target,
        timeout: Duration,
    ) -> Result<Vec<ElementInfo>, PageError>;

    /// Click a match previously returned by [`BrowserPage::query_selector_all`]
    async fn click(
        &mut self,
        target: &Target,
        element: &ElementInfo,
        timeout: Duration,
    ) -> Result<(), PageError>;

    async fn scroll_to_bottom(&mut self, timeout: Duration) -> Result<(), PageError>;

    /// Serialized DOM
    async fn content(&mut self, timeout: Duration) -> Result<String, PageError>;

    async fn current_url(&mut self, timeout: Duration) -> Result<String, PageError>;

    /// Release the page and its browser session; calling it twice is a no-op
    async fn close(&mut self) -> Result<(), PageError>;
}

/// Opens browser pages
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserPage>, PageError>;
}
