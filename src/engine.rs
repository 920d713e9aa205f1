//! Per-request orchestration: static fetch, extraction, the low-content
//! check, and the optional dynamic pass, all under one global deadline.

use crate::config::ScraperConfig;
use crate::error::ScrapeError;
use crate::fetchers::browser::BrowserLauncher;
use crate::fetchers::dynamic::DynamicRenderer;
use crate::fetchers::http::{HttpFetch, StaticFetcher};
use crate::fetchers::webdriver::WebDriverLauncher;
use crate::filter::UrlFilter;
use crate::parsers::{SectionExtractor, extract_metadata};
use crate::results::{PageMeta, ScrapeResult, Section};
use crate::utils;
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::{Instant, timeout_at};

pub const MIN_DEPTH: u8 = 1;
pub const MAX_DEPTH: u8 = 5;
pub const DEFAULT_DEPTH: u8 = 3;

/// When the dynamic path is allowed to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Render only when the static pass finds too little text
    #[default]
    Auto,
    /// Never start a browser
    StaticOnly,
    /// Always render after the static pass
    JsOnly,
}

impl Strategy {
    pub fn from_force_dynamic(force_dynamic: Option<bool>) -> Self {
        match force_dynamic {
            Some(true) => Strategy::JsOnly,
            _ => Strategy::Auto,
        }
    }
}

/// One page to scrape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub url: String,
    pub strategy: Strategy,
    /// Pages to visit including the first one, always within 1..=5
    pub max_depth: u8,
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            strategy: Strategy::Auto,
            max_depth: DEFAULT_DEPTH,
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_force_dynamic(self, force_dynamic: Option<bool>) -> Self {
        self.with_strategy(Strategy::from_force_dynamic(force_dynamic))
    }

    /// Set the pagination depth, clamped to the supported range
    pub fn with_max_depth(mut self, max_depth: u8) -> Self {
        self.max_depth = max_depth.clamp(MIN_DEPTH, MAX_DEPTH);
        self
    }
}

/// Adaptive single-page scraper.
///
/// Holds only immutable state, so one engine can serve concurrent requests;
/// each call to [`Engine::scrape`] runs its own independent pipeline.
pub struct Engine {
    config: Arc<ScraperConfig>,
    fetcher: Arc<dyn HttpFetch>,
    renderer: DynamicRenderer,
    extractor: SectionExtractor,
    filter: UrlFilter,
}

impl Engine {
    /// Engine backed by `reqwest` and a WebDriver browser
    pub fn new(config: ScraperConfig) -> Result<Self, ScrapeError> {
        let config = Arc::new(config);
        let fetcher = Arc::new(StaticFetcher::from_config(&config)?);
        let launcher = Arc::new(WebDriverLauncher::new(config.clone()));
        Ok(Self::with_components(config, fetcher, launcher))
    }

    pub fn with_components(
        config: Arc<ScraperConfig>,
        fetcher: Arc<dyn HttpFetch>,
        launcher: Arc<dyn BrowserLauncher>,
    ) -> Self {
        Self {
            renderer: DynamicRenderer::new(config.clone(), launcher),
            extractor: SectionExtractor::new(&config),
            filter: UrlFilter::with_schemes(&config.allowed_schemes),
            fetcher,
            config,
        }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Scrape one page. Never fails: every stage error ends up in
    /// [`ScrapeResult::errors`].
    pub async fn scrape(&self, request: &ScrapeRequest) -> ScrapeResult {
        let deadline = Instant::now() + self.config.global_timeout();
        let start_time = std::time::Instant::now();

        let url = utils::clean_url(&request.url);
        let mut result = ScrapeResult::new(url.as_str());
        ::log::info!(
            "Scraping {} (strategy {:?}, max depth {})",
            url,
            request.strategy,
            request.max_depth
        );

        self.run(request, &url, deadline, &mut result).await;

        ::log::info!(
            "Scrape of {} finished in {:.2} seconds: {} sections, {} errors",
            url,
            start_time.elapsed().as_secs_f64(),
            result.sections.len(),
            result.errors.len()
        );
        result
    }

    async fn run(
        &self,
        request: &ScrapeRequest,
        url: &str,
        deadline: Instant,
        result: &mut ScrapeResult,
    ) {
        if !self.filter.is_allowed_page(url) {
            ::log::warn!("Rejected URL {}", url);
            result.push_error(ScrapeError::Validation(url.to_string()).to_entry());
            return;
        }

        let fetch = self.fetcher.get(url, self.config.static_timeout());
        let html = match timeout_at(deadline, fetch).await {
            Ok(Ok(html)) => html,
            Ok(Err(e)) => {
                ::log::error!("Static fetch of {} failed: {}", url, e);
                result.push_error(e.to_entry());
                return;
            }
            Err(_) => {
                ::log::error!("Static fetch of {} hit the global deadline", url);
                result.push_error(ScrapeError::Timeout.to_entry());
                return;
            }
        };

        let (meta, sections) = self.parse_static(&html, url);
        result.meta = meta;
        result.sections = sections;

        let text_len = result.total_text_len();
        if !self.wants_dynamic(request.strategy, text_len) {
            ::log::info!("Static content sufficient for {} ({} chars)", url, text_len);
            return;
        }

        match self.renderer.render(url, request.max_depth, deadline).await {
            Ok(rendered) => {
                result.sections = self.extractor.parse_sections(&rendered.html, url);
                let (record, errors) = rendered.ledger.into_parts();
                result.interactions = record;
                result.errors.extend(errors);
                if rendered.timed_out {
                    result.push_error(ScrapeError::Timeout.to_entry());
                }
            }
            Err(e) => {
                ::log::warn!("Keeping static sections for {}: {}", url, e);
                result.push_error(e.to_entry());
            }
        }
    }

    /// Metadata and sections from the static HTML. The parsed document
    /// does not outlive this call.
    fn parse_static(&self, html: &str, url: &str) -> (PageMeta, Vec<Section>) {
        let doc = Html::parse_document(html);
        let meta = extract_metadata(&doc, url);
        let sections = self.extractor.extract(&doc, url);
        (meta, sections)
    }

    fn wants_dynamic(&self, strategy: Strategy, text_len: usize) -> bool {
        match strategy {
            Strategy::StaticOnly => false,
            Strategy::JsOnly => {
                ::log::info!("Dynamic rendering requested");
                true
            }
            Strategy::Auto => {
                let low = text_len < self.config.low_content_threshold;
                if low {
                    ::log::info!(
                        "Low static content ({} < {} chars), switching to dynamic rendering",
                        text_len,
                        self.config.low_content_threshold
                    );
                }
                low
            }
        }
    }
}
