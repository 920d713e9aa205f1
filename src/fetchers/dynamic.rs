//! Browser rendering with simulated user interaction.
//!
//! The render phase (navigate, content wait, noise removal, serialize) is
//! fail-stop. The interaction phase (tabs, load-more buttons, infinite
//! scroll, pagination) is fail-safe: each sub-step reports
//! [`StepOutcome`]s to the ledger and never aborts the phase.

use crate::config::ScraperConfig;
use crate::error::{PageError, ScrapeError};
use crate::fetchers::browser::{BrowserLauncher, BrowserPage, ElementInfo, Target};
use crate::interactions::{InteractionLedger, StepOutcome};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout, timeout_at};

/// Landmarks waited for, in order, before the DOM is considered ready
const CONTENT_SELECTORS: [&str; 4] = ["main", "article", "[role='main']", "body"];

/// Pause after navigation before probing for content
const CONTENT_SETTLE: Duration = Duration::from_secs(2);
const CONTENT_WAIT: Duration = Duration::from_secs(5);

const TAB_SETTLE: Duration = Duration::from_secs(1);
const MAX_TAB_CLICKS: usize = 3;

// Injected content arrives slower than a tab switch
const LOAD_MORE_SETTLE: Duration = Duration::from_secs(2);
const MAX_LOAD_MORE_CLICKS: usize = 2;

/// Upper bound for releasing the browser session
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

const REMOVE_NOISE_SCRIPT: &str = "var nodes = document.querySelectorAll(arguments[0]); \
     nodes.forEach(function (el) { el.remove(); }); return nodes.length;";

const PAGE_HEIGHT_SCRIPT: &str = "return document.body ? document.body.scrollHeight : 0;";

fn tab_targets() -> Vec<Target> {
    vec![
        Target::css("[role='tab']"),
        Target::css(".tab"),
        Target::css("[class*='tab']"),
        Target::css("button[data-tab]"),
    ]
}

fn load_more_targets() -> Vec<Target> {
    vec![
        Target::text("button", "Load"),
        Target::text("button", "More"),
        Target::text("button", "Show"),
        Target::text("a", "Load more"),
        Target::text("a", "Show more"),
    ]
}

/// Next-page candidates in priority order
fn next_page_targets() -> Vec<Target> {
    vec![
        Target::text("a", "Next"),
        Target::css(".next"),
        Target::css("[rel='next']"),
        Target::text("button", "Next"),
        Target::text("a", "»"),
    ]
}

/// Rendered HTML plus the trail of interactions performed afterwards
#[derive(Debug)]
pub struct Rendered {
    pub html: String,
    pub ledger: InteractionLedger,
    /// The deadline expired during interactions; `ledger` holds the steps
    /// that finished before it
    pub timed_out: bool,
}

/// Produces JS-rendered HTML for one URL per call
pub struct DynamicRenderer {
    config: Arc<ScraperConfig>,
    launcher: Arc<dyn BrowserLauncher>,
}

impl DynamicRenderer {
    pub fn new(config: Arc<ScraperConfig>, launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self { config, launcher }
    }

    /// Open a page, render `url`, interact with it, and release the page.
    ///
    /// Work stops at `deadline`; the page is released on every path,
    /// including deadline expiry. A deadline hit during rendering is an
    /// error, one during interactions still returns the rendered HTML with
    /// [`Rendered::timed_out`] set.
    pub async fn render(
        &self,
        url: &str,
        max_depth: u8,
        deadline: Instant,
    ) -> Result<Rendered, ScrapeError> {
        ::log::info!("Launching browser for {}", url);

        let mut page = match timeout_at(deadline, self.launcher.launch()).await {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => return Err(ScrapeError::Render(format!("browser launch failed: {}", e))),
            Err(_) => return Err(ScrapeError::Timeout),
        };

        let outcome = self.drive(page.as_mut(), url, max_depth, deadline).await;
        release(page.as_mut()).await;
        outcome
    }

    /// Render then interact on an already open page. The caller owns the page.
    pub async fn drive(
        &self,
        page: &mut dyn BrowserPage,
        url: &str,
        max_depth: u8,
        deadline: Instant,
    ) -> Result<Rendered, ScrapeError> {
        let html = match timeout_at(deadline, self.render_page(page, url)).await {
            Ok(html) => html?,
            Err(_) => {
                ::log::warn!("Rendering {} hit the global deadline", url);
                return Err(ScrapeError::Timeout);
            }
        };
        ::log::info!("Dynamic fetch of {} produced {} bytes", url, html.len());

        let mut ledger = InteractionLedger::new(url, max_depth);
        let timed_out = timeout_at(deadline, self.interact(page, &mut ledger))
            .await
            .is_err();
        if timed_out {
            ::log::warn!("Interactions on {} cut short by the global deadline", url);
        }

        Ok(Rendered {
            html,
            ledger,
            timed_out,
        })
    }

    async fn render_page(&self, page: &mut dyn BrowserPage, url: &str) -> Result<String, ScrapeError> {
        let render_timeout = self.config.render_timeout();

        page.navigate(url, render_timeout)
            .await
            .map_err(|e| render_error("navigation", e))?;
        page.wait_for_network_idle(render_timeout)
            .await
            .map_err(|e| render_error("waiting for network idle", e))?;

        self.wait_for_content(page).await;
        self.remove_noise(page).await;

        page.content(render_timeout)
            .await
            .map_err(|e| render_error("serializing DOM", e))
    }

    /// Stop at the first landmark that shows up; carry on if none does
    async fn wait_for_content(&self, page: &mut dyn BrowserPage) {
        sleep(CONTENT_SETTLE).await;

        for selector in CONTENT_SELECTORS {
            match page.wait_for_selector(selector, CONTENT_WAIT).await {
                Ok(()) => {
                    ::log::debug!("Content ready: found {}", selector);
                    return;
                }
                Err(e) => ::log::debug!("Content selector {} missed: {}", selector, e),
            }
        }
        ::log::debug!("No content landmark found, continuing anyway");
    }

    async fn remove_noise(&self, page: &mut dyn BrowserPage) {
        let step_timeout = self.config.interaction_timeout();
        for selector in &self.config.noise_selectors {
            match page
                .evaluate(REMOVE_NOISE_SCRIPT, vec![json!(selector)], step_timeout)
                .await
            {
                Ok(removed) => ::log::trace!("Removed {} nodes for {}", removed, selector),
                Err(e) => ::log::debug!("Noise selector {} skipped: {}", selector, e),
            }
        }
    }

    /// Run every interaction sub-step in order, folding outcomes into `ledger`
    pub async fn interact(&self, page: &mut dyn BrowserPage, ledger: &mut InteractionLedger) {
        let outcomes = self
            .activate(page, &tab_targets(), MAX_TAB_CLICKS, TAB_SETTLE, "tabs")
            .await;
        outcomes.into_iter().for_each(|o| ledger.record(o));

        let outcomes = self
            .activate(
                page,
                &load_more_targets(),
                MAX_LOAD_MORE_CLICKS,
                LOAD_MORE_SETTLE,
                "load-more",
            )
            .await;
        outcomes.into_iter().for_each(|o| ledger.record(o));

        let outcomes = self.scroll_for_content(page).await;
        outcomes.into_iter().for_each(|o| ledger.record(o));

        let outcomes = self.follow_pagination(page, ledger).await;
        outcomes.into_iter().for_each(|o| ledger.record(o));

        let record = ledger.snapshot();
        ::log::info!(
            "Interactions done: {} clicks, {} scrolls, {} pages",
            record.clicks.len(),
            record.scrolls,
            record.pages.len()
        );
    }

    /// Click up to `per_target` visible matches of each target
    async fn activate(
        &self,
        page: &mut dyn BrowserPage,
        targets: &[Target],
        per_target: usize,
        settle: Duration,
        step: &'static str,
    ) -> Vec<StepOutcome> {
        let step_timeout = self.config.interaction_timeout();
        let mut outcomes = Vec::new();

        for target in targets {
            let elements = match page.query_selector_all(target, step_timeout).await {
                Ok(elements) => elements,
                Err(e) => {
                    outcomes.push(failed(step, target, e));
                    continue;
                }
            };

            let visible: Vec<&ElementInfo> =
                elements.iter().filter(|e| e.visible).take(per_target).collect();
            for element in visible {
                match page.click(target, element, step_timeout).await {
                    Ok(()) => {
                        ::log::debug!("Clicked {} #{}", target, element.index);
                        outcomes.push(StepOutcome::Clicked(target.to_string()));
                        sleep(settle).await;
                    }
                    Err(e) => outcomes.push(failed(step, target, e)),
                }
            }
        }

        outcomes
    }

    /// Scroll until the page stops growing or the attempt budget runs out
    async fn scroll_for_content(&self, page: &mut dyn BrowserPage) -> Vec<StepOutcome> {
        let mut scrolls = 0;
        let mut failure = None;

        for _ in 0..self.config.scroll_attempts {
            match self.scroll_once(page).await {
                Ok((before, after)) => {
                    scrolls += 1;
                    if after <= before {
                        ::log::debug!("Page height settled at {} after {} scrolls", after, scrolls);
                        break;
                    }
                }
                Err(e) => {
                    failure = Some(StepOutcome::Failed {
                        step: "scroll",
                        message: e.to_string(),
                    });
                    break;
                }
            }
        }

        let mut outcomes = vec![StepOutcome::Scrolled(scrolls)];
        outcomes.extend(failure);
        outcomes
    }

    /// One scroll-to-bottom; returns the page height before and after
    async fn scroll_once(&self, page: &mut dyn BrowserPage) -> Result<(u64, u64), PageError> {
        let step_timeout = self.config.interaction_timeout();
        let before = page_height(page, step_timeout).await?;
        page.scroll_to_bottom(step_timeout).await?;
        sleep(self.config.scroll_delay()).await;
        let after = page_height(page, step_timeout).await?;
        Ok((before, after))
    }

    /// Follow "next page" links for at most `max_depth - 1` hops
    async fn follow_pagination(
        &self,
        page: &mut dyn BrowserPage,
        ledger: &InteractionLedger,
    ) -> Vec<StepOutcome> {
        let step_timeout = self.config.interaction_timeout();
        let mut outcomes = Vec::new();
        let mut depth: u8 = 1;

        while ledger.should_continue(depth) {
            let mut advanced = false;

            for target in next_page_targets() {
                let candidate = match page.query_selector_all(&target, step_timeout).await {
                    Ok(elements) => elements.into_iter().find(|e| {
                        e.visible && e.href.as_deref().is_some_and(|h| !h.trim().is_empty())
                    }),
                    Err(e) => {
                        outcomes.push(failed("pagination", &target, e));
                        continue;
                    }
                };
                let Some(element) = candidate else {
                    continue;
                };

                if let Err(e) = page.click(&target, &element, step_timeout).await {
                    outcomes.push(failed("pagination", &target, e));
                    continue;
                }
                if let Err(e) = page.wait_for_network_idle(self.config.render_timeout()).await {
                    outcomes.push(failed("pagination", &target, e));
                }

                match page.current_url(step_timeout).await {
                    Ok(url) => {
                        ::log::debug!("Pagination hop {} landed on {}", depth, url);
                        outcomes.push(StepOutcome::Visited(url));
                    }
                    Err(e) => outcomes.push(failed("pagination", &target, e)),
                }
                advanced = true;
                break;
            }

            if !advanced {
                ::log::debug!("No next-page link found after {} hop(s)", depth - 1);
                break;
            }
            depth += 1;
        }

        outcomes
    }
}

async fn page_height(page: &mut dyn BrowserPage, step_timeout: Duration) -> Result<u64, PageError> {
    let value = page
        .evaluate(PAGE_HEIGHT_SCRIPT, Vec::new(), step_timeout)
        .await?;
    match &value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f.max(0.0) as u64))
            .ok_or_else(|| PageError::Script(format!("page height {}", value))),
        _ => Err(PageError::Script(format!("page height {}", value))),
    }
}

/// Close the page, bounded by [`CLOSE_TIMEOUT`]; failures are only logged
async fn release(page: &mut dyn BrowserPage) {
    match timeout(CLOSE_TIMEOUT, page.close()).await {
        Ok(Ok(())) => ::log::debug!("Browser page released"),
        Ok(Err(e)) => ::log::warn!("Browser cleanup failed: {}", e),
        Err(_) => ::log::warn!("Browser cleanup timed out after {:?}", CLOSE_TIMEOUT),
    }
}

fn render_error(context: &str, error: PageError) -> ScrapeError {
    ::log::error!("Dynamic render failed while {}: {}", context, error);
    ScrapeError::Render(format!("{} failed: {}", context, error))
}

fn failed(step: &'static str, target: &Target, error: PageError) -> StepOutcome {
    StepOutcome::Failed {
        step,
        message: format!("{}: {}", target, error),
    }
}
