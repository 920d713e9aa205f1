//! In-memory fetchers and browser pages for unit tests.

use crate::error::{PageError, ScrapeError};
use crate::fetchers::browser::{BrowserLauncher, BrowserPage, ElementInfo, Target};
use crate::fetchers::http::HttpFetch;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Canned static responses
#[derive(Debug, Clone)]
pub enum FakeResponse {
    Html(String),
    Fail(ScrapeError),
    Hang,
}

pub struct FakeFetcher {
    response: FakeResponse,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn new(response: FakeResponse) -> Self {
        Self {
            response,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn html(body: &str) -> Self {
        Self::new(FakeResponse::Html(body.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpFetch for FakeFetcher {
    async fn get(&self, _url: &str, _timeout: Duration) -> Result<String, ScrapeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.response {
            FakeResponse::Html(body) => Ok(body.clone()),
            FakeResponse::Fail(e) => Err(e.clone()),
            FakeResponse::Hang => std::future::pending().await,
        }
    }
}

/// How a [`FakePage`] behaves
#[derive(Debug, Clone, Default)]
pub struct PageScript {
    pub html: String,
    /// Matches keyed by the target's display notation
    pub elements: HashMap<String, Vec<ElementInfo>>,
    /// URLs reached by successive clicks on `a:has-text("Next")`
    pub pagination: Vec<String>,
    /// Successive `scrollHeight` readings; the last one repeats
    pub heights: Vec<u64>,
    pub missing_selectors: HashSet<String>,
    pub failing_clicks: HashSet<(String, usize)>,
    pub fail_navigate: bool,
    pub hang_on_navigate: bool,
    pub fail_noise: bool,
    pub fail_height: bool,
}

impl PageScript {
    pub fn with_html(html: &str) -> Self {
        Self {
            html: html.to_string(),
            heights: vec![1000],
            ..Self::default()
        }
    }
}

/// What a [`FakePage`] was asked to do
#[derive(Debug, Clone, Default)]
pub struct PageLog {
    pub calls: Vec<&'static str>,
    pub clicks: Vec<(String, usize)>,
    pub waited_selectors: Vec<String>,
    pub noise_selectors: Vec<String>,
    pub closed: bool,
}

impl PageLog {
    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    pub fn clicked_indices(&self, target: &str) -> Vec<usize> {
        self.clicks
            .iter()
            .filter(|(t, _)| t == target)
            .map(|(_, i)| *i)
            .collect()
    }
}

pub fn visible_link(href: &str) -> ElementInfo {
    ElementInfo {
        index: 0,
        visible: true,
        href: Some(href.to_string()),
    }
}

pub struct FakePage {
    script: PageScript,
    log: Arc<Mutex<PageLog>>,
    url: String,
    heights_read: usize,
    hops: usize,
}

impl FakePage {
    fn note(&self, call: &'static str) {
        self.log.lock().unwrap().calls.push(call);
    }

    fn next_link(&self) -> Option<ElementInfo> {
        self.script.pagination.get(self.hops).map(|url| visible_link(url))
    }
}

fn next_target() -> Target {
    Target::text("a", "Next")
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<(), PageError> {
        self.note("navigate");
        if self.script.hang_on_navigate {
            std::future::pending::<()>().await;
        }
        if self.script.fail_navigate {
            return Err(PageError::Script("net::ERR_NAME_NOT_RESOLVED".to_string()));
        }
        self.url = url.to_string();
        Ok(())
    }

    async fn wait_for_network_idle(&mut self, _timeout: Duration) -> Result<(), PageError> {
        self.note("wait_for_network_idle");
        Ok(())
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), PageError> {
        self.note("wait_for_selector");
        self.log
            .lock()
            .unwrap()
            .waited_selectors
            .push(selector.to_string());
        if self.script.missing_selectors.contains(selector) {
            return Err(PageError::Timeout(timeout));
        }
        Ok(())
    }

    async fn evaluate(
        &mut self,
        _script: &str,
        args: Vec<Value>,
        _timeout: Duration,
    ) -> Result<Value, PageError> {
        self.note("evaluate");
        if let Some(selector) = args.first().and_then(Value::as_str) {
            self.log
                .lock()
                .unwrap()
                .noise_selectors
                .push(selector.to_string());
            if self.script.fail_noise {
                return Err(PageError::Script("invalid selector".to_string()));
            }
            return Ok(json!(0));
        }

        if self.script.fail_height {
            return Err(PageError::Script("document.body is null".to_string()));
        }
        let last = self.script.heights.len().saturating_sub(1);
        let height = self
            .script
            .heights
            .get(self.heights_read.min(last))
            .copied()
            .unwrap_or(0);
        self.heights_read += 1;
        Ok(json!(height))
    }

    async fn query_selector_all(
        &mut self,
        target: &Target,
        _timeout: Duration,
    ) -> Result<Vec<ElementInfo>, PageError> {
        self.note("query_selector_all");
        if *target == next_target() {
            return Ok(self.next_link().into_iter().collect());
        }
        Ok(self
            .script
            .elements
            .get(&target.to_string())
            .cloned()
            .unwrap_or_default())
    }

    async fn click(
        &mut self,
        target: &Target,
        element: &ElementInfo,
        _timeout: Duration,
    ) -> Result<(), PageError> {
        self.note("click");
        let key = (target.to_string(), element.index);
        if self.script.failing_clicks.contains(&key) {
            return Err(PageError::Script("element not interactable".to_string()));
        }
        self.log.lock().unwrap().clicks.push(key);

        if *target == next_target() {
            if let Some(url) = self.script.pagination.get(self.hops) {
                self.url = url.clone();
                self.hops += 1;
            }
        }
        Ok(())
    }

    async fn scroll_to_bottom(&mut self, _timeout: Duration) -> Result<(), PageError> {
        self.note("scroll_to_bottom");
        Ok(())
    }

    async fn content(&mut self, _timeout: Duration) -> Result<String, PageError> {
        self.note("content");
        Ok(self.script.html.clone())
    }

    async fn current_url(&mut self, _timeout: Duration) -> Result<String, PageError> {
        self.note("current_url");
        Ok(self.url.clone())
    }

    async fn close(&mut self) -> Result<(), PageError> {
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Hands out [`FakePage`]s that share one [`PageLog`]
pub struct FakeLauncher {
    script: PageScript,
    log: Arc<Mutex<PageLog>>,
    launches: AtomicUsize,
    fail: bool,
}

impl FakeLauncher {
    pub fn new(script: PageScript) -> Self {
        Self {
            script,
            log: Arc::new(Mutex::new(PageLog::default())),
            launches: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(PageScript::default())
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn log(&self) -> PageLog {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserPage>, PageError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PageError::Script("no browser available".to_string()));
        }
        Ok(Box::new(FakePage {
            script: self.script.clone(),
            log: self.log.clone(),
            url: String::new(),
            heights_read: 0,
            hops: 0,
        }))
    }
}
