use crate::config::ScraperConfig;
use crate::error::PageError;
use crate::fetchers::browser::{BrowserLauncher, BrowserPage, ElementInfo, Target};
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{Map, Value, json};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Endpoints tried when the configured WebDriver refuses the session
const FALLBACK_WEBDRIVER_URLS: [&str; 4] = [
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4444", // Selenium / geckodriver default
    "http://localhost:9222", // Chrome debug port default
    "http://127.0.0.1:4444", // Try with IP instead of localhost
];

/// Poll interval while waiting for the network to go quiet
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Consecutive unchanged polls that count as idle
const IDLE_STABLE_POLLS: u32 = 2;

const NETWORK_STATE_SCRIPT: &str =
    "return [document.readyState, performance.getEntriesByType('resource').length];";

/// Opens WebDriver sessions configured from [`ScraperConfig`]
pub struct WebDriverLauncher {
    config: Arc<ScraperConfig>,
}

impl WebDriverLauncher {
    pub fn new(config: Arc<ScraperConfig>) -> Self {
        Self { config }
    }

    /// Session capabilities for Chrome and Firefox drivers
    fn capabilities(&self) -> Map<String, Value> {
        let config = &self.config;
        let mut chrome_args = vec![
            "--no-sandbox".to_string(),
            "--disable-setuid-sandbox".to_string(),
            format!("--window-size={},{}", config.window_width, config.window_height),
            format!("--user-agent={}", config.user_agent),
        ];
        let mut firefox_args = vec![
            format!("--width={}", config.window_width),
            format!("--height={}", config.window_height),
        ];
        if config.headless {
            chrome_args.push("--headless=new".to_string());
            firefox_args.push("-headless".to_string());
        }

        let mut caps = Map::new();
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": chrome_args }));
        caps.insert(
            "moz:firefoxOptions".to_string(),
            json!({
                "args": firefox_args,
                "prefs": { "general.useragent.override": config.user_agent },
            }),
        );
        caps
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserPage>, PageError> {
        let client = connect_to_webdriver(&self.config.webdriver_url, self.capabilities()).await?;
        Ok(Box::new(WebDriverPage::new(client)))
    }
}

/// Connects to the WebDriver instance, falling back to common local endpoints
async fn connect_to_webdriver(
    webdriver_url: &str,
    capabilities: Map<String, Value>,
) -> Result<Client, PageError> {
    let mut builder = ClientBuilder::native();
    builder.capabilities(capabilities);

    let first_error = match builder.connect(webdriver_url).await {
        Ok(client) => {
            ::log::debug!("Connected to WebDriver at {}", webdriver_url);
            return Ok(client);
        }
        Err(e) => {
            ::log::error!("Failed to connect to WebDriver at {}: {}", webdriver_url, e);
            e
        }
    };

    for url in FALLBACK_WEBDRIVER_URLS.iter() {
        if *url == webdriver_url {
            continue; // Skip if it's the same as the one we already tried
        }

        ::log::info!("Trying fallback WebDriver URL: {}", url);
        if let Ok(client) = builder.connect(url).await {
            ::log::debug!("Connected to fallback WebDriver at {}", url);
            return Ok(client);
        }
    }

    ::log::error!(
        "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
    );
    Err(first_error.into())
}

/// A browser page driven over the WebDriver protocol
pub struct WebDriverPage {
    client: Option<Client>,
}

impl WebDriverPage {
    pub fn new(client: Client) -> Self {
        Self {
            client: Some(client),
        }
    }

    fn client(&self) -> Result<&Client, PageError> {
        self.client.as_ref().ok_or(PageError::Closed)
    }
}

/// Bound a WebDriver round-trip by `timeout`
async fn within<T, E, F>(timeout: Duration, fut: F) -> Result<T, PageError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<PageError>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(PageError::Timeout(timeout)),
    }
}

async fn find_all(client: &Client, target: &Target) -> Result<Vec<Element>, PageError> {
    let elements = match target {
        Target::Css(css) => client.find_all(Locator::Css(css)).await?,
        Target::Text { .. } => {
            let xpath = target.to_xpath().unwrap_or_default();
            client.find_all(Locator::XPath(&xpath)).await?
        }
    };
    Ok(elements)
}

#[async_trait]
impl BrowserPage for WebDriverPage {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), PageError> {
        let client = self.client()?;
        ::log::debug!("Navigating to {}", url);
        within(timeout, client.goto(url)).await
    }

    async fn wait_for_network_idle(&mut self, timeout: Duration) -> Result<(), PageError> {
        let client = self.client()?;
        within(timeout, async {
            let mut last: Option<Value> = None;
            let mut stable = 0;
            loop {
                let state = client.execute(NETWORK_STATE_SCRIPT, Vec::new()).await?;
                let complete = state.get(0).and_then(Value::as_str) == Some("complete");
                if complete && last.as_ref() == Some(&state) {
                    stable += 1;
                    if stable >= IDLE_STABLE_POLLS {
                        return Ok::<(), PageError>(());
                    }
                } else {
                    stable = 0;
                }
                last = Some(state);
                tokio::time::sleep(IDLE_POLL).await;
            }
        })
        .await
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), PageError> {
        let client = self.client()?;
        within(timeout, async {
            client
                .wait()
                .at_most(timeout)
                .for_element(Locator::Css(selector))
                .await
                .map(|_| ())
        })
        .await
    }

    async fn evaluate(
        &mut self,
        script: &str,
        args: Vec<Value>,
        timeout: Duration,
    ) -> Result<Value, PageError> {
        let client = self.client()?;
        within(timeout, client.execute(script, args)).await
    }

    async fn query_selector_all(
        &mut self,
        target: &Target,
        timeout: Duration,
    ) -> Result<Vec<ElementInfo>, PageError> {
        let client = self.client()?;
        within(timeout, async {
            let elements = find_all(client, target).await?;
            let mut infos = Vec::with_capacity(elements.len());
            for (index, element) in elements.iter().enumerate() {
                // Elements can go stale between the query and these reads
                let visible = element.is_displayed().await.unwrap_or(false);
                let href = element.attr("href").await.ok().flatten();
                infos.push(ElementInfo {
                    index,
                    visible,
                    href,
                });
            }
            Ok::<_, PageError>(infos)
        })
        .await
    }

    async fn click(
        &mut self,
        target: &Target,
        element: &ElementInfo,
        timeout: Duration,
    ) -> Result<(), PageError> {
        let client = self.client()?;
        within(timeout, async {
            let elements = find_all(client, target).await?;
            let found = elements
                .get(element.index)
                .ok_or_else(|| PageError::NotFound(format!("{} #{}", target, element.index)))?;
            found.click().await?;
            Ok::<(), PageError>(())
        })
        .await
    }

    async fn scroll_to_bottom(&mut self, timeout: Duration) -> Result<(), PageError> {
        let client = self.client()?;
        within(
            timeout,
            client.execute("window.scrollTo(0, document.body.scrollHeight);", Vec::new()),
        )
        .await
        .map(|_| ())
    }

    async fn content(&mut self, timeout: Duration) -> Result<String, PageError> {
        let client = self.client()?;
        within(timeout, client.source()).await
    }

    async fn current_url(&mut self, timeout: Duration) -> Result<String, PageError> {
        let client = self.client()?;
        within(timeout, client.current_url())
            .await
            .map(|url| url.to_string())
    }

    async fn close(&mut self) -> Result<(), PageError> {
        if let Some(client) = self.client.take() {
            client.close().await?;
            ::log::debug!("WebDriver session closed");
        }
        Ok(())
    }
}

impl Drop for WebDriverPage {
    fn drop(&mut self) {
        // Dropped without close(): finish the release on the runtime
        if let Some(client) = self.client.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        if let Err(e) = client.close().await {
                            ::log::warn!("Failed to close abandoned WebDriver session: {}", e);
                        }
                    });
                }
                Err(_) => ::log::warn!("WebDriver session dropped outside a runtime"),
            }
        }
    }
}
