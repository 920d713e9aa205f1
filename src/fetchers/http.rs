use crate::config::ScraperConfig;
use crate::error::ScrapeError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// One-shot HTTP GET returning the response body as text
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Fetch `url`; network failures and non-2xx statuses are errors
    async fn get(&self, url: &str, timeout: Duration) -> Result<String, ScrapeError>;
}

/// Static fetcher backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct StaticFetcher {
    client: Client,
}

impl StaticFetcher {
    pub fn new(user_agent: &str) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| ScrapeError::Fetch(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn from_config(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        Self::new(&config.user_agent)
    }
}

#[async_trait]
impl HttpFetch for StaticFetcher {
    async fn get(&self, url: &str, timeout: Duration) -> Result<String, ScrapeError> {
        ::log::debug!("Static fetch: {}", url);
        let fetch_start = std::time::Instant::now();

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;

        ::log::debug!(
            "Fetched {} bytes from {} in {:.2} seconds",
            body.len(),
            url,
            fetch_start.elapsed().as_secs_f64()
        );
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::Phase;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_success_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("user-agent", "sift-test/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<main>Hi</main>"))
            .mount(&server)
            .await;

        let fetcher = StaticFetcher::new("sift-test/1.0").unwrap();
        let body = fetcher
            .get(&format!("{}/page", server.uri()), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(body, "<main>Hi</main>");
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = StaticFetcher::new("sift-test/1.0").unwrap();
        let error = fetcher
            .get(&format!("{}/missing", server.uri()), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(error.phase(), Phase::Fetch);
        assert!(error.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_follows_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
            .mount(&server)
            .await;

        let fetcher = StaticFetcher::new("sift-test/1.0").unwrap();
        let body = fetcher
            .get(&format!("{}/old", server.uri()), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(body, "moved");
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let fetcher = StaticFetcher::new("sift-test/1.0").unwrap();
        let error = fetcher
            .get(&server.uri(), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert_eq!(error.phase(), Phase::Fetch);
    }

    #[tokio::test]
    async fn test_connection_refused_is_fetch_error() {
        let fetcher = StaticFetcher::new("sift-test/1.0").unwrap();
        let error = fetcher
            .get("http://127.0.0.1:9/", Duration::from_secs(2))
            .await
            .unwrap_err();
        assert_eq!(error.phase(), Phase::Fetch);
    }
}
