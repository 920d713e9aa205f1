pub mod config;
pub mod engine;
pub mod error;
pub mod fetchers;
pub mod filter;
pub mod interactions;
pub mod parsers;
pub mod results;
pub mod utils;

#[cfg(test)]
mod testing;

// Re-export commonly used types for convenience
pub use config::ScraperConfig;
pub use engine::{Engine, ScrapeRequest, Strategy};
pub use error::{PageError, ScrapeError};
pub use results::{ErrorEntry, InteractionRecord, Phase, ScrapeResult, Section};

/// Builder for a single scrape
pub struct Scrape {
    url: String,
    strategy: Strategy,
    max_depth: Option<u8>,
    config: ScraperConfig,
}

impl Scrape {
    /// Create a new Scrape builder for `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            strategy: Strategy::Auto,
            max_depth: None,
            config: ScraperConfig::default(),
        }
    }

    /// Always render in a browser when `force` is set
    pub fn with_force_dynamic(self, force: bool) -> Self {
        self.with_strategy(Strategy::from_force_dynamic(Some(force)))
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the pagination depth (clamped to 1..=5)
    pub fn with_max_depth(mut self, max_depth: u8) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_config(mut self, config: ScraperConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a file
    pub fn with_config_file(
        self,
        path: impl AsRef<std::path::Path>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let config = ScraperConfig::from_file(path)?;
        Ok(self.with_config(config))
    }

    /// Load configuration from a string
    pub fn with_config_str(self, config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config = ScraperConfig::from_json(config_str)?;
        Ok(self.with_config(config))
    }

    /// The request this builder will run
    pub fn request(&self) -> ScrapeRequest {
        ScrapeRequest::new(self.url.as_str())
            .with_strategy(self.strategy)
            .with_max_depth(self.max_depth.unwrap_or(self.config.max_depth))
    }

    /// Run the scrape. Only client construction can fail; stage failures
    /// are reported inside the result.
    pub async fn run(self) -> Result<ScrapeResult, ScrapeError> {
        let request = self.request();
        let engine = Engine::new(self.config.with_env_overrides())?;
        Ok(engine.scrape(&request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let request = Scrape::new("https://example.com").request();
        assert_eq!(request.url, "https://example.com");
        assert_eq!(request.strategy, Strategy::Auto);
        assert_eq!(request.max_depth, 3);
    }

    #[test]
    fn test_builder_options() {
        let request = Scrape::new("https://example.com")
            .with_force_dynamic(true)
            .with_max_depth(12)
            .request();
        assert_eq!(request.strategy, Strategy::JsOnly);
        assert_eq!(request.max_depth, 5);
    }

    #[test]
    fn test_depth_from_config() {
        let request = Scrape::new("https://example.com")
            .with_config_str(r#"{"max_depth": 2}"#)
            .unwrap()
            .request();
        assert_eq!(request.max_depth, 2);
    }

    #[test]
    fn test_invalid_config_str() {
        assert!(Scrape::new("x").with_config_str("{not json").is_err());
    }

    #[tokio::test]
    async fn test_run_rejects_bad_scheme_without_network() {
        let result = Scrape::new("ftp://example.com").run().await.unwrap();
        assert!(result.sections.is_empty());
        assert_eq!(result.errors[0].phase, Phase::Validation);
    }
}
