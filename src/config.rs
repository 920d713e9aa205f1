use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Process-wide scraper settings.
///
/// Built once at startup and handed to each component as an
/// `Arc<ScraperConfig>`; nothing mutates it afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Timeout for the static HTTP fetch, in seconds
    #[serde(default = "default_static_timeout_secs")]
    pub static_timeout_secs: u64,

    /// Timeout for browser navigation, in seconds
    #[serde(default = "default_render_timeout_secs")]
    pub render_timeout_secs: u64,

    /// Timeout for a single interaction step (click, query), in seconds
    #[serde(default = "default_interaction_timeout_secs")]
    pub interaction_timeout_secs: u64,

    /// Deadline for the whole per-request pipeline, in seconds
    #[serde(default = "default_global_timeout_secs")]
    pub global_timeout_secs: u64,

    /// Below this many characters of extracted text the dynamic path runs
    #[serde(default = "default_low_content_threshold")]
    pub low_content_threshold: usize,

    /// Default pagination depth when a request does not give one
    #[serde(default = "default_max_depth")]
    pub max_depth: u8,

    /// Pause after each scroll-to-bottom, in milliseconds
    #[serde(default = "default_scroll_delay_ms")]
    pub scroll_delay_ms: u64,

    /// Maximum number of infinite-scroll iterations
    #[serde(default = "default_scroll_attempts")]
    pub scroll_attempts: u32,

    #[serde(default = "default_max_raw_html_length")]
    pub max_raw_html_length: usize,

    #[serde(default = "default_max_text_length")]
    pub max_link_text_length: usize,

    #[serde(default = "default_max_text_length")]
    pub max_alt_text_length: usize,

    /// CSS selectors removed from the rendered DOM before serialization
    #[serde(default = "default_noise_selectors")]
    pub noise_selectors: Vec<String>,

    #[serde(default = "default_allowed_schemes")]
    pub allowed_schemes: Vec<String>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default = "default_headless")]
    pub headless: bool,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,
}

fn default_static_timeout_secs() -> u64 {
    30
}

fn default_render_timeout_secs() -> u64 {
    60
}

fn default_interaction_timeout_secs() -> u64 {
    10
}

fn default_global_timeout_secs() -> u64 {
    120
}

fn default_low_content_threshold() -> usize {
    400
}

fn default_max_depth() -> u8 {
    3
}

fn default_scroll_delay_ms() -> u64 {
    2000
}

fn default_scroll_attempts() -> u32 {
    3
}

fn default_max_raw_html_length() -> usize {
    10_000
}

fn default_max_text_length() -> usize {
    200
}

fn default_noise_selectors() -> Vec<String> {
    [
        r#"[class*="cookie"]"#,
        r#"[id*="cookie"]"#,
        ".modal",
        ".popup",
        r#"[class*="popup"]"#,
        r#"[class*="newsletter"]"#,
        r#"[class*="overlay"]"#,
        r#"[class*="ad"]"#,
        r#"[class*="banner"]"#,
        r#"[class*="ads"]"#,
        "script",
        "style",
        "iframe",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_allowed_schemes() -> Vec<String> {
    vec!["http".to_string(), "https".to_string()]
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            static_timeout_secs: default_static_timeout_secs(),
            render_timeout_secs: default_render_timeout_secs(),
            interaction_timeout_secs: default_interaction_timeout_secs(),
            global_timeout_secs: default_global_timeout_secs(),
            low_content_threshold: default_low_content_threshold(),
            max_depth: default_max_depth(),
            scroll_delay_ms: default_scroll_delay_ms(),
            scroll_attempts: default_scroll_attempts(),
            max_raw_html_length: default_max_raw_html_length(),
            max_link_text_length: default_max_text_length(),
            max_alt_text_length: default_max_text_length(),
            noise_selectors: default_noise_selectors(),
            allowed_schemes: default_allowed_schemes(),
            user_agent: default_user_agent(),
            webdriver_url: default_webdriver_url(),
            headless: default_headless(),
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

impl ScraperConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, Box<dyn Error>> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Apply overrides from the environment
    pub fn with_env_overrides(mut self) -> Self {
        // Override the WebDriver URL with an environment variable if provided
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.webdriver_url = webdriver_url;
            }
        }
        self
    }

    pub fn static_timeout(&self) -> Duration {
        Duration::from_secs(self.static_timeout_secs)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn interaction_timeout(&self) -> Duration {
        Duration::from_secs(self.interaction_timeout_secs)
    }

    pub fn global_timeout(&self) -> Duration {
        Duration::from_secs(self.global_timeout_secs)
    }

    pub fn scroll_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScraperConfig::default();
        assert_eq!(config.global_timeout(), Duration::from_secs(120));
        assert_eq!(config.low_content_threshold, 400);
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.scroll_delay(), Duration::from_millis(2000));
        assert_eq!(config.allowed_schemes, vec!["http", "https"]);
        assert!(config.noise_selectors.iter().any(|s| s == "iframe"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            ScraperConfig::from_json(r#"{"scroll_attempts": 5, "headless": false}"#).unwrap();
        assert_eq!(config.scroll_attempts, 5);
        assert!(!config.headless);
        assert_eq!(config.max_raw_html_length, 10_000);
        assert_eq!(config.webdriver_url, "http://localhost:4444");
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(ScraperConfig::from_json("{not json").is_err());
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("sift-page-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"low_content_threshold": 10}"#).unwrap();
        let config = ScraperConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.low_content_threshold, 10);
    }
}
