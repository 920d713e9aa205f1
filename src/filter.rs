use crate::utils::{self, DEFAULT_ALLOWED_SCHEMES};
use regex::Regex;

/// Configuration for filtering the URLs that appear in extracted content
#[derive(Debug, Clone)]
pub struct UrlFilterConfig {
    /// Schemes a page URL may use
    pub allowed_schemes: Vec<String>,

    /// Regex patterns for link hrefs that are never emitted
    pub link_exclude_patterns: Vec<String>,

    /// Regex patterns for image srcs that are never emitted
    pub image_exclude_patterns: Vec<String>,
}

fn default_allowed_schemes() -> Vec<String> {
    DEFAULT_ALLOWED_SCHEMES.iter().map(|s| s.to_string()).collect()
}

fn default_link_excludes() -> Vec<String> {
    vec![
        // In-page anchors
        r"^#".to_string(),
        r"(?i)^javascript:".to_string(),
        r"(?i)^mailto:".to_string(),
        r"(?i)^data:".to_string(),
    ]
}

fn default_image_excludes() -> Vec<String> {
    vec![r"(?i)^data:".to_string()]
}

impl Default for UrlFilterConfig {
    fn default() -> Self {
        Self {
            allowed_schemes: default_allowed_schemes(),
            link_exclude_patterns: default_link_excludes(),
            image_exclude_patterns: default_image_excludes(),
        }
    }
}

/// URL filter that uses regex patterns to decide which hrefs and srcs make
/// it into a section, and which page URLs may be fetched at all
#[derive(Debug)]
pub struct UrlFilter {
    config: UrlFilterConfig,
    link_excludes: Vec<Regex>,
    image_excludes: Vec<Regex>,
}

impl Default for UrlFilter {
    fn default() -> Self {
        Self::new(UrlFilterConfig::default()).expect("Default regex patterns should be valid")
    }
}

impl UrlFilter {
    /// Create a new URL filter from configuration
    pub fn new(config: UrlFilterConfig) -> Result<Self, regex::Error> {
        let link_excludes = compile(&config.link_exclude_patterns)?;
        let image_excludes = compile(&config.image_exclude_patterns)?;

        Ok(Self {
            config,
            link_excludes,
            image_excludes,
        })
    }

    /// Filter with default patterns and the given scheme allow-list
    pub fn with_schemes(allowed_schemes: &[String]) -> Self {
        let mut filter = Self::default();
        filter.config.allowed_schemes = allowed_schemes.to_vec();
        filter
    }

    /// Whether a page URL may be fetched
    pub fn is_allowed_page(&self, url: &str) -> bool {
        utils::is_valid_url_with(url, &self.config.allowed_schemes)
    }

    /// Whether a raw `href` should be kept as an outbound link
    pub fn accepts_link(&self, href: &str) -> bool {
        let href = href.trim();
        !href.is_empty() && !self.link_excludes.iter().any(|r| r.is_match(href))
    }

    /// Whether a raw `src` should be kept as an image
    pub fn accepts_image(&self, src: &str) -> bool {
        let src = src.trim();
        !src.is_empty() && !self.image_excludes.iter().any(|r| r.is_match(src))
    }

    /// Filter and absolutize a link href
    pub fn resolve_link(&self, href: &str, base_url: &str) -> Option<String> {
        if !self.accepts_link(href) {
            return None;
        }
        absolute_web_url(href, base_url)
    }

    /// Filter and absolutize an image src
    pub fn resolve_image(&self, src: &str, base_url: &str) -> Option<String> {
        if !self.accepts_image(src) {
            return None;
        }
        absolute_web_url(src, base_url)
    }
}

/// Resolve `href` and keep it only if it lands on http(s).
///
/// URL parsing strips tabs and newlines, so `java\tscript:` only shows its
/// real scheme after resolution.
fn absolute_web_url(href: &str, base_url: &str) -> Option<String> {
    utils::make_absolute_url(href, base_url)
        .filter(|resolved| utils::is_valid_url_with(resolved, &DEFAULT_ALLOWED_SCHEMES))
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>, regex::Error> {
    let mut regexes = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        regexes.push(Regex::new(pattern)?);
    }
    Ok(regexes)
}
