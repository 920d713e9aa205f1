use serde::{Deserialize, Serialize};

/// Everything extracted from one page, plus the trail of how it was obtained
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    /// Normalized URL that was scraped
    pub url: String,

    /// RFC 3339 UTC timestamp of when the scrape started
    pub scraped_at: String,

    /// Document-level metadata
    pub meta: PageMeta,

    /// Ordered, deduplicated content sections
    pub sections: Vec<Section>,

    /// Actions performed in the browser, if the dynamic path ran
    pub interactions: InteractionRecord,

    /// Every stage failure, in the order it happened
    pub errors: Vec<ErrorEntry>,
}

impl ScrapeResult {
    /// Create an empty result for the given URL, stamped with the current time
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            scraped_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            meta: PageMeta::default(),
            sections: Vec::new(),
            interactions: InteractionRecord::new(&url),
            errors: Vec::new(),
            url,
        }
    }

    /// Sum of the text lengths (in characters) of all sections
    pub fn total_text_len(&self) -> usize {
        self.sections
            .iter()
            .map(|s| s.content.text.chars().count())
            .sum()
    }

    pub fn push_error(&mut self, entry: ErrorEntry) {
        self.errors.push(entry);
    }
}

/// Document-level metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub title: String,
    pub description: String,
    pub language: String,
    pub canonical: Option<String>,
}

impl Default for PageMeta {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            language: "en".to_string(),
            canonical: None,
        }
    }
}

/// Section type: one of the landmark tags, or a generic container found by
/// the content-div heuristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Main,
    Section,
    Article,
    Nav,
    Aside,
    Footer,
    Header,
    Div,
}

impl SectionKind {
    /// Landmark tags, in the order they are listed in selectors
    pub const LANDMARKS: [SectionKind; 7] = [
        SectionKind::Main,
        SectionKind::Section,
        SectionKind::Article,
        SectionKind::Nav,
        SectionKind::Aside,
        SectionKind::Footer,
        SectionKind::Header,
    ];

    /// Map an element name to a section kind
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "main" => Some(SectionKind::Main),
            "section" => Some(SectionKind::Section),
            "article" => Some(SectionKind::Article),
            "nav" => Some(SectionKind::Nav),
            "aside" => Some(SectionKind::Aside),
            "footer" => Some(SectionKind::Footer),
            "header" => Some(SectionKind::Header),
            "div" => Some(SectionKind::Div),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            SectionKind::Main => "main",
            SectionKind::Section => "section",
            SectionKind::Article => "article",
            SectionKind::Nav => "nav",
            SectionKind::Aside => "aside",
            SectionKind::Footer => "footer",
            SectionKind::Header => "header",
            SectionKind::Div => "div",
        }
    }

    pub fn is_landmark(&self) -> bool {
        !matches!(self, SectionKind::Div)
    }
}

/// A labeled region of the page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Tag name plus discovery index, e.g. `article-2`
    pub id: String,

    #[serde(rename = "type")]
    pub kind: SectionKind,

    pub label: String,
    pub source_url: String,
    pub content: SectionContent,

    /// Outer HTML of the element, possibly cut and suffixed with `...`
    pub raw_html: String,

    /// Whether `raw_html` was cut
    pub truncated: bool,
}

/// Structured content of a section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionContent {
    pub headings: Vec<String>,
    pub text: String,
    pub links: Vec<Link>,
    pub images: Vec<Image>,
    pub lists: Vec<Vec<String>>,
    pub tables: Vec<Vec<Vec<String>>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub text: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub src: String,
    pub alt: String,
}

/// Read-only view of the interactions performed during the dynamic phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// Selectors whose click succeeded, in order
    pub clicks: Vec<String>,
    pub scrolls: u32,
    /// Visited URLs, origin first, no duplicates
    pub pages: Vec<String>,
}

impl InteractionRecord {
    pub fn new(origin: &str) -> Self {
        Self {
            clicks: Vec::new(),
            scrolls: 0,
            pages: vec![origin.to_string()],
        }
    }
}

/// Pipeline phase an error is reported under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Validation,
    Fetch,
    Render,
    Interaction,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub message: String,
    pub phase: Phase,
}

impl ErrorEntry {
    pub fn new(message: impl Into<String>, phase: Phase) -> Self {
        Self {
            message: message.into(),
            phase,
        }
    }
}
