//! Turns an arbitrary HTML document into an ordered, deduplicated list of
//! labeled sections.
//!
//! Candidates are the semantic landmark elements in document order. Pages
//! with fewer than two landmarks also get "content divs": generic
//! containers with enough text and at least two child `div`s, which is what
//! card and listing layouts look like without semantic markup. When nothing
//! survives filtering, the whole body becomes a single fallback section, so
//! the output is never empty.

use crate::config::ScraperConfig;
use crate::filter::UrlFilter;
use crate::parsers::html::{selector, visible_text};
use crate::results::{Image, Link, Section, SectionContent, SectionKind};
use crate::utils::{take_chars, truncate_text};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

/// Nav sections shorter than this are link bars, not content
const NAV_MIN_TEXT: usize = 50;

/// Number of leading text characters that identify a section
const FINGERPRINT_WINDOW: usize = 300;

const CONTENT_DIV_MIN_TEXT: usize = 300;
const CONTENT_DIV_MIN_CHILDREN: usize = 2;

const MAX_LABEL_LENGTH: usize = 100;

const FALLBACK_ID: &str = "main-0";
const FALLBACK_LABEL: &str = "Main Content";

static LANDMARKS: LazyLock<Selector> = LazyLock::new(|| {
    let tags: Vec<&str> = SectionKind::LANDMARKS.iter().map(SectionKind::tag).collect();
    selector(&tags.join(", "))
});
static DIVS: LazyLock<Selector> = LazyLock::new(|| selector("div"));
static BODY: LazyLock<Selector> = LazyLock::new(|| selector("body"));
static HEADINGS: LazyLock<Selector> = LazyLock::new(|| selector("h1, h2, h3, h4, h5, h6"));
static ANCHORS: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static IMAGES: LazyLock<Selector> = LazyLock::new(|| selector("img[src]"));
static LISTS: LazyLock<Selector> = LazyLock::new(|| selector("ul, ol"));
static LIST_ITEMS: LazyLock<Selector> = LazyLock::new(|| selector("li"));
static TABLES: LazyLock<Selector> = LazyLock::new(|| selector("table"));
static ROWS: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static CELLS: LazyLock<Selector> = LazyLock::new(|| selector("td, th"));

/// Digest of the first [`FINGERPRINT_WINDOW`] characters of a section's text.
///
/// Two sections sharing a long common prefix (repeated boilerplate headers,
/// a `main` wrapping a single `article`) collapse to the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub fn of(text: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        take_chars(text, FINGERPRINT_WINDOW).hash(&mut hasher);
        Fingerprint(hasher.finish())
    }
}

/// An element that may become a section
struct Candidate<'a> {
    element: ElementRef<'a>,
    kind: SectionKind,
}

/// Extracts sections from HTML using the limits from [`ScraperConfig`]
#[derive(Debug)]
pub struct SectionExtractor {
    filter: UrlFilter,
    max_raw_html_length: usize,
    max_link_text_length: usize,
    max_alt_text_length: usize,
}

impl Default for SectionExtractor {
    fn default() -> Self {
        Self::new(&ScraperConfig::default())
    }
}

/// Parse sections with the default configuration
pub fn parse_sections(html: &str, base_url: &str) -> Vec<Section> {
    SectionExtractor::default().parse_sections(html, base_url)
}

impl SectionExtractor {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            filter: UrlFilter::with_schemes(&config.allowed_schemes),
            max_raw_html_length: config.max_raw_html_length,
            max_link_text_length: config.max_link_text_length,
            max_alt_text_length: config.max_alt_text_length,
        }
    }

    /// Parse `html` into sections; the result is never empty
    pub fn parse_sections(&self, html: &str, base_url: &str) -> Vec<Section> {
        let doc = Html::parse_document(html);
        self.extract(&doc, base_url)
    }

    /// Extract sections from an already parsed document
    pub fn extract(&self, doc: &Html, base_url: &str) -> Vec<Section> {
        let candidates = discover(doc);
        ::log::debug!("Found {} section candidates in {}", candidates.len(), base_url);

        let mut seen = HashSet::new();
        let mut sections = Vec::new();

        for (index, candidate) in candidates.into_iter().enumerate() {
            let content = self.extract_content(candidate.element, base_url);
            if content.text.is_empty() {
                continue;
            }

            if candidate.kind == SectionKind::Nav && content.text.chars().count() < NAV_MIN_TEXT {
                ::log::trace!("Skipping link-bar nav {}-{}", candidate.kind.tag(), index);
                continue;
            }

            if !seen.insert(Fingerprint::of(&content.text)) {
                ::log::trace!("Skipping duplicate section {}-{}", candidate.kind.tag(), index);
                continue;
            }

            sections.push(self.build_section(
                format!("{}-{}", candidate.kind.tag(), index),
                candidate.kind,
                label_for(candidate.element, candidate.kind, &content),
                candidate.element,
                content,
                base_url,
            ));
        }

        if sections.is_empty() {
            ::log::debug!("No sections survived for {}, using body fallback", base_url);
            sections.push(self.fallback_section(doc, base_url));
        }

        sections
    }

    /// Extract headings, text, links, images, lists and tables from `element`
    pub fn extract_content(&self, element: ElementRef<'_>, base_url: &str) -> SectionContent {
        let headings = element
            .select(&HEADINGS)
            .map(visible_text)
            .filter(|h| !h.is_empty())
            .collect();

        let links = element
            .select(&ANCHORS)
            .filter_map(|a| {
                let href = self.filter.resolve_link(a.value().attr("href")?, base_url)?;
                let (text, _) = truncate_text(&visible_text(a), self.max_link_text_length);
                Some(Link { text, href })
            })
            .collect();

        let images = element
            .select(&IMAGES)
            .filter_map(|img| {
                let src = self.filter.resolve_image(img.value().attr("src")?, base_url)?;
                let alt = crate::parsers::text::sanitize_text(img.value().attr("alt").unwrap_or(""));
                let (alt, _) = truncate_text(&alt, self.max_alt_text_length);
                Some(Image { src, alt })
            })
            .collect();

        let lists = element
            .select(&LISTS)
            .map(|list| {
                list.select(&LIST_ITEMS)
                    .map(visible_text)
                    .filter(|item| !item.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|items| !items.is_empty())
            .collect();

        let tables = element
            .select(&TABLES)
            .map(|table| {
                table
                    .select(&ROWS)
                    .map(|row| {
                        row.select(&CELLS)
                            .map(visible_text)
                            .filter(|cell| !cell.is_empty())
                            .collect::<Vec<_>>()
                    })
                    .filter(|row| !row.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|rows| !rows.is_empty())
            .collect();

        SectionContent {
            headings,
            text: visible_text(element),
            links,
            images,
            lists,
            tables,
        }
    }

    /// One section covering the whole body, exempt from the nav and
    /// duplicate filters
    fn fallback_section(&self, doc: &Html, base_url: &str) -> Section {
        let body = doc.select(&BODY).next().unwrap_or_else(|| doc.root_element());
        let content = self.extract_content(body, base_url);
        self.build_section(
            FALLBACK_ID.to_string(),
            SectionKind::Section,
            FALLBACK_LABEL.to_string(),
            body,
            content,
            base_url,
        )
    }

    fn build_section(
        &self,
        id: String,
        kind: SectionKind,
        label: String,
        element: ElementRef<'_>,
        content: SectionContent,
        base_url: &str,
    ) -> Section {
        let (raw_html, truncated) = truncate_text(&element.html(), self.max_raw_html_length);
        Section {
            id,
            kind,
            label,
            source_url: base_url.to_string(),
            content,
            raw_html,
            truncated,
        }
    }
}

/// Landmarks in document order, then content divs when landmarks are scarce
fn discover(doc: &Html) -> Vec<Candidate<'_>> {
    let mut candidates: Vec<Candidate<'_>> = doc
        .select(&LANDMARKS)
        .filter_map(|element| {
            SectionKind::from_tag(element.value().name())
                .filter(SectionKind::is_landmark)
                .map(|kind| Candidate { element, kind })
        })
        .collect();

    if candidates.len() < 2 {
        let landmark_count = candidates.len();
        candidates.extend(
            doc.select(&DIVS)
                .filter(|div| is_content_div(*div))
                .map(|element| Candidate {
                    element,
                    kind: SectionKind::Div,
                }),
        );
        ::log::debug!(
            "Only {} landmark(s), added {} content divs",
            landmark_count,
            candidates.len() - landmark_count
        );
    }

    candidates
}

/// Long enough text plus repeated direct child containers
fn is_content_div(div: ElementRef<'_>) -> bool {
    let child_divs = div
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "div")
        .count();

    child_divs >= CONTENT_DIV_MIN_CHILDREN
        && visible_text(div).chars().count() >= CONTENT_DIV_MIN_TEXT
}

/// First heading, else `aria-label`, else the uppercased tag name
fn label_for(element: ElementRef<'_>, kind: SectionKind, content: &SectionContent) -> String {
    if let Some(heading) = content.headings.first() {
        return take_chars(heading, MAX_LABEL_LENGTH).to_string();
    }

    if let Some(aria) = element.value().attr("aria-label") {
        let aria = aria.trim();
        if !aria.is_empty() {
            return take_chars(aria, MAX_LABEL_LENGTH).to_string();
        }
    }

    kind.tag().to_uppercase()
}
