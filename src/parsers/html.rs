use crate::parsers::text;
use crate::results::PageMeta;
use crate::utils::make_absolute_url;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Elements whose text never counts as visible content
const INVISIBLE_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));
static META_NAMED: LazyLock<Selector> = LazyLock::new(|| selector("meta[name], meta[property]"));
static LINK_REL: LazyLock<Selector> = LazyLock::new(|| selector("link[rel][href]"));

/// Parse a selector that is known at compile time
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e}"))
}

/// Whitespace-normalized text of `element`, skipping script-like subtrees
pub fn visible_text(element: ElementRef<'_>) -> String {
    let root = element.id();
    let fragments = element.descendants().filter_map(|node| {
        let Node::Text(fragment) = node.value() else {
            return None;
        };
        let hidden = node
            .ancestors()
            .take_while(|ancestor| ancestor.id() != root)
            .chain(std::iter::once(*element))
            .filter_map(|ancestor| ancestor.value().as_element())
            .any(|el| INVISIBLE_TAGS.contains(&el.name()));
        if hidden { None } else { Some(&**fragment) }
    });
    text::join_fragments(fragments)
}

/// Parse `html` and extract its document metadata
pub fn parse_metadata(html: &str, base_url: &str) -> PageMeta {
    extract_metadata(&Html::parse_document(html), base_url)
}

/// Extract title, description, language and canonical URL from a document
pub fn extract_metadata(doc: &Html, base_url: &str) -> PageMeta {
    let mut meta = PageMeta::default();

    if let Some(title) = doc.select(&TITLE).next() {
        meta.title = visible_text(title);
    }

    meta.description = meta_content(doc, "description")
        .or_else(|| meta_content(doc, "og:description"))
        .unwrap_or_default();

    if let Some(lang) = doc.root_element().value().attr("lang") {
        let lang = lang.trim();
        if !lang.is_empty() {
            meta.language = lang.to_string();
        }
    }

    meta.canonical = doc
        .select(&LINK_REL)
        .find(|link| {
            link.value()
                .attr("rel")
                .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("canonical")))
        })
        .and_then(|link| link.value().attr("href"))
        .and_then(|href| make_absolute_url(href, base_url));

    ::log::debug!(
        "Metadata for {}: title={:?}, language={}, canonical={:?}",
        base_url,
        meta.title,
        meta.language,
        meta.canonical
    );

    meta
}

/// Content of the first `<meta>` whose `name` or `property` equals `key`
fn meta_content(doc: &Html, key: &str) -> Option<String> {
    doc.select(&META_NAMED)
        .find(|el| {
            let attrs = el.value();
            attrs
                .attr("name")
                .or_else(|| attrs.attr("property"))
                .is_some_and(|name| name.trim().eq_ignore_ascii_case(key))
        })
        .and_then(|el| el.value().attr("content"))
        .map(text::sanitize_text)
        .filter(|content| !content.is_empty())
}
