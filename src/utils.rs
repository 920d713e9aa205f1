use url::Url;

/// Schemes accepted when no configuration is at hand
pub const DEFAULT_ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

/// Marker appended to anything cut by [`truncate_text`]
pub const TRUNCATION_MARKER: &str = "...";

/// Normalize user input into a fetchable URL: trim, default to https,
/// strip trailing slashes
pub fn clean_url(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return String::new();
    }

    let lower = url.to_ascii_lowercase();
    let with_scheme = if lower.starts_with("http://") || lower.starts_with("https://") {
        url.to_string()
    } else if url.contains("://") {
        // Keep foreign schemes so validation can reject them
        url.to_string()
    } else {
        format!("https://{}", url)
    };

    with_scheme.trim_end_matches('/').to_string()
}

/// Whether `url` is absolute, has a host, and uses one of the default schemes
pub fn is_valid_url(url: &str) -> bool {
    is_valid_url_with(url, &DEFAULT_ALLOWED_SCHEMES)
}

/// Whether `url` is absolute, has a host, and uses one of `allowed_schemes`
pub fn is_valid_url_with<S: AsRef<str>>(url: &str, allowed_schemes: &[S]) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if parsed.host_str().is_none_or(str::is_empty) {
        return false;
    }
    allowed_schemes
        .iter()
        .any(|scheme| scheme.as_ref().eq_ignore_ascii_case(parsed.scheme()))
}

/// Resolve `href` against `base_url`.
///
/// Protocol-relative references get `https:`; absolute http(s) URLs are
/// returned untouched. Returns `None` when the reference cannot be resolved.
pub fn make_absolute_url(href: &str, base_url: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    if href.starts_with("//") {
        return Some(format!("https:{}", href));
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Some(href.to_string());
    }

    let base = Url::parse(base_url).ok()?;
    base.join(href).ok().map(String::from)
}

/// Cut `text` to at most `max_length` characters, appending
/// [`TRUNCATION_MARKER`] when anything was removed
pub fn truncate_text(text: &str, max_length: usize) -> (String, bool) {
    match text.char_indices().nth(max_length) {
        Some((cut, _)) => (format!("{}{}", &text[..cut], TRUNCATION_MARKER), true),
        None => (text.to_string(), false),
    }
}

/// Take the first `max_chars` characters of `text` without a marker
pub fn take_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

/// Host part of a URL, if it has one
pub fn extract_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}

/// Whether two URLs point at the same site, ignoring a leading `www.`
pub fn is_same_domain(url1: &str, url2: &str) -> bool {
    match (extract_domain(url1), extract_domain(url2)) {
        (Some(d1), Some(d2)) => {
            d1.trim_start_matches("www.").eq_ignore_ascii_case(d2.trim_start_matches("www."))
        }
        _ => false,
    }
}
