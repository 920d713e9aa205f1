//! Whitespace normalization shared by every text-producing extractor.

/// Collapses every whitespace run (including non-breaking spaces and
/// newlines) to a single space and trims both ends
pub fn sanitize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Joins text fragments with single spaces and normalizes the result.
///
/// Fragments are the raw text nodes of an element; adjacent nodes are
/// always separated so `<b>a</b><i>b</i>` reads as `a b`.
pub fn join_fragments<'a, I>(fragments: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut words: Vec<&str> = Vec::new();
    for fragment in fragments {
        words.extend(fragment.split_whitespace());
    }
    words.join(" ")
}
