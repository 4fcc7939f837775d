//! Shared utilities for resolver modules: host matching, static regexes and
//! the small amount of HTML walking the reader pages need.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Compiles a regex at static init; panics on invalid pattern.
pub fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static IMG_TAG_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"(?is)<img\b[^>]*>"));

static ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#,
    )
});

/// Normalizes a host string: trim, strip leading "www.", trailing '.', and lowercases.
#[must_use]
pub fn canonical_host(host: &str) -> String {
    host.trim()
        .trim_start_matches("www.")
        .trim_end_matches('.')
        .to_ascii_lowercase()
}

/// Parses `url_or_host` as a URL and returns the host, or normalizes it as a bare host string.
#[must_use]
pub fn parse_host_or_fallback(url_or_host: &str) -> String {
    Url::parse(url_or_host)
        .ok()
        .and_then(|url| url.host_str().map(std::string::ToString::to_string))
        .unwrap_or_else(|| canonical_host(url_or_host))
}

/// Returns true if the two host strings refer to the same host after normalization.
#[must_use]
pub fn hosts_match(lhs: &str, rhs: &str) -> bool {
    canonical_host(lhs) == canonical_host(rhs)
}

/// Decodes the handful of entities that show up inside attribute values.
#[must_use]
pub fn decode_entities(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Returns the value of attribute `name` in a single start tag, entity-decoded.
#[must_use]
pub fn tag_attribute(tag: &str, name: &str) -> Option<String> {
    ATTRIBUTE_RE.captures_iter(tag).find_map(|caps| {
        let attr = caps.get(1)?;
        if !attr.as_str().eq_ignore_ascii_case(name) {
            return None;
        }
        caps.get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| decode_entities(m.as_str()))
    })
}

/// Returns every `<img>` start tag in `html`, in document order.
pub fn img_tags(html: &str) -> impl Iterator<Item = &str> {
    IMG_TAG_RE.find_iter(html).map(|m| m.as_str())
}

/// Returns the inner HTML of the first `<tag id="id">` element.
///
/// Nested elements of the same tag are balanced, so a `<div id="content">`
/// containing inner `<div>`s yields its whole body. An unclosed element
/// extends to the end of the document.
#[must_use]
pub fn element_inner_by_id<'a>(html: &'a str, tag: &str, id: &str) -> Option<&'a str> {
    let lower = html.to_ascii_lowercase();
    let open_prefix = format!("<{}", tag.to_ascii_lowercase());
    let close_tag = format!("</{}", tag.to_ascii_lowercase());

    let mut search_from = 0;
    let body_start = loop {
        let start = search_from + lower[search_from..].find(&open_prefix)?;
        let end = start + lower[start..].find('>')?;
        let start_tag = &html[start..=end];
        if is_tag_boundary(&lower, start + open_prefix.len())
            && tag_attribute(start_tag, "id").is_some_and(|value| value.trim() == id)
        {
            break end + 1;
        }
        search_from = end + 1;
    };

    let mut depth = 1usize;
    let mut cursor = body_start;
    loop {
        let next_open = lower[cursor..]
            .match_indices(&open_prefix)
            .map(|(i, _)| cursor + i)
            .find(|&i| is_tag_boundary(&lower, i + open_prefix.len()));
        let Some(next_close) = lower[cursor..].find(&close_tag).map(|i| cursor + i) else {
            return Some(&html[body_start..]);
        };

        match next_open {
            Some(open) if open < next_close => {
                depth += 1;
                cursor = open + open_prefix.len();
            }
            _ => {
                depth -= 1;
                if depth == 0 {
                    return Some(&html[body_start..next_close]);
                }
                cursor = next_close + close_tag.len();
            }
        }
    }
}

fn is_tag_boundary(lower: &str, at: usize) -> bool {
    lower[at..]
        .chars()
        .next()
        .is_none_or(|c| c.is_ascii_whitespace() || c == '>' || c == '/')
}
