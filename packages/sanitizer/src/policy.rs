//! # Allow-list Policy
//!
//! Which elements survive, which are dropped along with their content, and
//! which attributes each surviving element may keep. Shared by the tree
//! sanitizer and the regex fallback so both enforce the same rules.

use crate::styles::reduce_style;
use crate::uri::{sanitize_uri, UriContext};

/// Attribute carrying the attachment identity
pub const ATTACHMENT_ID_ATTR: &str = "data-berry-attachment-id";

/// Elements that are kept
pub const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "div", "h1", "h2", "h3", "blockquote", "ul", "ol", "li", "strong", "b", "em", "i",
    "u", "s", "code", "a", "span", "mark", "hr", "table", "thead", "tbody", "tr", "td", "th",
    "figure", "figcaption", "img",
];

/// Elements removed together with everything inside them
pub const DROP_WITH_CONTENT: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "template", "noscript", "textarea", "select",
    "button", "form", "svg", "math", "head", "title", "meta", "link", "base", "frame", "frameset",
    "xmp", "noembed", "noframes", "applet", "audio", "video", "canvas",
];

/// Attachment data attributes and where they may appear
const ATTACHMENT_TAGS: &[&str] = &["a", "img", "figure"];

pub fn is_allowed_tag(name: &str) -> bool {
    ALLOWED_TAGS.contains(&name)
}

pub fn is_dropped_with_content(name: &str) -> bool {
    DROP_WITH_CONTENT.contains(&name)
}

fn is_token(value: &str, max: usize) -> bool {
    !value.is_empty()
        && value.len() <= max
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' || c == ':')
}

fn is_digits(value: &str, max_len: usize) -> bool {
    !value.is_empty() && value.len() <= max_len && value.chars().all(|c| c.is_ascii_digit())
}

fn is_content_type(value: &str) -> bool {
    match value.split_once('/') {
        Some((kind, sub)) => {
            let ok = |s: &str| {
                !s.is_empty()
                    && s.chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-'))
            };
            value.len() <= 128 && ok(kind) && ok(sub)
        }
        None => false,
    }
}

fn clean_attachment_attribute(name: &str, value: &str) -> Option<String> {
    let value = value.trim();
    let ok = match name {
        ATTACHMENT_ID_ATTR => is_token(value, 128),
        "data-berry-filename" => !value.is_empty() && value.chars().count() <= 255,
        "data-berry-filesize" => is_digits(value, 15),
        "data-berry-content-type" => is_content_type(value),
        "data-berry-preview-url" => {
            return sanitize_uri(value, UriContext::Image);
        }
        "data-berry-align" => matches!(value, "left" | "center" | "right"),
        "data-berry-wrap" | "data-berry-pending" | "data-berry-failed" => value == "true",
        "data-berry-wrap-side" => matches!(value, "left" | "right"),
        "data-berry-progress" => value.parse::<u8>().is_ok_and(|p| p <= 100),
        _ => false,
    };
    ok.then(|| value.to_string())
}

/// Validate one attribute of an allowed element. `None` drops it.
pub fn clean_attribute(tag: &str, name: &str, value: &str) -> Option<String> {
    if name.starts_with("on") {
        return None;
    }

    if name.starts_with("data-berry-") {
        return if ATTACHMENT_TAGS.contains(&tag) {
            clean_attachment_attribute(name, value)
        } else {
            None
        };
    }

    match (tag, name) {
        // `style` is reduced by the caller, which needs the dropped list.
        (_, "style") => None,
        ("a", "href") => sanitize_uri(value, UriContext::Link),
        ("a", "target") => (value.trim() == "_blank").then(|| "_blank".to_string()),
        ("a", "title") | ("img", "alt") | ("img", "title") => Some(value.to_string()),
        ("img", "src") => sanitize_uri(value, UriContext::Image),
        ("img", "height") | ("img", "width") => {
            let trimmed = value.trim();
            is_digits(trimmed, 4).then(|| trimmed.to_string())
        }
        ("td", "colspan") | ("th", "colspan") | ("td", "rowspan") | ("th", "rowspan") => {
            let trimmed = value.trim();
            trimmed
                .parse::<u16>()
                .ok()
                .filter(|n| (1..=100).contains(n))
                .map(|n| n.to_string())
        }
        _ => None,
    }
}

/// Outcome of filtering one element's attribute list
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilteredAttributes {
    pub kept: Vec<(String, String)>,
    pub dropped_attributes: Vec<String>,
    pub dropped_styles: Vec<String>,
}

/// Filter an element's attributes and apply per-element fix-ups
/// (`rel` is forced on `target="_blank"` links and dropped elsewhere).
pub fn filter_attributes(tag: &str, attrs: &[(String, String)]) -> FilteredAttributes {
    let mut out = FilteredAttributes::default();

    for (name, value) in attrs {
        if name == "style" {
            let reduced = reduce_style(tag, value);
            out.dropped_styles.extend(reduced.dropped);
            if let Some(style) = reduced.style {
                out.kept.push((name.clone(), style));
            }
            continue;
        }
        if tag == "a" && name == "rel" {
            // Re-derived below from `target`.
            out.kept.push((name.clone(), value.clone()));
            continue;
        }
        match clean_attribute(tag, name, value) {
            Some(clean) => out.kept.push((name.clone(), clean)),
            None => out.dropped_attributes.push(name.clone()),
        }
    }

    if tag == "a" {
        let blank = out.kept.iter().any(|(n, v)| n == "target" && v == "_blank");
        if blank {
            match out.kept.iter_mut().find(|(n, _)| n == "rel") {
                Some(rel) => rel.1 = "noopener noreferrer".to_string(),
                None => out
                    .kept
                    .push(("rel".to_string(), "noopener noreferrer".to_string())),
            }
        } else if out.kept.iter().any(|(n, _)| n == "rel") {
            out.kept.retain(|(n, _)| n != "rel");
            out.dropped_attributes.push("rel".to_string());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_event_handlers_dropped() {
        let filtered = filter_attributes("img", &attrs(&[("src", "a.png"), ("onerror", "x()")]));
        assert_eq!(filtered.kept, attrs(&[("src", "a.png")]));
        assert_eq!(filtered.dropped_attributes, vec!["onerror".to_string()]);
    }

    #[test]
    fn test_blank_links_get_rel() {
        let filtered = filter_attributes(
            "a",
            &attrs(&[("href", "https://x.test"), ("target", "_blank"), ("rel", "opener")]),
        );
        assert_eq!(
            filtered.kept,
            attrs(&[
                ("href", "https://x.test"),
                ("target", "_blank"),
                ("rel", "noopener noreferrer")
            ])
        );
    }

    #[test]
    fn test_attachment_attributes_validated() {
        assert_eq!(
            clean_attribute("figure", ATTACHMENT_ID_ATTR, "att-1").as_deref(),
            Some("att-1")
        );
        assert_eq!(clean_attribute("figure", ATTACHMENT_ID_ATTR, "a b"), None);
        assert_eq!(clean_attribute("p", ATTACHMENT_ID_ATTR, "att-1"), None);
        assert_eq!(clean_attribute("img", "data-berry-progress", "101"), None);
        assert_eq!(clean_attribute("img", "data-berry-unknown", "1"), None);
    }

    #[test]
    fn test_cell_spans() {
        assert_eq!(clean_attribute("td", "colspan", "2").as_deref(), Some("2"));
        assert_eq!(clean_attribute("td", "colspan", "0"), None);
        assert_eq!(clean_attribute("p", "colspan", "2"), None);
    }
}
