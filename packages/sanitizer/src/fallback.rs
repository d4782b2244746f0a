//! # Regex Fallback
//!
//! Reduces markup with regular expressions for hosts that cannot build a
//! tree. It enforces the same allow-list as the tree sanitizer but does not
//! pair tags, so it cannot unwrap bare `span`/`a` wrappers. The output is
//! still safe: every surviving tag is rebuilt from filtered attributes and
//! every stray `<`/`>` in text is escaped.

use crate::policy::{filter_attributes, is_allowed_tag, DROP_WITH_CONTENT};
use crate::sanitizer::SanitizeReport;
use berry_dom::entities::{decode, escape_attribute, escape_text};
use berry_dom::is_void;
use berry_dom::tokenizer::parse_tag;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?(?:-->|\z)").unwrap());

static DECLARATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[!?][^>]*>?").unwrap());

static TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<(/?)([A-Za-z][A-Za-z0-9:_-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#).unwrap()
});

/// One pattern per dangerous element; an unclosed element swallows the rest.
static DROPPED: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    DROP_WITH_CONTENT
        .iter()
        .map(|tag| {
            let pattern = format!(r"(?is)<{tag}\b[^>]*>.*?(?:</{tag}\s*>|\z)");
            (*tag, Regex::new(&pattern).unwrap())
        })
        .collect()
});

pub fn sanitize_fallback(html: &str) -> String {
    sanitize_fallback_with_report(html).0
}

pub fn sanitize_fallback_with_report(html: &str) -> (String, SanitizeReport) {
    let mut report = SanitizeReport::default();

    report.removed_comments = COMMENT.find_iter(html).count();
    let mut source = COMMENT.replace_all(html, "").into_owned();

    for (tag, pattern) in DROPPED.iter() {
        let hits = pattern.find_iter(&source).count();
        if hits > 0 {
            report
                .removed_tags
                .extend(std::iter::repeat(tag.to_string()).take(hits));
            source = pattern.replace_all(&source, "").into_owned();
        }
    }
    source = DECLARATION.replace_all(&source, "").into_owned();

    let mut out = String::with_capacity(source.len());
    let mut last = 0;

    for captures in TAG.captures_iter(&source) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        write_text(&source[last..whole.start()], &mut out);
        last = whole.end();

        let closing = captures.get(1).is_some_and(|m| !m.as_str().is_empty());
        let name = captures
            .get(2)
            .map(|m| m.as_str().to_ascii_lowercase())
            .unwrap_or_default();

        if !is_allowed_tag(&name) {
            if !closing {
                report.removed_tags.push(name);
            }
            continue;
        }

        if closing {
            if !is_void(&name) {
                out.push_str("</");
                out.push_str(&name);
                out.push('>');
            }
            continue;
        }

        write_start_tag(&name, whole.as_str(), &mut out, &mut report);
    }
    write_text(&source[last..], &mut out);

    if !report.is_clean() {
        debug!(
            tags = report.removed_tags.len(),
            attributes = report.removed_attributes.len(),
            "Fallback sanitizer removed content"
        );
    }

    (out, report)
}

fn write_text(text: &str, out: &mut String) {
    if !text.is_empty() {
        escape_text(&decode(text), out);
    }
}

fn write_start_tag(name: &str, raw: &str, out: &mut String, report: &mut SanitizeReport) {
    let tag = parse_tag(raw);
    let attrs: Vec<(String, String)> = tag
        .attrs
        .into_iter()
        .map(|(attr, value)| (attr, decode(&value)))
        .collect();
    let filtered = filter_attributes(name, &attrs);
    report.removed_attributes.extend(filtered.dropped_attributes);
    report.removed_styles.extend(filtered.dropped_styles);

    if name == "img"
        && !filtered
            .kept
            .iter()
            .any(|(attr, _)| attr == "src" || attr == crate::policy::ATTACHMENT_ID_ATTR)
    {
        report.removed_tags.push(name.to_string());
        return;
    }

    out.push('<');
    out.push_str(name);
    for (attr, value) in &filtered.kept {
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        escape_attribute(value, out);
        out.push('"');
    }
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_removed_with_content() {
        let out = sanitize_fallback("<p>a</p><SCRIPT type=\"x\">alert('<p>')</script ><p>b</p>");
        assert_eq!(out, "<p>a</p><p>b</p>");
    }

    #[test]
    fn test_unclosed_script_swallows_rest() {
        assert_eq!(sanitize_fallback("<p>a</p><script>alert(1)"), "<p>a</p>");
    }

    #[test]
    fn test_handlers_and_bad_links_dropped() {
        let (out, report) = sanitize_fallback_with_report(
            "<a href=\"javascript:x\" onclick=\"y\">l</a><img src=\"a.png\" onerror='z'>",
        );
        assert_eq!(out, "<a>l</a><img src=\"a.png\">");
        assert_eq!(report.removed_attributes, vec!["href", "onclick", "onerror"]);
    }

    #[test]
    fn test_stray_angle_brackets_escaped() {
        assert_eq!(sanitize_fallback("1 < 2 <b>&amp;</b> 3 >"), "1 &lt; 2 <b>&amp;</b> 3 &gt;");
        assert_eq!(sanitize_fallback("<img src=x onerror=alert(1)"), "&lt;img src=x onerror=alert(1)");
    }

    #[test]
    fn test_unknown_tags_and_comments_removed() {
        let (out, report) = sanitize_fallback_with_report("<section><p>a<!--c-->b</p></section>");
        assert_eq!(out, "<p>ab</p>");
        assert_eq!(report.removed_comments, 1);
        assert_eq!(report.removed_tags, vec!["section".to_string()]);
    }

    #[test]
    fn test_styles_reduced() {
        assert_eq!(
            sanitize_fallback("<span style=\"COLOR: rgb(0,0,255); position: fixed\">x</span>"),
            "<span style=\"color: #0000ff\">x</span>"
        );
    }
}
