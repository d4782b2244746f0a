//! # Tree Sanitizer
//!
//! Parses markup into a [`Dom`], walks it against the allow-list policy and
//! writes it back out. Writing from the tree is what guarantees the output
//! is well formed and escaped, whatever the input looked like.

use crate::fallback::sanitize_fallback_with_report;
use crate::policy::{
    filter_attributes, is_allowed_tag, is_dropped_with_content, ATTACHMENT_ID_ATTR,
};
use berry_dom::{Dom, NodeData, NodeId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which implementation reduces the markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SanitizeMode {
    /// Parse into a tree and walk it
    #[default]
    Tree,
    /// Regex reducer for hosts without a tree; same guarantees, lower fidelity
    Fallback,
}

/// What a sanitize pass removed
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizeReport {
    pub removed_tags: Vec<String>,
    pub removed_attributes: Vec<String>,
    pub removed_styles: Vec<String>,
    pub removed_comments: usize,
}

impl SanitizeReport {
    /// True when nothing had to be removed
    pub fn is_clean(&self) -> bool {
        self.removed_tags.is_empty()
            && self.removed_attributes.is_empty()
            && self.removed_styles.is_empty()
            && self.removed_comments == 0
    }
}

/// Configured sanitizer. Stateless apart from its mode, so one instance
/// can be shared and called repeatedly.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sanitizer {
    mode: SanitizeMode,
}

impl Sanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: SanitizeMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> SanitizeMode {
        self.mode
    }

    pub fn sanitize(&self, html: &str) -> String {
        self.sanitize_with_report(html).0
    }

    pub fn sanitize_with_report(&self, html: &str) -> (String, SanitizeReport) {
        match self.mode {
            SanitizeMode::Tree => {
                let mut dom = Dom::parse(html);
                let report = sanitize_dom(&mut dom);
                (dom.to_html(), report)
            }
            SanitizeMode::Fallback => sanitize_fallback_with_report(html),
        }
    }
}

/// Sanitize a parsed tree in place
pub fn sanitize_dom(dom: &mut Dom) -> SanitizeReport {
    let mut report = SanitizeReport::default();
    let root = dom.root();
    clean_children(dom, root, &mut report);

    if !report.is_clean() {
        debug!(
            tags = report.removed_tags.len(),
            attributes = report.removed_attributes.len(),
            styles = report.removed_styles.len(),
            "Sanitizer removed content"
        );
    }
    report
}

fn clean_children(dom: &mut Dom, parent: NodeId, report: &mut SanitizeReport) {
    for child in dom.children(parent).to_vec() {
        clean_node(dom, child, report);
    }
}

fn clean_node(dom: &mut Dom, id: NodeId, report: &mut SanitizeReport) {
    let name = match dom.data(id) {
        NodeData::Text(_) | NodeData::Root => return,
        NodeData::Comment(_) => {
            report.removed_comments += 1;
            dom.detach(id);
            return;
        }
        NodeData::Element(el) => el.name.clone(),
    };

    if is_dropped_with_content(&name) {
        report.removed_tags.push(name);
        dom.detach(id);
        return;
    }

    clean_children(dom, id, report);

    if !is_allowed_tag(&name) {
        report.removed_tags.push(name);
        let _ = dom.unwrap(id);
        return;
    }

    let attrs: Vec<(String, String)> = dom
        .element(id)
        .map(|el| {
            el.attrs
                .iter()
                .map(|a| (a.name.clone(), a.value.clone()))
                .collect()
        })
        .unwrap_or_default();
    let filtered = filter_attributes(&name, &attrs);
    report.removed_attributes.extend(filtered.dropped_attributes);
    report.removed_styles.extend(filtered.dropped_styles);

    if let Some(el) = dom.element_mut(id) {
        el.attrs.clear();
        for (attr, value) in filtered.kept {
            el.set_attr(attr, value);
        }
    }

    let Some(el) = dom.element(id) else {
        return;
    };
    let is_attachment = el.has_attr(ATTACHMENT_ID_ATTR);
    let bare = el.attrs.is_empty();
    let has_href = el.has_attr("href");
    let has_src = el.has_attr("src");

    match name.as_str() {
        // Bare wrappers carry nothing once their attributes are gone.
        "span" if bare => {
            let _ = dom.unwrap(id);
        }
        "a" if !has_href && !is_attachment => {
            let _ = dom.unwrap(id);
        }
        "img" if !has_src && !is_attachment => {
            report.removed_tags.push(name);
            dom.detach(id);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitize(html: &str) -> String {
        Sanitizer::new().sanitize(html)
    }

    #[test]
    fn test_script_and_handlers_removed() {
        let out = sanitize("<p>ok</p><script>alert(1)</script><img onerror=\"x\">");
        assert!(out.contains("<p>ok</p>"));
        assert!(!out.contains("<script"));
        assert!(!out.contains("onerror="));
    }

    #[test]
    fn test_unknown_tags_unwrapped() {
        assert_eq!(
            sanitize("<section><p>a <font color=\"red\">b</font></p></section>"),
            "<p>a b</p>"
        );
    }

    #[test]
    fn test_bare_span_unwrapped_styled_span_kept() {
        assert_eq!(
            sanitize("<p><span class=\"x\">a</span><span style=\"color: red; color: #f00\">b</span></p>"),
            "<p>a<span style=\"color: #ff0000\">b</span></p>"
        );
    }

    #[test]
    fn test_javascript_links_lose_href_and_anchor() {
        assert_eq!(sanitize("<a href=\"javascript:alert(1)\">x</a>"), "x");
        assert_eq!(
            sanitize("<a href=\"https://a.test\" target=\"_blank\">x</a>"),
            "<a href=\"https://a.test\" target=\"_blank\" rel=\"noopener noreferrer\">x</a>"
        );
    }

    #[test]
    fn test_comments_removed_and_reported() {
        let (out, report) = Sanitizer::new().sanitize_with_report("<p>a<!-- secret -->b</p>");
        assert_eq!(out, "<p>ab</p>");
        assert_eq!(report.removed_comments, 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_table_styles() {
        let out = sanitize(
            "<table style=\"border-collapse: collapse; color: red\"><tbody><tr>\
             <td style=\"border: 1px solid black; width: 40px\" colspan=\"2\">a</td></tr></tbody></table>",
        );
        assert_eq!(
            out,
            "<table style=\"border-collapse: collapse\"><tbody><tr>\
             <td style=\"border: 1px solid #000000\" colspan=\"2\">a</td></tr></tbody></table>"
        );
    }

    #[test]
    fn test_attachment_figure_survives() {
        let html = "<figure data-berry-attachment-id=\"a1\" data-berry-align=\"center\" style=\"padding: 8px\">\
                    <img src=\"https://cdn.test/a.png\" alt=\"A\" style=\"width: 50%\"></figure>";
        assert_eq!(sanitize(html), html);
    }

    #[test]
    fn test_pending_attachment_without_src_kept() {
        let html = "<img data-berry-attachment-id=\"a1\" data-berry-pending=\"true\">";
        assert_eq!(sanitize(html), html);
        assert_eq!(sanitize("<img alt=\"x\">"), "");
    }
}
