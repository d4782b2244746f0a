//! # Tree Builder
//!
//! Turns the token stream into a [`Dom`]. This is a forgiving subset of
//! the HTML tree construction rules: enough implied end tags to read
//! browser and word-processor output the way a browser would, without
//! the full insertion-mode machinery.
//!
//! `figure` deliberately does not close an open paragraph so attachment
//! figures stay inline in the block that holds them.

use crate::entities;
use crate::tokenizer::{parse_tag, Token};
use crate::tree::{Dom, NodeData, NodeId};
use crate::writer::is_void;
use logos::Logos;
use tracing::trace;

/// Elements whose content is raw text up to the matching end tag
const RAW_TEXT: &[&str] = &[
    "script", "style", "textarea", "title", "xmp", "iframe", "noembed", "noframes", "noscript",
];

/// Elements that close an open `<p>`
const CLOSES_PARAGRAPH: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "table", "blockquote", "hr", "pre",
];

const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// Parse an HTML fragment into a tree rooted at [`Dom::root`]
pub fn parse_fragment(html: &str) -> Dom {
    let mut dom = Dom::new();
    let mut stack: Vec<NodeId> = vec![dom.root()];
    let mut lexer = Token::lexer(html);

    while let Some(result) = lexer.next() {
        let slice = lexer.slice();
        let current = *stack.last().unwrap_or(&dom.root());

        match result {
            Ok(Token::Text) => append_text(&mut dom, current, &entities::decode(slice)),
            Ok(Token::StrayLt) | Err(_) => append_text(&mut dom, current, slice),
            Ok(Token::Comment) => {
                let body = slice
                    .strip_prefix("<!--")
                    .unwrap_or(slice)
                    .trim_end_matches("-->");
                let comment = dom.create_comment(body);
                let _ = dom.append_child(current, comment);
            }
            Ok(Token::Declaration) | Ok(Token::ProcessingInstruction) => {}
            Ok(Token::StartTag) => {
                let tag = parse_tag(slice);
                if !tag.terminated {
                    trace!(tag = %tag.name, "Dropping unterminated tag");
                    continue;
                }

                close_implied(&dom, &mut stack, &tag.name);
                let parent = *stack.last().unwrap_or(&dom.root());

                let attrs: Vec<(String, String)> = tag
                    .attrs
                    .into_iter()
                    .map(|(name, value)| (name, entities::decode(&value)))
                    .collect();
                let el = dom.create_element(&tag.name);
                if let Some(element) = dom.element_mut(el) {
                    for (name, value) in attrs {
                        element.set_attr(name, value);
                    }
                }
                let _ = dom.append_child(parent, el);

                if RAW_TEXT.contains(&tag.name.as_str()) {
                    let rest = lexer.remainder();
                    let (content, consumed) = raw_text_until_close(rest, &tag.name);
                    if !content.is_empty() {
                        let text = dom.create_text(content);
                        let _ = dom.append_child(el, text);
                    }
                    lexer.bump(consumed);
                } else if !is_void(&tag.name) && !tag.self_closing {
                    stack.push(el);
                }
            }
            Ok(Token::EndTag) => {
                let tag = parse_tag(slice);
                if is_void(&tag.name) {
                    continue;
                }
                if let Some(pos) = stack
                    .iter()
                    .rposition(|n| dom.tag_name(*n) == Some(tag.name.as_str()))
                {
                    if pos > 0 {
                        stack.truncate(pos);
                    }
                }
            }
        }
    }

    dom
}

fn append_text(dom: &mut Dom, parent: NodeId, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(last) = dom.last_child(parent) {
        if let NodeData::Text(existing) = dom.data(last) {
            let merged = format!("{existing}{text}");
            let _ = dom.set_text(last, merged);
            return;
        }
    }
    let node = dom.create_text(text);
    let _ = dom.append_child(parent, node);
}

/// Pop elements that the incoming start tag implicitly closes
fn close_implied(dom: &Dom, stack: &mut Vec<NodeId>, name: &str) {
    if CLOSES_PARAGRAPH.contains(&name) {
        close_open(dom, stack, &["p"], &["td", "th", "table", "caption", "li", "figure"]);
    }
    if HEADINGS.contains(&name) {
        if let Some(top) = stack.last() {
            if dom.is_element(*top, HEADINGS) {
                stack.pop();
            }
        }
    }
    match name {
        "li" => close_open(dom, stack, &["li"], &["ul", "ol", "td", "th", "table"]),
        "td" | "th" => close_open(dom, stack, &["td", "th"], &["tr", "table"]),
        "tr" => close_open(dom, stack, &["tr"], &["tbody", "thead", "tfoot", "table"]),
        "tbody" | "thead" | "tfoot" => {
            close_open(dom, stack, &["tbody", "thead", "tfoot"], &["table"])
        }
        _ => {}
    }
}

/// Truncate the stack to just below the nearest open element in `names`,
/// unless a `boundary` element is found first.
fn close_open(dom: &Dom, stack: &mut Vec<NodeId>, names: &[&str], boundaries: &[&str]) {
    for pos in (1..stack.len()).rev() {
        let node = stack[pos];
        if dom.is_element(node, names) {
            stack.truncate(pos);
            return;
        }
        if dom.is_element(node, boundaries) {
            return;
        }
    }
}

/// Content of a raw text element and the bytes to skip past its end tag
fn raw_text_until_close<'a>(rest: &'a str, name: &str) -> (&'a str, usize) {
    let lower = rest.to_ascii_lowercase();
    let needle = format!("</{name}");
    match lower.find(&needle) {
        Some(start) => {
            let after = &rest[start..];
            let end = after.find('>').map(|i| start + i + 1).unwrap_or(rest.len());
            (&rest[..start], end)
        }
        None => (rest, rest.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_structure() {
        let dom = parse_fragment("<p>Hello <strong>big</strong> world</p>");
        assert_eq!(dom.to_html(), "<p>Hello <strong>big</strong> world</p>");
    }

    #[test]
    fn test_paragraph_closed_by_block() {
        let dom = parse_fragment("<p>one<p>two<ul><li>a<li>b</ul>");
        assert_eq!(
            dom.to_html(),
            "<p>one</p><p>two</p><ul><li>a</li><li>b</li></ul>"
        );
    }

    #[test]
    fn test_figure_stays_inside_paragraph() {
        let dom = parse_fragment("<p>a<figure><img src=\"x\"></figure>b</p>");
        assert_eq!(dom.children(dom.root()).len(), 1);
    }

    #[test]
    fn test_table_cells_close_implicitly() {
        let dom = parse_fragment("<table><tr><td>a<td>b<tr><td>c</table>");
        assert_eq!(
            dom.to_html(),
            "<table><tr><td>a</td><td>b</td></tr><tr><td>c</td></tr></table>"
        );
    }

    #[test]
    fn test_script_content_is_raw() {
        let dom = parse_fragment("<script>if (a<b) { x(\"</p>\") }</script><p>ok</p>");
        let script = dom.first_child(dom.root()).unwrap();
        assert_eq!(dom.tag_name(script), Some("script"));
        assert_eq!(dom.text_content(script), "if (a<b) { x(\"</p>\") }");
        assert_eq!(dom.children(dom.root()).len(), 2);
    }

    #[test]
    fn test_unmatched_end_tag_ignored() {
        let dom = parse_fragment("<p>a</span>b</p>");
        assert_eq!(dom.to_html(), "<p>ab</p>");
    }

    #[test]
    fn test_attribute_entities_decoded() {
        let dom = parse_fragment("<a href=\"?a=1&amp;b=2\">x</a>");
        let a = dom.first_child(dom.root()).unwrap();
        assert_eq!(dom.attr(a, "href"), Some("?a=1&b=2"));
    }
}
