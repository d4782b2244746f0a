//! # Insertions and Deletions
//!
//! Tree edits at a live point: typing text, pasting markup, inserting a
//! rule or a table, deleting the text of a range.

use crate::format::{insert_at_point, segments};
use crate::selection::{DomPoint, SelectionRange};
use berry_dom::{char_len, char_to_byte, Dom, DomError, NodeId};
use berry_sanitizer::style_guards::CELL_BORDER;
use berry_sanitizer::ATTACHMENT_ID_ATTR;

/// Elements that start a new block when pasted
const BLOCK_LEVEL: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "blockquote", "ul", "ol", "li", "table", "hr",
];

/// Inline wrappers removed once they hold nothing
const INLINE_WRAPPERS: &[&str] = &[
    "strong", "b", "em", "i", "u", "s", "code", "a", "span", "mark",
];

/// The child of `root` that contains `node`
pub fn top_level(dom: &Dom, root: NodeId, node: NodeId) -> Option<NodeId> {
    std::iter::once(node)
        .chain(dom.ancestors(node))
        .find(|n| dom.parent(*n) == Some(root))
}

/// Point right after `node` in its parent
pub fn point_after(dom: &Dom, node: NodeId) -> Option<DomPoint> {
    let parent = dom.parent(node)?;
    let index = dom.index_in_parent(node)?;
    Some(DomPoint::new(parent, index + 1))
}

fn is_block_level(dom: &Dom, id: NodeId) -> bool {
    if dom.is_element(id, &["figure"]) {
        return dom.attr(id, ATTACHMENT_ID_ATTR).is_none();
    }
    dom.is_element(id, BLOCK_LEVEL)
}

/// Remove the text covered by `range`. Inline wrappers left empty go too.
pub fn delete_range(dom: &mut Dom, root: NodeId, range: SelectionRange) -> Result<(), DomError> {
    for segment in segments(dom, root, range).into_iter().rev() {
        let text = dom.text(segment.node).unwrap_or_default().to_string();
        let from = char_to_byte(&text, segment.start);
        let to = char_to_byte(&text, segment.end);
        let remaining = format!("{}{}", &text[..from], &text[to..]);

        if !remaining.is_empty() {
            dom.set_text(segment.node, remaining)?;
            continue;
        }

        let mut current = segment.node;
        loop {
            let parent = dom.parent(current);
            dom.detach(current);
            match parent {
                Some(parent)
                    if parent != root
                        && dom.is_element(parent, INLINE_WRAPPERS)
                        && dom.attr(parent, ATTACHMENT_ID_ATTR).is_none()
                        && dom.children(parent).is_empty() =>
                {
                    current = parent;
                }
                _ => break,
            }
        }
    }
    Ok(())
}

/// Insert literal text at a point. Returns the caret after the text.
pub fn insert_text(
    dom: &mut Dom,
    root: NodeId,
    point: DomPoint,
    text: &str,
) -> Result<DomPoint, DomError> {
    if let Some(existing) = dom.text(point.node).map(str::to_string) {
        let byte = char_to_byte(&existing, point.offset);
        let spliced = format!("{}{}{}", &existing[..byte], text, &existing[byte..]);
        dom.set_text(point.node, spliced)?;
        return Ok(DomPoint::new(point.node, point.offset + char_len(text)));
    }

    let node = dom.create_text(text);
    if point.node == root {
        let paragraph = dom.create_element("p");
        dom.append_child(paragraph, node)?;
        dom.insert_at(root, point.offset, paragraph)?;
    } else {
        dom.insert_at(point.node, point.offset, node)?;
    }
    Ok(DomPoint::new(node, char_len(text)))
}

/// Insert a block-level node after the block holding `point`
pub fn insert_block(dom: &mut Dom, root: NodeId, point: DomPoint, block: NodeId) -> Result<(), DomError> {
    if point.node == root {
        return dom.insert_at(root, point.offset, block);
    }
    match top_level(dom, root, point.node) {
        Some(anchor) => dom.insert_after(anchor, block),
        None => dom.append_child(root, block),
    }
}

/// Insert (already sanitized) markup at a point. Block-level content goes
/// after the current block; inline content goes at the point. Returns the
/// caret after the inserted content.
pub fn insert_fragment(
    dom: &mut Dom,
    root: NodeId,
    point: DomPoint,
    html: &str,
) -> Result<Option<DomPoint>, DomError> {
    let nodes = dom.parse_into(html);
    let Some(last) = nodes.last().copied() else {
        return Ok(None);
    };

    if nodes.iter().any(|n| is_block_level(dom, *n)) {
        let mut previous: Option<NodeId> = None;
        for node in &nodes {
            match previous {
                Some(previous) => dom.insert_after(previous, *node)?,
                None => insert_block(dom, root, point, *node)?,
            }
            previous = Some(*node);
        }
        return Ok(point_after(dom, last));
    }

    let mut previous: Option<NodeId> = None;
    for node in &nodes {
        match previous {
            Some(previous) => dom.insert_after(previous, *node)?,
            None if point.node == root => {
                let paragraph = dom.create_element("p");
                dom.insert_at(root, point.offset, paragraph)?;
                dom.append_child(paragraph, *node)?;
            }
            None => insert_at_point(dom, point, *node)?,
        }
        previous = Some(*node);
    }
    Ok(point_after(dom, last))
}

/// Empty paragraph after `node`, for the caret to land in
fn paragraph_after(dom: &mut Dom, node: NodeId) -> Result<DomPoint, DomError> {
    if let Some(next) = dom.next_sibling(node) {
        if dom.is_element(next, &["p"]) {
            return Ok(DomPoint::new(next, 0));
        }
    }
    let paragraph = dom.create_element("p");
    dom.insert_after(node, paragraph)?;
    Ok(DomPoint::new(paragraph, 0))
}

/// Insert `<hr>` after the current block. Returns the caret below it.
pub fn insert_horizontal_rule(dom: &mut Dom, root: NodeId, point: DomPoint) -> Result<DomPoint, DomError> {
    let rule = dom.create_element("hr");
    insert_block(dom, root, point, rule)?;
    paragraph_after(dom, rule)
}

/// Insert an empty bordered table. Returns the caret in its first cell.
pub fn insert_table(
    dom: &mut Dom,
    root: NodeId,
    point: DomPoint,
    rows: u32,
    cols: u32,
) -> Result<DomPoint, DomError> {
    let table = dom.create_element_with_attrs("table", &[("style", "border-collapse: collapse")]);
    let body = dom.create_element("tbody");
    dom.append_child(table, body)?;

    let border = format!("border: {CELL_BORDER}");
    let mut first_cell = None;
    for _ in 0..rows {
        let row = dom.create_element("tr");
        dom.append_child(body, row)?;
        for _ in 0..cols {
            let cell = dom.create_element_with_attrs("td", &[("style", border.as_str())]);
            dom.append_child(row, cell)?;
            first_cell.get_or_insert(cell);
        }
    }

    insert_block(dom, root, point, table)?;
    paragraph_after(dom, table)?;
    Ok(DomPoint::new(first_cell.unwrap_or(table), 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::offset_to_point;

    #[test]
    fn test_delete_range_prunes_empty_wrappers() {
        let mut dom = Dom::parse("<p>ab<strong>cd</strong>ef</p>");
        let root = dom.root();
        delete_range(&mut dom, root, SelectionRange::new(1, 5)).unwrap();
        assert_eq!(dom.to_html(), "<p>af</p>");
    }

    #[test]
    fn test_insert_text_splices() {
        let mut dom = Dom::parse("<p>héllo</p>");
        let root = dom.root();
        let point = offset_to_point(&dom, root, 2).unwrap();
        let caret = insert_text(&mut dom, root, point, "XY").unwrap();
        assert_eq!(dom.to_html(), "<p>héXYllo</p>");
        assert_eq!(caret.offset, 4);
    }

    #[test]
    fn test_insert_text_into_empty_surface() {
        let mut dom = Dom::new();
        let root = dom.root();
        insert_text(&mut dom, root, DomPoint::new(root, 0), "hi").unwrap();
        assert_eq!(dom.to_html(), "<p>hi</p>");
    }

    #[test]
    fn test_insert_inline_fragment() {
        let mut dom = Dom::parse("<p>ab</p>");
        let root = dom.root();
        let point = offset_to_point(&dom, root, 1).unwrap();
        insert_fragment(&mut dom, root, point, "<em>x</em>").unwrap();
        assert_eq!(dom.to_html(), "<p>a<em>x</em>b</p>");
    }

    #[test]
    fn test_insert_block_fragment_after_block() {
        let mut dom = Dom::parse("<p>ab</p><p>cd</p>");
        let root = dom.root();
        let point = offset_to_point(&dom, root, 1).unwrap();
        insert_fragment(&mut dom, root, point, "<h2>T</h2>").unwrap();
        assert_eq!(dom.to_html(), "<p>ab</p><h2>T</h2><p>cd</p>");
    }

    #[test]
    fn test_insert_table() {
        let mut dom = Dom::parse("<p>a</p>");
        let root = dom.root();
        let point = offset_to_point(&dom, root, 1).unwrap();
        let caret = insert_table(&mut dom, root, point, 1, 2).unwrap();
        assert_eq!(
            dom.to_html(),
            "<p>a</p><table style=\"border-collapse: collapse\"><tbody><tr>\
             <td style=\"border: 1px solid #000000\"></td>\
             <td style=\"border: 1px solid #000000\"></td></tr></tbody></table><p></p>"
        );
        assert!(dom.is_element(caret.node, &["td"]));
    }

    #[test]
    fn test_insert_rule_reuses_following_paragraph() {
        let mut dom = Dom::parse("<p>a</p><p>b</p>");
        let root = dom.root();
        let point = offset_to_point(&dom, root, 1).unwrap();
        let caret = insert_horizontal_rule(&mut dom, root, point).unwrap();
        assert_eq!(dom.to_html(), "<p>a</p><hr><p>b</p>");
        assert_eq!(caret.offset, 0);
    }
}
