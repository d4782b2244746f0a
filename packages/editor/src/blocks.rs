//! # Block Formatting
//!
//! Block style, list toggling, alignment and line height. These work on the
//! blocks a selection touches rather than on text segments.
//!
//! ## Design
//!
//! A *block* is the closest block element around a selected node. Loose
//! inline content directly under the surface root is first gathered into a
//! new `<p>`, and table cells get an inner `<p>` when a command needs to
//! retag the block, so every command has an element it may rename.

use crate::edits::top_level;
use crate::format::segments;
use crate::selection::{capture, DomRange};
use berry_document::{ListType, TextKind};
use berry_dom::{Dom, DomError, NodeId};
use berry_sanitizer::style_guards::format_number;
use berry_sanitizer::styles::{set_style_property, style_property};

/// Elements treated as blocks
pub const BLOCK_TAGS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "blockquote", "li", "td", "th",
];

const RETAGGABLE: &[&str] = &["p", "div", "h1", "h2", "h3", "blockquote"];

/// Gather the run of inline siblings around `node` (a child of `root`) into
/// a new paragraph
fn wrap_loose_run(dom: &mut Dom, root: NodeId, node: NodeId) -> Result<NodeId, DomError> {
    let children = dom.children(root).to_vec();
    let index = dom.index_in_parent(node).unwrap_or(0);
    let is_loose = |dom: &Dom, id: NodeId| {
        !dom.is_element(id, BLOCK_TAGS) && !dom.is_element(id, &["ul", "ol", "table", "hr"])
    };

    let mut start = index;
    while start > 0 && is_loose(dom, children[start - 1]) {
        start -= 1;
    }
    let mut end = index;
    while end + 1 < children.len() && is_loose(dom, children[end + 1]) {
        end += 1;
    }

    let paragraph = dom.create_element("p");
    dom.insert_before(children[start], paragraph)?;
    for child in &children[start..=end] {
        dom.append_child(paragraph, *child)?;
    }
    Ok(paragraph)
}

fn block_of(dom: &mut Dom, root: NodeId, node: NodeId) -> Result<Option<NodeId>, DomError> {
    if node == root {
        return Ok(None);
    }
    if let Some(block) = dom.closest(node, BLOCK_TAGS) {
        if dom.contains(root, block) {
            return Ok(Some(block));
        }
    }
    match top_level(dom, root, node) {
        Some(top) if !dom.is_element(top, &["ul", "ol", "table", "hr"]) => {
            wrap_loose_run(dom, root, top).map(Some)
        }
        _ => Ok(None),
    }
}

/// Blocks touched by a live range, in document order
pub fn selected_blocks(dom: &mut Dom, root: NodeId, range: &DomRange) -> Result<Vec<NodeId>, DomError> {
    let mut nodes = vec![range.anchor.node];
    if let Some(offsets) = capture(dom, root, range) {
        nodes.extend(segments(dom, root, offsets).iter().map(|s| s.node));
    }
    nodes.push(range.focus.node);

    // A caret directly in the root sits between blocks; use the one after it.
    for point in [range.anchor, range.focus] {
        if point.node == root {
            match dom.children(root).get(point.offset).copied() {
                Some(child) => nodes.push(child),
                None => {
                    let paragraph = dom.create_element("p");
                    dom.append_child(root, paragraph)?;
                    nodes.push(paragraph);
                }
            }
        }
    }

    let mut blocks = Vec::new();
    for node in nodes {
        if let Some(block) = block_of(dom, root, node)? {
            if !blocks.contains(&block) {
                blocks.push(block);
            }
        }
    }
    blocks.sort_by(|a, b| {
        if dom.precedes(*a, *b) {
            std::cmp::Ordering::Less
        } else if dom.precedes(*b, *a) {
            std::cmp::Ordering::Greater
        } else {
            std::cmp::Ordering::Equal
        }
    });
    Ok(blocks)
}

/// Give a table cell an inner paragraph to retag
fn cell_container(dom: &mut Dom, cell: NodeId) -> Result<NodeId, DomError> {
    let paragraph = dom.create_element("p");
    for child in dom.children(cell).to_vec() {
        dom.append_child(paragraph, child)?;
    }
    dom.append_child(cell, paragraph)?;
    Ok(paragraph)
}

fn rename(dom: &mut Dom, id: NodeId, tag: &str) {
    if let Some(el) = dom.element_mut(id) {
        el.name = tag.to_string();
    }
}

/// Move list item `li` out of its list as a `tag` block, splitting the list
/// around it
fn lift_list_item(dom: &mut Dom, li: NodeId, tag: &str) -> Result<NodeId, DomError> {
    let Some(list) = dom.parent(li) else {
        return Err(DomError::Detached(li.index()));
    };
    let list_tag = dom.tag_name(list).unwrap_or("ul").to_string();
    let index = dom.index_in_parent(li).unwrap_or(0);
    let after: Vec<NodeId> = dom.children(list)[index + 1..].to_vec();

    dom.insert_after(list, li)?;
    rename(dom, li, tag);

    if !after.is_empty() {
        let tail = dom.create_element(&list_tag);
        dom.insert_after(li, tail)?;
        for item in after {
            dom.append_child(tail, item)?;
        }
    }
    if dom.children(list).is_empty() {
        dom.detach(list);
    }
    Ok(li)
}

/// Change the kind of every block. Returns whether anything changed.
pub fn set_block_style(dom: &mut Dom, blocks: &[NodeId], kind: TextKind) -> Result<bool, DomError> {
    let tag = kind.tag();
    let mut changed = false;

    for block in blocks {
        let mut block = *block;
        if dom.is_element(block, &["td", "th"]) {
            block = cell_container(dom, block)?;
        }

        if dom.is_element(block, &["li"]) {
            lift_list_item(dom, block, tag)?;
            changed = true;
            continue;
        }
        if !dom.is_element(block, RETAGGABLE) {
            continue;
        }

        let parent = dom.parent(block);
        let in_quote = parent.is_some_and(|p| dom.is_element(p, &["blockquote"]));
        if kind == TextKind::Quote && in_quote {
            continue;
        }
        if dom.tag_name(block) != Some(tag) {
            rename(dom, block, tag);
            changed = true;
        }
        if kind != TextKind::Quote && in_quote {
            if let Some(quote) = parent {
                dom.unwrap(quote)?;
                changed = true;
            }
        }
    }
    Ok(changed)
}

fn list_type_of(dom: &Dom, li: NodeId) -> Option<ListType> {
    match dom.parent(li).and_then(|p| dom.tag_name(p)) {
        Some("ul") => Some(ListType::Bullet),
        Some("ol") => Some(ListType::Numbered),
        _ => None,
    }
}

/// Toggle a list over the blocks. When every block already is an item of a
/// `list_type` list the items become paragraphs again.
pub fn toggle_list(dom: &mut Dom, blocks: &[NodeId], list_type: ListType) -> Result<bool, DomError> {
    if blocks.is_empty() {
        return Ok(false);
    }

    let all_listed = blocks
        .iter()
        .all(|b| dom.is_element(*b, &["li"]) && list_type_of(dom, *b) == Some(list_type));
    if all_listed {
        for block in blocks.iter().rev() {
            lift_list_item(dom, *block, "p")?;
        }
        return Ok(true);
    }

    let mut current_list: Option<NodeId> = None;
    for block in blocks {
        let mut block = *block;

        if dom.is_element(block, &["li"]) {
            if let Some(list) = dom.parent(block) {
                rename(dom, list, list_type.tag());
            }
            current_list = None;
            continue;
        }
        if dom.is_element(block, &["td", "th"]) {
            block = cell_container(dom, block)?;
        }

        let item = dom.create_element("li");
        for child in dom.children(block).to_vec() {
            dom.append_child(item, child)?;
        }
        if let Some(style) = dom.attr(block, "style").map(str::to_string) {
            dom.set_attr(item, "style", style);
        }

        let list = match current_list {
            Some(list) if dom.next_sibling(list) == Some(block) => list,
            _ => {
                let list = dom.create_element(list_type.tag());
                dom.insert_before(block, list)?;
                list
            }
        };
        dom.append_child(list, item)?;
        dom.detach(block);
        current_list = Some(list);
    }
    Ok(true)
}

/// Set (or remove) one style property on every block
pub fn set_block_property(
    dom: &mut Dom,
    blocks: &[NodeId],
    property: &str,
    value: Option<&str>,
) -> Result<bool, DomError> {
    let mut changed = false;
    for block in blocks {
        let style = dom.attr(*block, "style").unwrap_or_default().to_string();
        if style_property(&style, property).as_deref() == value {
            continue;
        }
        match set_style_property(&style, property, value) {
            Some(next) => dom.set_attr(*block, "style", next),
            None => {
                dom.remove_attr(*block, "style");
            }
        }
        changed = true;
    }
    Ok(changed)
}

/// `line-height` value as written in a style attribute
pub fn line_height_value(value: f64) -> String {
    format_number(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::{restore, SelectionRange};

    fn blocks_for(dom: &mut Dom, anchor: usize, focus: usize) -> Vec<NodeId> {
        let root = dom.root();
        let range = restore(dom, root, SelectionRange::new(anchor, focus)).unwrap();
        selected_blocks(dom, root, &range).unwrap()
    }

    #[test]
    fn test_selected_blocks_in_order() {
        let mut dom = Dom::parse("<p>ab</p><h1>cd</h1><p>ef</p>");
        let blocks = blocks_for(&mut dom, 5, 1);
        assert_eq!(blocks.len(), 3);
        assert!(dom.is_element(blocks[0], &["p"]));
        assert!(dom.is_element(blocks[1], &["h1"]));
    }

    #[test]
    fn test_loose_text_is_wrapped() {
        let mut dom = Dom::parse("loose <b>text</b><p>x</p>");
        let blocks = blocks_for(&mut dom, 1, 1);
        assert_eq!(blocks.len(), 1);
        assert_eq!(dom.to_html(), "<p>loose <b>text</b></p><p>x</p>");
    }

    #[test]
    fn test_heading_style() {
        let mut dom = Dom::parse("<p>Title</p><p>body</p>");
        let blocks = blocks_for(&mut dom, 1, 1);
        assert!(set_block_style(&mut dom, &blocks, TextKind::Heading1).unwrap());
        assert_eq!(dom.to_html(), "<h1>Title</h1><p>body</p>");
    }

    #[test]
    fn test_paragraph_from_list_item_splits_list() {
        let mut dom = Dom::parse("<ul><li>a</li><li>b</li><li>c</li></ul>");
        let blocks = blocks_for(&mut dom, 2, 2);
        set_block_style(&mut dom, &blocks, TextKind::Paragraph).unwrap();
        assert_eq!(dom.to_html(), "<ul><li>a</li></ul><p>b</p><ul><li>c</li></ul>");
    }

    #[test]
    fn test_list_toggle_round_trip() {
        let mut dom = Dom::parse("<p>a</p><p>b</p>");
        let blocks = blocks_for(&mut dom, 0, 2);
        toggle_list(&mut dom, &blocks, ListType::Bullet).unwrap();
        assert_eq!(dom.to_html(), "<ul><li>a</li><li>b</li></ul>");

        let blocks = blocks_for(&mut dom, 0, 2);
        toggle_list(&mut dom, &blocks, ListType::Bullet).unwrap();
        assert_eq!(dom.to_html(), "<p>a</p><p>b</p>");
    }

    #[test]
    fn test_list_type_switch() {
        let mut dom = Dom::parse("<ul><li>a</li></ul>");
        let blocks = blocks_for(&mut dom, 1, 1);
        toggle_list(&mut dom, &blocks, ListType::Numbered).unwrap();
        assert_eq!(dom.to_html(), "<ol><li>a</li></ol>");
    }

    #[test]
    fn test_alignment_property() {
        let mut dom = Dom::parse("<p style=\"line-height: 2\">a</p>");
        let blocks = blocks_for(&mut dom, 0, 0);
        assert!(set_block_property(&mut dom, &blocks, "text-align", Some("center")).unwrap());
        assert_eq!(dom.to_html(), "<p style=\"line-height: 2; text-align: center\">a</p>");
        assert!(!set_block_property(&mut dom, &blocks, "text-align", Some("center")).unwrap());
    }
}
