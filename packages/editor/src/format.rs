//! # Inline Formatting
//!
//! Engine-synthesized inline markup: the fallback used when the native
//! formatting path is missing or ineffective, plus highlight and link
//! handling.
//!
//! ## Design
//!
//! A selection is turned into the text-node [`Segment`]s it intersects.
//! Wrapping walks the segments tail-to-head: splitting a text node only
//! creates siblings *after* the split point, so segments earlier in the
//! list keep their node ids and offsets. Wrapping never changes the
//! flattened text, so offset selections stay valid across the operation.

use crate::selection::{point_to_offset, DomPoint, SelectionRange};
use berry_dom::{char_len, Dom, DomError, NodeId};
use berry_sanitizer::styles::{set_style_property, style_property};
use berry_sanitizer::ATTACHMENT_ID_ATTR;

/// Zero-width space used as a caret spacer and a position marker
pub const ZERO_WIDTH: &str = "\u{200B}";

/// The part `[start, end)` (chars) of a text node covered by a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub node: NodeId,
    pub start: usize,
    pub end: usize,
}

/// Text segments intersecting `range`, in document order
pub fn segments(dom: &Dom, root: NodeId, range: SelectionRange) -> Vec<Segment> {
    let (start, end) = (range.start(), range.end());
    let mut out = Vec::new();
    let mut total = 0;

    for node in dom.text_nodes(root) {
        let len = dom.text(node).map(char_len).unwrap_or(0);
        let (node_start, node_end) = (total, total + len);
        total = node_end;

        if len == 0 || node_end <= start || node_start >= end {
            continue;
        }
        out.push(Segment {
            node,
            start: start.max(node_start) - node_start,
            end: end.min(node_end) - node_start,
        });
        if node_end >= end {
            break;
        }
    }
    out
}

/// Isolate a segment in its own text node and return that node
fn isolate(dom: &mut Dom, segment: Segment) -> Result<NodeId, DomError> {
    let len = dom.text(segment.node).map(char_len).unwrap_or(0);
    if segment.end < len {
        dom.split_text(segment.node, segment.end)?;
    }
    if segment.start > 0 {
        if let Some(middle) = dom.split_text(segment.node, segment.start)? {
            return Ok(middle);
        }
    }
    Ok(segment.node)
}

/// Wrap every text segment in `range` with a fresh element from `make`.
/// Returns the wrappers in document order. A collapsed range wraps nothing.
pub fn wrap_range<F>(
    dom: &mut Dom,
    root: NodeId,
    range: SelectionRange,
    mut make: F,
) -> Result<Vec<NodeId>, DomError>
where
    F: FnMut(&mut Dom) -> NodeId,
{
    if range.is_collapsed() {
        return Ok(Vec::new());
    }

    let mut wrappers = Vec::new();
    for segment in segments(dom, root, range).into_iter().rev() {
        let node = isolate(dom, segment)?;
        let wrapper = make(dom);
        dom.wrap(node, wrapper)?;
        wrappers.push(wrapper);
    }
    wrappers.reverse();
    Ok(wrappers)
}

/// Element factory for a tag with an optional style
pub fn element_factory(tag: &'static str, style: Option<String>) -> impl FnMut(&mut Dom) -> NodeId {
    move |dom: &mut Dom| match &style {
        Some(style) => dom.create_element_with_attrs(tag, &[("style", style.as_str())]),
        None => dom.create_element(tag),
    }
}

/// Caret position just outside `wrapper`, so typing does not inherit its
/// formatting. A spacer is created when no text follows.
pub fn caret_after(dom: &mut Dom, wrapper: NodeId) -> Result<DomPoint, DomError> {
    if let Some(next) = dom.next_sibling(wrapper) {
        if dom.text(next).is_some_and(|t| !t.is_empty()) {
            return Ok(DomPoint::new(next, 0));
        }
    }
    let spacer = dom.create_text(ZERO_WIDTH);
    dom.insert_after(wrapper, spacer)?;
    Ok(DomPoint::new(spacer, 1))
}

/// Insert `node` at a live point, splitting a text node when needed
pub fn insert_at_point(dom: &mut Dom, point: DomPoint, node: NodeId) -> Result<(), DomError> {
    if dom.is_text(point.node) {
        let len = dom.text(point.node).map(char_len).unwrap_or(0);
        if point.offset == 0 {
            return dom.insert_before(point.node, node);
        }
        if point.offset < len {
            dom.split_text(point.node, point.offset)?;
        }
        return dom.insert_after(point.node, node);
    }
    dom.insert_at(point.node, point.offset, node)
}

fn is_highlight(dom: &Dom, id: NodeId) -> bool {
    dom.is_element(id, &["mark"])
        || dom
            .attr(id, "style")
            .and_then(|style| style_property(style, "background-color"))
            .is_some()
}

/// Nearest highlighted element around `node`, below `root`
pub fn highlight_ancestor(dom: &Dom, root: NodeId, node: NodeId) -> Option<NodeId> {
    std::iter::once(node)
        .chain(dom.ancestors(node))
        .take_while(|a| *a != root)
        .find(|a| is_highlight(dom, *a))
}

/// Remove the highlight from one element, unwrapping it when nothing else
/// is left on it
fn strip_highlight(dom: &mut Dom, id: NodeId) -> Result<(), DomError> {
    if dom.is_element(id, &["mark"]) {
        dom.unwrap(id)?;
        return Ok(());
    }

    let style = dom.attr(id, "style").unwrap_or_default().to_string();
    match set_style_property(&style, "background-color", None) {
        Some(rest) => dom.set_attr(id, "style", rest),
        None => {
            dom.remove_attr(id, "style");
        }
    }

    let bare = dom
        .element(id)
        .is_some_and(|el| el.name == "span" && el.attrs.is_empty());
    if bare {
        dom.unwrap(id)?;
    }
    Ok(())
}

/// Clear the highlight around a caret. A zero-width marker holds the caret
/// position while the tree changes; the returned offset is where it was.
/// `None` when the caret is not inside a highlight.
pub fn clear_highlight_at(
    dom: &mut Dom,
    root: NodeId,
    point: DomPoint,
) -> Result<Option<usize>, DomError> {
    let marker = dom.create_text(ZERO_WIDTH);
    insert_at_point(dom, point, marker)?;

    let view: &Dom = dom;
    let highlight = view
        .ancestors(marker)
        .take_while(|a| *a != root)
        .find(|a| is_highlight(view, *a));

    if let Some(highlight) = highlight {
        strip_highlight(dom, highlight)?;
    }

    let offset = point_to_offset(dom, root, DomPoint::new(marker, 0));
    let parent = dom.parent(marker);
    dom.detach(marker);
    if let Some(parent) = parent {
        dom.normalize(parent);
    }

    Ok(highlight.and(offset))
}

/// Clear every highlight covering text in an expanded range
pub fn clear_highlight_in_range(
    dom: &mut Dom,
    root: NodeId,
    range: SelectionRange,
) -> Result<bool, DomError> {
    let mut targets: Vec<NodeId> = Vec::new();
    for segment in segments(dom, root, range) {
        for ancestor in dom.ancestors(segment.node).take_while(|a| *a != root) {
            if is_highlight(dom, ancestor) && !targets.contains(&ancestor) {
                targets.push(ancestor);
            }
        }
    }

    for target in &targets {
        strip_highlight(dom, *target)?;
    }
    Ok(!targets.is_empty())
}

fn is_link(dom: &Dom, id: NodeId) -> bool {
    dom.is_element(id, &["a"]) && dom.attr(id, ATTACHMENT_ID_ATTR).is_none()
}

/// Links covering the range (or the caret)
fn links_in(dom: &Dom, root: NodeId, range: SelectionRange, caret: Option<DomPoint>) -> Vec<NodeId> {
    let mut nodes: Vec<NodeId> = segments(dom, root, range).iter().map(|s| s.node).collect();
    nodes.extend(caret.map(|p| p.node));

    let mut links = Vec::new();
    for node in nodes {
        let link = std::iter::once(node)
            .chain(dom.ancestors(node))
            .take_while(|a| *a != root)
            .find(|a| is_link(dom, *a));
        if let Some(link) = link {
            if !links.contains(&link) {
                links.push(link);
            }
        }
    }
    links
}

/// Remove links in the range, keeping their content
pub fn unlink(
    dom: &mut Dom,
    root: NodeId,
    range: SelectionRange,
    caret: Option<DomPoint>,
) -> Result<bool, DomError> {
    let links = links_in(dom, root, range, caret);
    for link in &links {
        dom.unwrap(*link)?;
    }
    Ok(!links.is_empty())
}

fn link_attrs(url: &str, open_in_new_tab: bool) -> Vec<(&'static str, String)> {
    let mut attrs = vec![("href", url.to_string())];
    if open_in_new_tab {
        attrs.push(("target", "_blank".to_string()));
        attrs.push(("rel", "noopener noreferrer".to_string()));
    }
    attrs
}

fn create_link(dom: &mut Dom, url: &str, open_in_new_tab: bool) -> NodeId {
    let attrs = link_attrs(url, open_in_new_tab);
    let borrowed: Vec<(&str, &str)> = attrs.iter().map(|(k, v)| (*k, v.as_str())).collect();
    dom.create_element_with_attrs("a", &borrowed)
}

/// Link the selected text, replacing links already there
pub fn link_range(
    dom: &mut Dom,
    root: NodeId,
    range: SelectionRange,
    url: &str,
    open_in_new_tab: bool,
) -> Result<Vec<NodeId>, DomError> {
    unlink(dom, root, range, None)?;
    wrap_range(dom, root, range, |dom| create_link(dom, url, open_in_new_tab))
}

/// Insert a new link with literal text at a point. Returns the anchor.
pub fn insert_link(
    dom: &mut Dom,
    point: DomPoint,
    url: &str,
    text: &str,
    open_in_new_tab: bool,
) -> Result<NodeId, DomError> {
    let anchor = create_link(dom, url, open_in_new_tab);
    let label = dom.create_text(text);
    dom.append_child(anchor, label)?;
    insert_at_point(dom, point, anchor)?;
    Ok(anchor)
}
