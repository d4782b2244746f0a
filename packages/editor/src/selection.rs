//! # Selection Codec
//!
//! Converts live tree positions to and from character offsets measured
//! over the flattened text of the editing surface.
//!
//! ## Design
//!
//! Offsets count Unicode scalar values in text nodes only, in document
//! order. Elements such as `<br>` or an attachment contribute nothing.
//! Offsets are what cross the engine boundary: they are plain numbers,
//! serializable, and survive the surface being rebuilt from HTML.
//!
//! [`SelectionMemory`] remembers the last observed selection and the last
//! *expanded* one. Hosts that collapse the selection while running a native
//! formatting command lose the range the user picked; the engine recovers
//! it from the memory.

use berry_dom::{char_len, Dom, NodeId};
use serde::{Deserialize, Serialize};

/// Selection as character offsets. `anchor` may be after `focus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionRange {
    pub anchor: usize,
    pub focus: usize,
}

impl SelectionRange {
    pub fn new(anchor: usize, focus: usize) -> Self {
        Self { anchor, focus }
    }

    pub fn caret(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn start(&self) -> usize {
        self.anchor.min(self.focus)
    }

    pub fn end(&self) -> usize {
        self.anchor.max(self.focus)
    }

    pub fn len(&self) -> usize {
        self.end() - self.start()
    }

    pub fn is_empty(&self) -> bool {
        self.is_collapsed()
    }
}

/// A live position. In a text node `offset` counts chars; in an element
/// it is a child index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomPoint {
    pub node: NodeId,
    pub offset: usize,
}

impl DomPoint {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A live selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomRange {
    pub anchor: DomPoint,
    pub focus: DomPoint,
}

impl DomRange {
    pub fn new(anchor: DomPoint, focus: DomPoint) -> Self {
        Self { anchor, focus }
    }

    pub fn caret(point: DomPoint) -> Self {
        Self::new(point, point)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

/// True when text node `text` lies before the boundary `(element, index)`
fn before_boundary(dom: &Dom, text: NodeId, element: NodeId, index: usize) -> bool {
    if dom.contains(element, text) {
        let child = std::iter::once(text)
            .chain(dom.ancestors(text))
            .find(|n| dom.parent(*n) == Some(element));
        child
            .and_then(|c| dom.index_in_parent(c))
            .is_some_and(|i| i < index)
    } else {
        dom.precedes(text, element)
    }
}

/// Offset of a live point, `None` when it is outside `root`
pub fn point_to_offset(dom: &Dom, root: NodeId, point: DomPoint) -> Option<usize> {
    if point.node != root && !dom.contains(root, point.node) {
        return None;
    }

    let mut total = 0;
    for text in dom.text_nodes(root) {
        let len = dom.text(text).map(char_len).unwrap_or(0);

        if dom.is_text(point.node) {
            if text == point.node {
                return Some(total + point.offset.min(len));
            }
        } else if !before_boundary(dom, text, point.node, point.offset) {
            return Some(total);
        }
        total += len;
    }

    // Element boundary after every text node, or a text node not found.
    (!dom.is_text(point.node)).then_some(total)
}

/// Live point for an offset. At a boundary between two text nodes the end
/// of the first is chosen. `None` when the offset is past the end.
pub fn offset_to_point(dom: &Dom, root: NodeId, offset: usize) -> Option<DomPoint> {
    let mut total = 0;
    let mut last = None;

    for text in dom.text_nodes(root) {
        let len = dom.text(text).map(char_len).unwrap_or(0);
        if offset <= total + len {
            return Some(DomPoint::new(text, offset - total));
        }
        total += len;
        last = Some(text);
    }

    match last {
        None if offset == 0 => Some(DomPoint::new(root, 0)),
        _ => None,
    }
}

/// Encode a live range
pub fn capture(dom: &Dom, root: NodeId, range: &DomRange) -> Option<SelectionRange> {
    Some(SelectionRange::new(
        point_to_offset(dom, root, range.anchor)?,
        point_to_offset(dom, root, range.focus)?,
    ))
}

/// Decode offsets into a live range; out of bounds means no selection
pub fn restore(dom: &Dom, root: NodeId, selection: SelectionRange) -> Option<DomRange> {
    Some(DomRange::new(
        offset_to_point(dom, root, selection.anchor)?,
        offset_to_point(dom, root, selection.focus)?,
    ))
}

/// Remembers recent selections across focus changes
#[derive(Debug, Default, Clone)]
pub struct SelectionMemory {
    last: Option<SelectionRange>,
    last_expanded: Option<SelectionRange>,
}

impl SelectionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a selection observed on the surface. A new expanded selection
    /// replaces the cached one.
    pub fn observe(&mut self, selection: Option<SelectionRange>) {
        if let Some(selection) = selection {
            self.last = Some(selection);
            if !selection.is_collapsed() {
                self.last_expanded = Some(selection);
            }
        }
    }

    pub fn last(&self) -> Option<SelectionRange> {
        self.last
    }

    pub fn last_expanded(&self) -> Option<SelectionRange> {
        self.last_expanded
    }

    /// Drop the expanded cache (its offsets no longer describe the content)
    pub fn forget_expanded(&mut self) {
        self.last_expanded = None;
    }

    pub fn clear(&mut self) {
        self.last = None;
        self.last_expanded = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dom(html: &str) -> Dom {
        Dom::parse(html)
    }

    #[test]
    fn test_offsets_round_trip_through_points() {
        let dom = dom("<p>Hello <strong>big</strong> world</p><p>two</p>");
        let root = dom.root();

        for offset in 0..=18 {
            let point = offset_to_point(&dom, root, offset).unwrap();
            assert_eq!(point_to_offset(&dom, root, point), Some(offset));
        }
        assert_eq!(offset_to_point(&dom, root, 19), None);
    }

    #[test]
    fn test_element_points() {
        let dom = dom("<p>ab</p><p>cd</p>");
        let root = dom.root();
        let second = dom.children(root)[1];
        assert_eq!(point_to_offset(&dom, root, DomPoint::new(second, 0)), Some(2));
        assert_eq!(point_to_offset(&dom, root, DomPoint::new(second, 1)), Some(4));
        assert_eq!(point_to_offset(&dom, root, DomPoint::new(root, 1)), Some(2));
        assert_eq!(point_to_offset(&dom, root, DomPoint::new(root, 0)), Some(0));
    }

    #[test]
    fn test_unicode_offsets_count_scalars() {
        let dom = dom("<p>héllo 👋 x</p>");
        let root = dom.root();
        let point = offset_to_point(&dom, root, 8).unwrap();
        assert_eq!(point.offset, 8);
        assert!(offset_to_point(&dom, root, 9).is_some());
        assert_eq!(offset_to_point(&dom, root, 10), None);
    }

    #[test]
    fn test_empty_surface() {
        let dom = dom("");
        let root = dom.root();
        assert_eq!(offset_to_point(&dom, root, 0), Some(DomPoint::new(root, 0)));
        assert_eq!(restore(&dom, root, SelectionRange::new(0, 3)), None);
    }

    #[test]
    fn test_capture_restore() {
        let dom = dom("<p>Hello world</p>");
        let root = dom.root();
        let range = restore(&dom, root, SelectionRange::new(5, 0)).unwrap();
        assert_eq!(capture(&dom, root, &range), Some(SelectionRange::new(5, 0)));
    }

    #[test]
    fn test_memory_keeps_last_expanded() {
        let mut memory = SelectionMemory::new();
        memory.observe(Some(SelectionRange::new(0, 5)));
        memory.observe(Some(SelectionRange::caret(5)));
        memory.observe(None);
        assert_eq!(memory.last(), Some(SelectionRange::caret(5)));
        assert_eq!(memory.last_expanded(), Some(SelectionRange::new(0, 5)));

        memory.observe(Some(SelectionRange::new(2, 3)));
        assert_eq!(memory.last_expanded(), Some(SelectionRange::new(2, 3)));
    }
}
