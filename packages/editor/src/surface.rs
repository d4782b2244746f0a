//! # Editing Surface
//!
//! The live, user-editable tree the engine is granted exclusive write
//! access to. A host binds one surface to an [`Editor`](crate::Editor) and
//! reports focus and selection changes through the editor.

use crate::selection::{capture, restore, DomPoint, DomRange, SelectionRange};
use berry_dom::{Dom, NodeId};

#[derive(Debug, Clone, Default)]
pub struct Surface {
    dom: Dom,
    focused: bool,
    selection: Option<DomRange>,
}

impl Surface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Surface showing `html` as-is (not sanitized)
    pub fn from_html(html: &str) -> Self {
        Self {
            dom: Dom::parse(html),
            ..Self::default()
        }
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut Dom {
        &mut self.dom
    }

    pub fn root(&self) -> NodeId {
        self.dom.root()
    }

    pub fn html(&self) -> String {
        self.dom.to_html()
    }

    /// Replace the content. The live selection is dropped.
    pub fn set_html(&mut self, html: &str) {
        self.dom = Dom::parse(html);
        self.selection = None;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub(crate) fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn live_range(&self) -> Option<DomRange> {
        self.selection.filter(|range| {
            self.dom.is_connected(range.anchor.node) && self.dom.is_connected(range.focus.node)
        })
    }

    pub fn set_live_range(&mut self, range: Option<DomRange>) {
        self.selection = range;
    }

    /// Caret at a live point
    pub fn set_caret(&mut self, point: DomPoint) {
        self.selection = Some(DomRange::caret(point));
    }

    /// Current selection as offsets
    pub fn selection(&self) -> Option<SelectionRange> {
        let range = self.live_range()?;
        capture(&self.dom, self.root(), &range)
    }

    /// Select by offsets. Out-of-bounds offsets clear the selection.
    pub fn select(&mut self, selection: Option<SelectionRange>) -> bool {
        self.selection = selection.and_then(|s| restore(&self.dom, self.root(), s));
        self.selection.is_some() || selection.is_none()
    }
}
