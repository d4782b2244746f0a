//! # Arena DOM
//!
//! A mutable node tree addressed by [`NodeId`] handles. This is the
//! editing surface the engine is granted exclusive write access to.
//!
//! ## Design
//!
//! - Nodes live in one `Vec`; detaching a node never frees its slot, so a
//!   stale `NodeId` stays valid to read but is no longer connected
//! - Node `0` is the fragment root and is never detached
//! - Text offsets are counted in Unicode scalar values

use crate::error::DomError;
use crate::writer;

/// Handle to a node in a [`Dom`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single attribute, kept in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Element payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lower-cased tag name
    pub name: String,
    pub attrs: Vec<Attribute>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|a| a.name == name)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attrs.push(Attribute { name, value }),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|a| a.name == name)?;
        Some(self.attrs.remove(pos).value)
    }
}

/// Node payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// Fragment root (the editing surface itself)
    Root,
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// Mutable HTML fragment tree
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Node>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    /// Create an empty fragment
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Root,
            }],
        }
    }

    /// Parse an HTML fragment
    pub fn parse(html: &str) -> Self {
        crate::builder::parse_fragment(html)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    // ---------------------------------------------------------------
    // Reading
    // ---------------------------------------------------------------

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.node(id).data
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.node(id).data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.node_mut(id).data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.name.as_str())
    }

    /// True if `id` is an element with one of the given tag names
    pub fn is_element(&self, id: NodeId, names: &[&str]) -> bool {
        self.tag_name(id).is_some_and(|name| names.contains(&name))
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(el) = self.element_mut(id) {
            el.set_attr(name, value);
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id).and_then(|el| el.remove_attr(name))
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Text(_))
    }

    /// Replace the content of a text node
    pub fn set_text(&mut self, id: NodeId, value: impl Into<String>) -> Result<(), DomError> {
        match &mut self.node_mut(id).data {
            NodeData::Text(text) => {
                *text = value.into();
                Ok(())
            }
            _ => Err(DomError::NotText(id.0)),
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.last().copied()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    /// Ancestors from the parent upwards
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            dom: self,
            next: self.parent(id),
        }
    }

    /// True if `node` is `ancestor` or lies beneath it
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// True if the node is attached under the root
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(self.root(), id)
    }

    /// Closest inclusive ancestor that is one of the given elements
    pub fn closest(&self, id: NodeId, names: &[&str]) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|n| self.is_element(*n, names))
    }

    /// Descendants in document order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Text nodes beneath `id` in document order
    pub fn text_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|n| self.is_text(*n))
            .collect()
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.text_nodes(id)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    /// Document-order comparison of two connected nodes
    pub fn precedes(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return false;
        }
        let order = self.descendants(self.root());
        let pos_a = order.iter().position(|n| *n == a);
        let pos_b = order.iter().position(|n| *n == b);
        matches!((pos_a, pos_b), (Some(x), Some(y)) if x < y)
    }

    // ---------------------------------------------------------------
    // Creating
    // ---------------------------------------------------------------

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Element(Element::new(name)))
    }

    pub fn create_element_with_attrs(&mut self, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let mut element = Element::new(name);
        for (key, value) in attrs {
            element.set_attr(*key, *value);
        }
        self.push(NodeData::Element(element))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Comment(text.into()))
    }

    // ---------------------------------------------------------------
    // Mutating
    // ---------------------------------------------------------------

    /// Detach a node from its parent. The root cannot be detached.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            self.node_mut(parent).children.retain(|c| *c != id);
            self.node_mut(id).parent = None;
        }
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if child == self.root() {
            return Err(DomError::RootMove);
        }
        if self.contains(child, parent) {
            return Err(DomError::Cycle(child.0));
        }
        if matches!(self.node(parent).data, NodeData::Text(_) | NodeData::Comment(_)) {
            return Err(DomError::NotContainer(parent.0));
        }
        Ok(())
    }

    /// Insert `child` at `index` within `parent` (clamped to the child count)
    pub fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        self.detach(child);
        let children = &mut self.node_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let len = self.children(parent).len();
        self.insert_at(parent, len, child)
    }

    /// Insert `new` immediately before `reference`
    pub fn insert_before(&mut self, reference: NodeId, new: NodeId) -> Result<(), DomError> {
        let parent = self.parent(reference).ok_or(DomError::Detached(reference.0))?;
        self.detach(new);
        let index = self.index_in_parent(reference).unwrap_or(0);
        self.insert_at(parent, index, new)
    }

    /// Insert `new` immediately after `reference`
    pub fn insert_after(&mut self, reference: NodeId, new: NodeId) -> Result<(), DomError> {
        let parent = self.parent(reference).ok_or(DomError::Detached(reference.0))?;
        self.detach(new);
        let index = self.index_in_parent(reference).unwrap_or(0);
        self.insert_at(parent, index + 1, new)
    }

    /// Put `new` where `old` was and detach `old`
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), DomError> {
        self.insert_before(old, new)?;
        self.detach(old);
        Ok(())
    }

    /// Move the children of `id` into its parent, then detach `id`
    pub fn unwrap(&mut self, id: NodeId) -> Result<Vec<NodeId>, DomError> {
        let parent = self.parent(id).ok_or(DomError::Detached(id.0))?;
        let index = self.index_in_parent(id).unwrap_or(0);
        let children = std::mem::take(&mut self.node_mut(id).children);
        for (offset, child) in children.iter().enumerate() {
            self.node_mut(*child).parent = Some(parent);
            self.node_mut(parent).children.insert(index + 1 + offset, *child);
        }
        self.detach(id);
        Ok(children)
    }

    /// Put `wrapper` at the position of `id` and move `id` inside it
    pub fn wrap(&mut self, id: NodeId, wrapper: NodeId) -> Result<(), DomError> {
        self.insert_before(id, wrapper)?;
        self.append_child(wrapper, id)
    }

    /// Detach every child of `id`
    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.node_mut(id).children);
        for child in children {
            self.node_mut(child).parent = None;
        }
    }

    /// Split a text node at a char offset. The tail becomes a new sibling
    /// which is returned; `None` when the offset is at either edge.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<Option<NodeId>, DomError> {
        let text = self.text(id).ok_or(DomError::NotText(id.0))?.to_string();
        let len = text.chars().count();
        if offset == 0 || offset >= len {
            return Ok(None);
        }
        let byte = char_to_byte(&text, offset);
        let tail = text[byte..].to_string();
        self.set_text(id, &text[..byte])?;
        let new = self.create_text(tail);
        if self.parent(id).is_some() {
            self.insert_after(id, new)?;
        }
        Ok(Some(new))
    }

    /// Merge adjacent text siblings and drop empty text nodes under `id`
    pub fn normalize(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        let mut previous_text: Option<NodeId> = None;
        for child in children {
            if let Some(text) = self.text(child).map(str::to_string) {
                if text.is_empty() {
                    self.detach(child);
                    continue;
                }
                if let Some(prev) = previous_text {
                    let merged = format!("{}{}", self.text(prev).unwrap_or_default(), text);
                    let _ = self.set_text(prev, merged);
                    self.detach(child);
                    continue;
                }
                previous_text = Some(child);
            } else {
                previous_text = None;
                self.normalize(child);
            }
        }
    }

    /// Deep-copy a subtree (possibly from another tree) into this arena.
    /// The copy is detached.
    pub fn import(&mut self, source: &Dom, id: NodeId) -> NodeId {
        let data = match source.data(id) {
            NodeData::Root => NodeData::Element(Element::new("div")),
            other => other.clone(),
        };
        let copy = self.push(data);
        for child in source.children(id).to_vec() {
            let child_copy = self.import(source, child);
            self.node_mut(child_copy).parent = Some(copy);
            self.node_mut(copy).children.push(child_copy);
        }
        copy
    }

    /// Parse `html` and return its top-level nodes, detached, in this arena
    pub fn parse_into(&mut self, html: &str) -> Vec<NodeId> {
        let fragment = Dom::parse(html);
        fragment
            .children(fragment.root())
            .to_vec()
            .into_iter()
            .map(|child| self.import(&fragment, child))
            .collect()
    }

    /// Replace the children of `id` with the parsed fragment
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) -> Result<(), DomError> {
        let nodes = self.parse_into(html);
        self.clear_children(id);
        for node in nodes {
            self.append_child(id, node)?;
        }
        Ok(())
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        writer::write_children(self, id, &mut out);
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        writer::write_node(self, id, &mut out);
        out
    }

    /// Serialize the whole fragment
    pub fn to_html(&self) -> String {
        self.inner_html(self.root())
    }
}

/// Iterator over ancestors, see [`Dom::ancestors`]
pub struct Ancestors<'a> {
    dom: &'a Dom,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.dom.parent(current);
        Some(current)
    }
}

/// Byte index of the `offset`-th char (clamped to the string length)
pub fn char_to_byte(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Length of a string in chars
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
