//! HTML writer for [`Dom`] trees.

use crate::entities::{escape_attribute, escape_text};
use crate::tree::{Dom, NodeData, NodeId};

/// Elements that never have children or a closing tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

pub(crate) fn write_children(dom: &Dom, id: NodeId, out: &mut String) {
    for child in dom.children(id) {
        write_node(dom, *child, out);
    }
}

pub(crate) fn write_node(dom: &Dom, id: NodeId, out: &mut String) {
    match dom.data(id) {
        NodeData::Root => write_children(dom, id, out),
        NodeData::Text(text) => escape_text(text, out),
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(&text.replace("--", "- -"));
            out.push_str("-->");
        }
        NodeData::Element(el) => {
            out.push('<');
            out.push_str(&el.name);
            for attr in &el.attrs {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                escape_attribute(&attr.value, out);
                out.push('"');
            }
            out.push('>');

            if is_void(&el.name) {
                return;
            }

            write_children(dom, id, out);
            out.push_str("</");
            out.push_str(&el.name);
            out.push('>');
        }
    }
}
