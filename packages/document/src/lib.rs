//! # Berry Document
//!
//! The canonical block/inline model of an editor document and its HTML
//! parser and serializer.
//!
//! ```text
//! untrusted html ──sanitize──▶ Dom ──parse_html──▶ EditorDocument ──serialize_html──▶ html
//! ```
//!
//! Round trip: for sanitized input `x`,
//! `parse_html(&serialize_html(&parse_html(x))) == parse_html(x)`.

pub mod error;
pub mod model;
pub mod parser;
pub mod serializer;

pub use error::{DocumentError, DocumentResult};
pub use model::*;
pub use parser::{parse_dom, parse_html, parse_sanitized};
pub use serializer::{attachment_html, serialize_html, serialize_inline, HtmlSerializer};

/// One empty paragraph
pub fn create_empty_document() -> EditorDocument {
    EditorDocument::empty()
}

pub fn document_from_html(html: &str) -> EditorDocument {
    parse_html(html)
}

pub fn document_to_html(doc: &EditorDocument) -> String {
    serialize_html(doc)
}
