//! # Berry DOM
//!
//! The mutable tree behind the Berry editing surface.
//!
//! ```text
//! markup ──tokenizer──▶ tokens ──builder──▶ Dom ──writer──▶ markup
//! ```
//!
//! The engine only relies on a handful of tree capabilities: read text
//! content, address a range of nodes, and insert/replace/remove nodes.
//! Everything else (sanitizing, the document model) is layered on top.

pub mod builder;
pub mod entities;
pub mod error;
pub mod tokenizer;
pub mod tree;
mod writer;

pub use builder::parse_fragment;
pub use error::DomError;
pub use tokenizer::{tokenize, Token};
pub use tree::{char_len, char_to_byte, Attribute, Dom, Element, NodeData, NodeId};
pub use writer::{is_void, VOID_ELEMENTS};
