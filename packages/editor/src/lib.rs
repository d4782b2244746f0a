//! # Berry Editor
//!
//! Command engine for the Berry rich-text editing surface.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ dom: arena tree, html reader/writer         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ sanitizer: allow-list policy, style guards  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ document: html ⇄ structured model           │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: commands on a live surface          │
//! │  - Native formatting with markup fallback   │
//! │  - Sanitize-and-commit with history         │
//! │  - Selection memory across focus changes    │
//! │  - Attachments and async uploads            │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Sanitized html is the source of truth**: the model is derived from it
//! 2. **Every commit is sanitized**: nothing unsafe reaches history or the host
//! 3. **Invalid input is a no-op**: commands never panic and never half-apply
//! 4. **History records real changes only**: duplicates are suppressed
//!
//! ## Usage
//!
//! ```rust
//! use berry_editor::{Editor, EditorCommand, EditorConfig, SelectionRange};
//!
//! let mut editor = Editor::new(EditorConfig::default());
//! editor.load_html("<p>Hello world</p>");
//! editor.set_selection(Some(SelectionRange::new(6, 11)));
//! editor.exec(&EditorCommand::Italic);
//! assert_eq!(editor.get_html(), "<p>Hello <em>world</em></p>");
//!
//! editor.undo();
//! assert_eq!(editor.get_html(), "<p>Hello world</p>");
//! ```

mod blocks;
mod commands;
mod config;
mod edits;
mod emoji;
mod engine;
mod errors;
mod events;
mod format;
mod history;
mod ids;
mod images;
mod native;
mod query;
mod selection;
mod surface;
mod tables;

#[cfg(feature = "uploads")]
mod uploads;

pub use commands::{CommandTable, EditorCommand, LinkPayload, Scalar, TableSize};
pub use config::EditorConfig;
pub use emoji::{twemoji_code, EmojiRegistry, EmojiSet};
pub use engine::{AttachmentFile, AttachmentResult, Editor, EngineState, ResizePhase, Snapshot};
pub use errors::{CommandError, EditorError, EditorResult, UploadError};
pub use events::{EditorEvents, NoEvents};
pub use history::History;
pub use ids::AttachmentIdGenerator;
pub use images::{ImageAttachmentPatch, ImageAttachmentState};
pub use native::{LegacyExecCommand, NativeCommand, NativeFormatter, NoNativeFormatting};
pub use query::FormatState;
pub use selection::{DomPoint, DomRange, SelectionMemory, SelectionRange};
pub use surface::Surface;

#[cfg(feature = "uploads")]
pub use uploads::{BoxFuture, ProgressSender, UploadAdapter, UploadEvent, UploadManager};

// Re-export common types for convenience
pub use berry_document::{EditorDocument, ImageAlign, WrapSide};
pub use berry_sanitizer::style_guards::WidthUnit;
pub use berry_sanitizer::{SanitizeMode, SanitizeReport};
