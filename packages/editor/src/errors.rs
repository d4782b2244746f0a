//! Error types for the editor
//!
//! These never cross the engine's public edge: [`Editor`](crate::Editor)
//! turns every failure into a `false` (or `None`) outcome and logs it.

use berry_dom::DomError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("Tree error: {0}")]
    Dom(#[from] DomError),

    #[error("No surface is bound")]
    Unbound,

    #[error("A command is already executing")]
    Busy,

    #[error("No selection inside the surface")]
    NoSelection,

    #[error("Selection is collapsed")]
    CollapsedSelection,

    #[error("Attachment not found: {0}")]
    AttachmentNotFound(String),

    #[error("Attachment {0} is not an image")]
    NotAnImage(String),

    #[error("Selection is not inside a table")]
    NotInTable,

    #[error("Invalid command: {0}")]
    Command(#[from] CommandError),
}

/// Payload validation failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Invalid payload for {command}: {reason}")]
    InvalidPayload {
        command: &'static str,
        reason: String,
    },
}

impl CommandError {
    pub(crate) fn invalid(command: &'static str, reason: impl Into<String>) -> Self {
        CommandError::InvalidPayload {
            command,
            reason: reason.into(),
        }
    }
}

/// Upload outcomes reported by an [`UploadAdapter`](crate::UploadAdapter)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadError {
    #[error("Upload failed: {0}")]
    Failed(String),

    #[error("Upload rejected: {0}")]
    Rejected(String),

    #[error("Upload cancelled")]
    Cancelled,
}

pub type EditorResult<T> = Result<T, EditorError>;
