use thiserror::Error;

pub type DocumentResult<T> = Result<T, DocumentError>;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document has no blocks")]
    Empty,
}
