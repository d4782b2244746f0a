//! Error types for tree mutation

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Node {0} is not a text node")]
    NotText(usize),

    #[error("Node {0} cannot have children")]
    NotContainer(usize),

    #[error("Node {0} is not attached to a parent")]
    Detached(usize),

    #[error("Inserting node {0} would create a cycle")]
    Cycle(usize),

    #[error("The fragment root cannot be moved")]
    RootMove,
}
