use thiserror::Error;

use crate::model::{NodeKey, NodeType};

/// Operations the engine refuses rather than performs.
///
/// None of these are fatal to a session: a refused update leaves the
/// committed document untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("node {0} is not attached to the document")]
    Detached(NodeKey),

    #[error("expected {expected}, found {found:?}")]
    WrongNodeType {
        expected: &'static str,
        found: NodeType,
    },

    #[error("{child:?} cannot be placed inside {parent}")]
    InvalidChild { parent: String, child: NodeType },

    #[error("index {index} is out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("invalid entity identifier: {0}")]
    InvalidIdentifier(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("no active selection")]
    NoSelection,

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,
}
