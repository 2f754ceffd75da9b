//! Rich markdown document engine.
//!
//! The engine keeps a keyed node tree ([`model::Document`]) as the editing
//! model and persists it exclusively as markdown through the
//! [`bridge`]. Everything that changes the tree goes through
//! [`editing::Editor::update`], which commits or discards a working copy as
//! a whole and reconciles the per-node side tables (collapse state, embed
//! enrichment) afterwards.

pub mod bridge;
pub mod editing;
pub mod embed;
pub mod error;
pub mod highlight;
pub mod model;
pub mod outline;
pub mod parsing;
pub mod transform;

pub use bridge::{from_markdown, to_markdown};
pub use editing::{Editor, EditorOptions, Mode};
pub use error::EngineError;
pub use model::{Document, Fragment, NodeKey, NodeKind, NodeType};
