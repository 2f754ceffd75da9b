//! Keyed node tree and its markdown rendering.

mod document;
mod export;
mod key;
mod kind;
pub mod normalize;

pub use document::{Document, Fragment, NodeRef};
pub use export::{ExportOptions, export_markdown_fragment, export_inline_children};
pub use key::NodeKey;
pub use kind::{EntityKind, NodeKind, NodeType, TextFormat};

/// Text a node contributes to the rendered document, if any.
///
/// Embeds render as widgets and contribute nothing; highlight anchoring and
/// the render snapshot both walk exactly these segments.
pub fn rendered_text(kind: &NodeKind) -> Option<&str> {
    match kind {
        NodeKind::Text { text, .. } => Some(text),
        NodeKind::Link { text, .. } => Some(text),
        NodeKind::CodeBlock { code, .. } => Some(code),
        _ => None,
    }
}
