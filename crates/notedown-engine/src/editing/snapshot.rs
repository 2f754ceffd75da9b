use serde::Serialize;

use super::{Editor, Mode};
use crate::embed::EmbedDisplay;
use crate::model::{NodeKey, NodeKind, NodeType, rendered_text};

/// Read-only view of the committed document for a rendering surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Editor version the snapshot was taken at.
    pub version: u64,
    pub mode: Mode,
    pub blocks: Vec<RenderBlock>,
}

/// One top-level block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderBlock {
    pub key: NodeKey,
    pub node_type: NodeType,
    pub label: &'static str,
    /// Heading level, zero for other blocks.
    pub depth: u8,
    /// Inside a collapsed section.
    pub hidden: bool,
    pub collapsed: bool,
    /// Concatenated rendered text.
    pub text: String,
    pub segments: Vec<TextSegment>,
}

/// A node that contributes text, in document order. Embeds appear with
/// their display label but no `text`, so they never take part in text
/// search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSegment {
    pub key: NodeKey,
    /// The inline holder (paragraph, list item, cell...) the node sits in.
    pub holder: NodeKey,
    pub text: String,
    pub embed_label: Option<String>,
}

impl Editor {
    pub fn snapshot(&self) -> Snapshot {
        let doc = &self.doc;
        let blocks = doc
            .root_children()
            .iter()
            .filter_map(|&key| {
                let kind = doc.kind(key)?;
                let mut segments = Vec::new();
                for k in std::iter::once(key).chain(doc.descendants(key)) {
                    let Some(node) = doc.kind(k) else {
                        continue;
                    };
                    let holder = doc.inline_holder(k).unwrap_or(key);
                    if let Some(text) = rendered_text(node) {
                        segments.push(TextSegment {
                            key: k,
                            holder,
                            text: text.to_string(),
                            embed_label: None,
                        });
                    } else if let Some(label) = self.embed_label(k, node) {
                        segments.push(TextSegment {
                            key: k,
                            holder,
                            text: String::new(),
                            embed_label: Some(label),
                        });
                    }
                }
                Some(RenderBlock {
                    key,
                    node_type: kind.node_type(),
                    label: kind.node_type().label(),
                    depth: match kind {
                        NodeKind::Heading { level } => *level,
                        _ => 0,
                    },
                    hidden: self.is_hidden(key),
                    collapsed: self.is_collapsed(key),
                    text: segments.iter().map(|s| s.text.as_str()).collect(),
                    segments,
                })
            })
            .collect();
        Snapshot {
            version: self.version,
            mode: self.mode,
            blocks,
        }
    }

    fn embed_label(&self, key: NodeKey, node: &NodeKind) -> Option<String> {
        match node {
            NodeKind::Entity { .. } => self
                .embeds
                .display(&self.doc, key, &self.embed_options)
                .map(|d: EmbedDisplay| d.label().to_string()),
            NodeKind::Image { alt, .. } => Some(alt.clone()),
            NodeKind::Audio { url } => Some(url.clone()),
            NodeKind::YouTube { video_id } => Some(video_id.clone()),
            _ => None,
        }
    }
}
