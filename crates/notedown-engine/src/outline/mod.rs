//! Heading collapse.
//!
//! Which headings are collapsed is read straight off the tree: a heading is
//! collapsed exactly when it carries a [`NodeKind::CollapseMarker`] child.
//! Visibility of every top-level block is then derived by one linear scan.

use std::collections::HashSet;

use log::debug;

use crate::error::EngineError;
use crate::model::{Document, Fragment, NodeKey, NodeKind};

/// Block visibility for every top-level block, in document order.
///
/// Headings close every open frame at their level or deeper. A visible,
/// collapsed heading opens a frame of its own. A block is hidden while any
/// frame is open.
pub fn compute_visibility(doc: &Document, collapsed: &HashSet<NodeKey>) -> Vec<bool> {
    let mut frames: Vec<u8> = Vec::new();
    doc.root_children()
        .iter()
        .map(|&key| {
            if let Some(NodeKind::Heading { level }) = doc.kind(key) {
                while frames.last().is_some_and(|top| top >= level) {
                    frames.pop();
                }
                let hidden = !frames.is_empty();
                if !hidden && collapsed.contains(&key) {
                    frames.push(*level);
                }
                hidden
            } else {
                !frames.is_empty()
            }
        })
        .collect()
}

pub fn marker_of(doc: &Document, heading: NodeKey) -> Option<NodeKey> {
    doc.children(heading)
        .iter()
        .copied()
        .find(|c| matches!(doc.kind(*c), Some(NodeKind::CollapseMarker)))
}

/// Headings that carry a collapse marker.
pub fn collapsed_headings(doc: &Document) -> HashSet<NodeKey> {
    doc.root_children()
        .iter()
        .copied()
        .filter(|k| matches!(doc.kind(*k), Some(NodeKind::Heading { .. })) && marker_of(doc, *k).is_some())
        .collect()
}

fn expect_heading(doc: &Document, key: NodeKey) -> Result<u8, EngineError> {
    match doc.kind(key) {
        Some(NodeKind::Heading { level }) if doc.parent(key).is_none() => Ok(*level),
        Some(kind) => Err(EngineError::WrongNodeType {
            expected: "top-level heading",
            found: kind.node_type(),
        }),
        None => Err(EngineError::Detached(key)),
    }
}

/// Appends the marker as the heading's last inline child. No-op when it is
/// already collapsed.
pub fn collapse(doc: &mut Document, heading: NodeKey) -> Result<(), EngineError> {
    expect_heading(doc, heading)?;
    if marker_of(doc, heading).is_none() {
        doc.append_child(heading, Fragment::new(NodeKind::CollapseMarker))?;
        debug!("collapsed {heading}");
    }
    Ok(())
}

pub fn expand(doc: &mut Document, heading: NodeKey) -> Result<(), EngineError> {
    expect_heading(doc, heading)?;
    if let Some(marker) = marker_of(doc, heading) {
        doc.remove(marker)?;
        debug!("expanded {heading}");
    }
    Ok(())
}

/// Flips the heading's state and returns whether it is now collapsed.
pub fn toggle(doc: &mut Document, heading: NodeKey) -> Result<bool, EngineError> {
    expect_heading(doc, heading)?;
    if marker_of(doc, heading).is_some() {
        expand(doc, heading)?;
        Ok(false)
    } else {
        collapse(doc, heading)?;
        Ok(true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub key: NodeKey,
    pub level: u8,
    pub title: String,
    pub collapsed: bool,
    pub hidden: bool,
}

/// Side table of the current collapse state, rebuilt after every commit.
#[derive(Debug, Clone, Default)]
pub struct Outline {
    collapsed: HashSet<NodeKey>,
    hidden: HashSet<NodeKey>,
}

impl Outline {
    pub fn from_document(doc: &Document) -> Self {
        let mut outline = Self::default();
        outline.sync(doc);
        outline
    }

    pub fn sync(&mut self, doc: &Document) {
        self.collapsed = collapsed_headings(doc);
        self.hidden = doc
            .root_children()
            .iter()
            .zip(compute_visibility(doc, &self.collapsed))
            .filter_map(|(k, hidden)| hidden.then_some(*k))
            .collect();
    }

    pub fn is_collapsed(&self, key: NodeKey) -> bool {
        self.collapsed.contains(&key)
    }

    pub fn is_hidden(&self, key: NodeKey) -> bool {
        self.hidden.contains(&key)
    }

    pub fn collapsed(&self) -> &HashSet<NodeKey> {
        &self.collapsed
    }

    /// Every top-level heading with its current state.
    pub fn entries(&self, doc: &Document) -> Vec<OutlineEntry> {
        doc.root_children()
            .iter()
            .filter_map(|&key| match doc.kind(key) {
                Some(NodeKind::Heading { level }) => Some(OutlineEntry {
                    key,
                    level: *level,
                    title: doc.text_content(key),
                    collapsed: self.is_collapsed(key),
                    hidden: self.is_hidden(key),
                }),
                _ => None,
            })
            .collect()
    }
}
