use std::collections::HashMap;

use serde::Serialize;

use super::{NodeKey, NodeKind, NodeType};
use crate::error::EngineError;

/// Key-less owned node tree.
///
/// Fragments are how nodes enter a document: inserting one allocates a
/// fresh key for every node in it. Transformers build fragments, editing
/// operations insert them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub kind: NodeKind,
    pub children: Vec<Fragment>,
}

impl Fragment {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_children(kind: NodeKind, children: Vec<Fragment>) -> Self {
        Self { kind, children }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(NodeKind::plain(text))
    }

    pub fn paragraph(children: Vec<Fragment>) -> Self {
        Self::with_children(NodeKind::Paragraph, children)
    }

    pub fn heading(level: u8, children: Vec<Fragment>) -> Self {
        Self::with_children(NodeKind::Heading { level }, children)
    }

    /// Checks that every child is allowed under its parent.
    pub fn validate(&self) -> Result<(), EngineError> {
        for child in &self.children {
            if !self.kind.accepts_child(&child.kind) {
                return Err(EngineError::InvalidChild {
                    parent: self.kind.node_type().label().to_string(),
                    child: child.kind.node_type(),
                });
            }
            child.validate()?;
        }
        Ok(())
    }

    /// Concatenated text of the text runs and link labels below this node.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(t) = super::rendered_text(&self.kind) {
            out.push_str(t);
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    kind: NodeKind,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
}

/// Borrowed view of one attached node.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    pub key: NodeKey,
    pub kind: &'a NodeKind,
    pub parent: Option<NodeKey>,
    pub children: &'a [NodeKey],
}

/// Ordered sequence of top-level blocks stored in a keyed arena.
///
/// `Clone` preserves keys; that clone is the working copy an update runs
/// against. [`Document::clone_subtree`] is the fresh-key copy.
#[derive(Debug, Clone, Default)]
pub struct Document {
    slots: HashMap<NodeKey, Slot>,
    root: Vec<NodeKey>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fragments(blocks: Vec<Fragment>) -> Result<Self, EngineError> {
        let mut doc = Self::new();
        for block in blocks {
            doc.append_block(block)?;
        }
        Ok(doc)
    }

    pub fn root_children(&self) -> &[NodeKey] {
        &self.root
    }

    pub fn get(&self, key: NodeKey) -> Option<NodeRef<'_>> {
        self.slots.get(&key).map(|slot| NodeRef {
            key,
            kind: &slot.kind,
            parent: slot.parent,
            children: &slot.children,
        })
    }

    pub fn kind(&self, key: NodeKey) -> Option<&NodeKind> {
        self.slots.get(&key).map(|s| &s.kind)
    }

    pub fn node_type(&self, key: NodeKey) -> Option<NodeType> {
        self.kind(key).map(NodeKind::node_type)
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.slots.get(&key).and_then(|s| s.parent)
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.slots
            .get(&key)
            .map(|s| s.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn index_in_parent(&self, key: NodeKey) -> Option<usize> {
        let slot = self.slots.get(&key)?;
        let siblings = match slot.parent {
            Some(p) => self.children(p),
            None => &self.root,
        };
        siblings.iter().position(|k| *k == key)
    }

    pub fn is_attached(&self, key: NodeKey) -> bool {
        self.slots.contains_key(&key)
    }

    /// Number of nodes in the tree, at any depth.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when there are no top-level blocks.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.slots.keys().copied()
    }

    pub fn append_block(&mut self, fragment: Fragment) -> Result<NodeKey, EngineError> {
        self.insert_block(self.root.len(), fragment)
    }

    pub fn insert_block(&mut self, index: usize, fragment: Fragment) -> Result<NodeKey, EngineError> {
        if index > self.root.len() {
            return Err(EngineError::IndexOutOfBounds {
                index,
                len: self.root.len(),
            });
        }
        check_root_child(&fragment)?;
        fragment.validate()?;
        let key = self.materialize(fragment, None);
        self.root.insert(index, key);
        Ok(key)
    }

    pub fn append_child(&mut self, parent: NodeKey, fragment: Fragment) -> Result<NodeKey, EngineError> {
        let len = self.children(parent).len();
        self.insert_child(parent, len, fragment)
    }

    pub fn insert_child(
        &mut self,
        parent: NodeKey,
        index: usize,
        fragment: Fragment,
    ) -> Result<NodeKey, EngineError> {
        let slot = self.slots.get(&parent).ok_or(EngineError::Detached(parent))?;
        if !slot.kind.accepts_child(&fragment.kind) {
            return Err(EngineError::InvalidChild {
                parent: slot.kind.node_type().label().to_string(),
                child: fragment.kind.node_type(),
            });
        }
        if index > slot.children.len() {
            return Err(EngineError::IndexOutOfBounds {
                index,
                len: slot.children.len(),
            });
        }
        fragment.validate()?;
        let key = self.materialize(fragment, Some(parent));
        if let Some(slot) = self.slots.get_mut(&parent) {
            slot.children.insert(index, key);
        }
        Ok(key)
    }

    /// Swaps a node (and its subtree) for a newly built one at the same
    /// position. The old keys are destroyed.
    pub fn replace(&mut self, key: NodeKey, fragment: Fragment) -> Result<NodeKey, EngineError> {
        let parent = self.parent(key);
        let index = self.index_in_parent(key).ok_or(EngineError::Detached(key))?;
        match parent {
            Some(p) => {
                let pk = &self.slots[&p].kind;
                if !pk.accepts_child(&fragment.kind) {
                    return Err(EngineError::InvalidChild {
                        parent: pk.node_type().label().to_string(),
                        child: fragment.kind.node_type(),
                    });
                }
            }
            None => check_root_child(&fragment)?,
        }
        fragment.validate()?;
        self.remove(key)?;
        match parent {
            Some(p) => self.insert_child(p, index, fragment),
            None => self.insert_block(index, fragment),
        }
    }

    /// Detaches a node and destroys its subtree, returning it as a fragment.
    pub fn remove(&mut self, key: NodeKey) -> Result<Fragment, EngineError> {
        let index = self.index_in_parent(key).ok_or(EngineError::Detached(key))?;
        match self.parent(key) {
            Some(p) => {
                if let Some(slot) = self.slots.get_mut(&p) {
                    slot.children.remove(index);
                }
            }
            None => {
                self.root.remove(index);
            }
        }
        Ok(self.destroy(key))
    }

    /// Rewrites a node's payload in place. The node type may not change,
    /// which keeps the children valid.
    pub fn set_kind(&mut self, key: NodeKey, kind: NodeKind) -> Result<(), EngineError> {
        let slot = self.slots.get_mut(&key).ok_or(EngineError::Detached(key))?;
        if slot.kind.node_type() != kind.node_type() {
            return Err(EngineError::WrongNodeType {
                expected: slot.kind.node_type().label(),
                found: kind.node_type(),
            });
        }
        slot.kind = kind;
        Ok(())
    }

    /// Pre-order descendants, excluding `key` itself.
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeKey> = self.children(key).iter().rev().copied().collect();
        while let Some(k) = stack.pop() {
            out.push(k);
            stack.extend(self.children(k).iter().rev().copied());
        }
        out
    }

    /// Every node in document order.
    pub fn walk(&self) -> Vec<NodeKey> {
        let mut out = Vec::with_capacity(self.slots.len());
        for &block in &self.root {
            out.push(block);
            out.extend(self.descendants(block));
        }
        out
    }

    /// Inserts a fresh-keyed copy of `key`'s subtree right after it.
    pub fn clone_subtree(&mut self, key: NodeKey) -> Result<NodeKey, EngineError> {
        let fragment = self.to_fragment(key).ok_or(EngineError::Detached(key))?;
        let index = self.index_in_parent(key).ok_or(EngineError::Detached(key))?;
        match self.parent(key) {
            Some(p) => self.insert_child(p, index + 1, fragment),
            None => self.insert_block(index + 1, fragment),
        }
    }

    pub fn to_fragment(&self, key: NodeKey) -> Option<Fragment> {
        let slot = self.slots.get(&key)?;
        Some(Fragment {
            kind: slot.kind.clone(),
            children: slot
                .children
                .iter()
                .filter_map(|c| self.to_fragment(*c))
                .collect(),
        })
    }

    pub fn to_fragments(&self) -> Vec<Fragment> {
        self.root.iter().filter_map(|k| self.to_fragment(*k)).collect()
    }

    pub fn text_content(&self, key: NodeKey) -> String {
        self.to_fragment(key)
            .map(|f| f.text_content())
            .unwrap_or_default()
    }

    /// The top-level block containing `key`.
    pub fn top_level_block(&self, key: NodeKey) -> Option<NodeKey> {
        let mut cur = key;
        if !self.is_attached(cur) {
            return None;
        }
        while let Some(p) = self.parent(cur) {
            cur = p;
        }
        Some(cur)
    }

    /// The closest ancestor-or-self whose children are inline content.
    pub fn inline_holder(&self, key: NodeKey) -> Option<NodeKey> {
        let mut cur = Some(key);
        while let Some(k) = cur {
            if self.kind(k)?.holds_inline() {
                return Some(k);
            }
            cur = self.parent(k);
        }
        None
    }

    fn materialize(&mut self, fragment: Fragment, parent: Option<NodeKey>) -> NodeKey {
        let key = NodeKey::allocate();
        let children = fragment
            .children
            .into_iter()
            .map(|c| self.materialize(c, Some(key)))
            .collect();
        self.slots.insert(
            key,
            Slot {
                kind: fragment.kind,
                parent,
                children,
            },
        );
        key
    }

    fn destroy(&mut self, key: NodeKey) -> Fragment {
        match self.slots.remove(&key) {
            Some(slot) => Fragment {
                kind: slot.kind,
                children: slot.children.into_iter().map(|c| self.destroy(c)).collect(),
            },
            None => Fragment::new(NodeKind::Paragraph),
        }
    }
}

fn check_root_child(fragment: &Fragment) -> Result<(), EngineError> {
    if fragment.kind.is_block() {
        Ok(())
    } else {
        Err(EngineError::InvalidChild {
            parent: "document".to_string(),
            child: fragment.kind.node_type(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextFormat;
    use pretty_assertions::assert_eq;

    fn sample() -> Document {
        Document::from_fragments(vec![
            Fragment::heading(1, vec![Fragment::text("Title")]),
            Fragment::paragraph(vec![
                Fragment::text("Hello "),
                Fragment::new(NodeKind::Link {
                    url: "https://x.io".into(),
                    text: "x".into(),
                }),
            ]),
        ])
        .unwrap()
    }

    #[test]
    fn parent_and_position_follow_from_key() {
        let doc = sample();
        let para = doc.root_children()[1];
        let link = doc.children(para)[1];
        assert_eq!(doc.parent(link), Some(para));
        assert_eq!(doc.index_in_parent(link), Some(1));
        assert_eq!(doc.index_in_parent(para), Some(1));
        assert_eq!(doc.top_level_block(link), Some(para));
        assert_eq!(doc.len(), 5);
    }

    #[test]
    fn inline_nodes_refuse_children() {
        let mut doc = sample();
        let para = doc.root_children()[1];
        let link = doc.children(para)[1];
        let err = doc.append_child(link, Fragment::text("nope")).unwrap_err();
        assert!(matches!(err, EngineError::InvalidChild { .. }));
    }

    #[test]
    fn root_refuses_inline_nodes() {
        let mut doc = Document::new();
        let err = doc.append_block(Fragment::text("loose")).unwrap_err();
        assert!(matches!(err, EngineError::InvalidChild { .. }));
        assert!(doc.is_empty());
    }

    #[test]
    fn invalid_fragment_is_rejected_before_insertion() {
        let mut doc = Document::new();
        let bad = Fragment::paragraph(vec![Fragment::paragraph(vec![])]);
        assert!(doc.append_block(bad).is_err());
        assert_eq!(doc.len(), 0);
    }

    #[test]
    fn remove_destroys_the_whole_subtree() {
        let mut doc = sample();
        let para = doc.root_children()[1];
        let children = doc.children(para).to_vec();
        let fragment = doc.remove(para).unwrap();
        assert!(!doc.is_attached(para));
        assert!(children.iter().all(|c| !doc.is_attached(*c)));
        assert_eq!(fragment.text_content(), "Hello x");
        assert_eq!(doc.root_children().len(), 1);
    }

    #[test]
    fn replace_keeps_position_with_new_key() {
        let mut doc = sample();
        let heading = doc.root_children()[0];
        let new = doc
            .replace(heading, Fragment::heading(2, vec![Fragment::text("Sub")]))
            .unwrap();
        assert_ne!(new, heading);
        assert_eq!(doc.root_children()[0], new);
        assert_eq!(doc.kind(new), Some(&NodeKind::Heading { level: 2 }));
        assert!(!doc.is_attached(heading));
    }

    #[test]
    fn replace_rejects_wrong_position() {
        let mut doc = sample();
        let heading = doc.root_children()[0];
        assert!(doc.replace(heading, Fragment::text("inline")).is_err());
        assert!(doc.is_attached(heading));
    }

    #[test]
    fn set_kind_refuses_type_changes() {
        let mut doc = sample();
        let heading = doc.root_children()[0];
        let text = doc.children(heading)[0];
        doc.set_kind(
            text,
            NodeKind::Text {
                text: "Renamed".into(),
                format: TextFormat::bold(),
            },
        )
        .unwrap();
        assert_eq!(doc.text_content(heading), "Renamed");
        assert!(doc.set_kind(text, NodeKind::Paragraph).is_err());
    }

    #[test]
    fn clone_preserves_keys_and_clone_subtree_allocates() {
        let mut doc = sample();
        let copy = doc.clone();
        assert_eq!(copy.root_children(), doc.root_children());

        let heading = doc.root_children()[0];
        let dup = doc.clone_subtree(heading).unwrap();
        assert_ne!(dup, heading);
        assert_eq!(doc.root_children()[1], dup);
        assert_eq!(doc.to_fragment(dup), doc.to_fragment(heading));
        let original_text = doc.children(heading)[0];
        assert!(!doc.children(dup).contains(&original_text));
    }

    #[test]
    fn walk_is_document_order() {
        let doc = sample();
        let kinds: Vec<_> = doc
            .walk()
            .into_iter()
            .filter_map(|k| doc.node_type(k))
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeType::Heading,
                NodeType::TextRun,
                NodeType::Paragraph,
                NodeType::TextRun,
                NodeType::Link,
            ]
        );
    }

    #[test]
    fn insert_block_out_of_bounds() {
        let mut doc = sample();
        let err = doc.insert_block(9, Fragment::paragraph(vec![])).unwrap_err();
        assert_eq!(err, EngineError::IndexOutOfBounds { index: 9, len: 2 });
    }
}
