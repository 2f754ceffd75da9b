use std::collections::HashMap;

use crate::model::{Document, NodeKey, NodeType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Created,
    /// Payload, parent, or child list changed.
    Updated,
    Destroyed,
}

/// What one committed update did to one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mutation {
    pub key: NodeKey,
    pub node_type: NodeType,
    pub kind: MutationKind,
}

/// Compares two versions of a document key by key. Output is in document
/// order of `after`, with destroyed nodes last.
pub fn diff(before: &Document, after: &Document) -> Vec<Mutation> {
    let mut out = Vec::new();
    for key in after.walk() {
        let Some(now) = after.get(key) else {
            continue;
        };
        let kind = match before.get(key) {
            None => MutationKind::Created,
            Some(then) if then.kind != now.kind || then.parent != now.parent || then.children != now.children => {
                MutationKind::Updated
            }
            Some(_) => continue,
        };
        out.push(Mutation {
            key,
            node_type: now.kind.node_type(),
            kind,
        });
    }
    for key in before.walk() {
        if !after.is_attached(key)
            && let Some(node_type) = before.node_type(key)
        {
            out.push(Mutation {
                key,
                node_type,
                kind: MutationKind::Destroyed,
            });
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&[Mutation])>;

/// Callbacks keyed by node type. Each gets only the records for its type,
/// once per commit, and only when there are any.
#[derive(Default)]
pub(crate) struct Listeners {
    next: u64,
    by_id: HashMap<ListenerId, (NodeType, Listener)>,
}

impl Listeners {
    pub fn register(&mut self, node_type: NodeType, listener: Listener) -> ListenerId {
        self.next += 1;
        let id = ListenerId(self.next);
        self.by_id.insert(id, (node_type, listener));
        id
    }

    pub fn unregister(&mut self, id: ListenerId) -> bool {
        self.by_id.remove(&id).is_some()
    }

    pub fn dispatch(&mut self, mutations: &[Mutation]) {
        let mut ids: Vec<ListenerId> = self.by_id.keys().copied().collect();
        ids.sort_by_key(|id| id.0);
        for id in ids {
            let Some((node_type, listener)) = self.by_id.get_mut(&id) else {
                continue;
            };
            let relevant: Vec<Mutation> = mutations
                .iter()
                .filter(|m| m.node_type == *node_type)
                .copied()
                .collect();
            if !relevant.is_empty() {
                listener(&relevant);
            }
        }
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners").field("count", &self.by_id.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Fragment, NodeKind};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn diff_reports_each_change_once() {
        let before = Document::from_fragments(vec![
            Fragment::paragraph(vec![Fragment::text("a")]),
            Fragment::heading(1, vec![Fragment::text("h")]),
        ])
        .unwrap();
        let p = before.root_children()[0];
        let h = before.root_children()[1];
        let p_text = before.children(p)[0];
        let h_text = before.children(h)[0];

        let mut after = before.clone();
        after.set_kind(p_text, NodeKind::plain("b")).unwrap();
        after.remove(h).unwrap();
        let hr = after.append_block(Fragment::new(NodeKind::HorizontalRule)).unwrap();

        let kinds: Vec<_> = diff(&before, &after).iter().map(|m| (m.key, m.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (p_text, MutationKind::Updated),
                (hr, MutationKind::Created),
                (h, MutationKind::Destroyed),
                (h_text, MutationKind::Destroyed),
            ]
        );
    }

    #[test]
    fn unchanged_document_has_no_mutations() {
        let doc = Document::from_fragments(vec![Fragment::paragraph(vec![Fragment::text("a")])]).unwrap();
        assert!(diff(&doc, &doc.clone()).is_empty());
    }

    #[test]
    fn listeners_see_only_their_type() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::default();
        let sink = Rc::clone(&seen);
        let id = listeners.register(
            NodeType::Heading,
            Box::new(move |ms| sink.borrow_mut().extend(ms.iter().map(|m| m.kind))),
        );
        let k = NodeKey::allocate();
        let records = [
            Mutation {
                key: k,
                node_type: NodeType::Heading,
                kind: MutationKind::Created,
            },
            Mutation {
                key: k,
                node_type: NodeType::Paragraph,
                kind: MutationKind::Destroyed,
            },
        ];
        listeners.dispatch(&records);
        assert_eq!(*seen.borrow(), vec![MutationKind::Created]);

        assert!(listeners.unregister(id));
        listeners.dispatch(&records);
        assert_eq!(seen.borrow().len(), 1);
    }
}
