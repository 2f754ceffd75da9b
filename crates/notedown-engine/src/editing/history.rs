use std::collections::VecDeque;

use super::Mode;
use crate::model::Document;

/// One restorable state. Keys are preserved, so side tables keyed by
/// `NodeKey` stay meaningful after a restore.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub doc: Document,
    pub mode: Mode,
}

/// Bounded undo stack plus redo stack.
#[derive(Debug)]
pub(crate) struct History {
    undo: VecDeque<Entry>,
    redo: Vec<Entry>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit,
        }
    }

    /// Records the state a commit is about to replace.
    pub fn record(&mut self, previous: Entry) {
        self.redo.clear();
        if self.limit == 0 {
            return;
        }
        if self.undo.len() == self.limit {
            self.undo.pop_front();
        }
        self.undo.push_back(previous);
    }

    pub fn undo(&mut self, current: Entry) -> Option<Entry> {
        let prev = self.undo.pop_back()?;
        self.redo.push(current);
        Some(prev)
    }

    pub fn redo(&mut self, current: Entry) -> Option<Entry> {
        let next = self.redo.pop()?;
        self.undo.push_back(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Fragment;

    fn entry(text: &str) -> Entry {
        Entry {
            doc: Document::from_fragments(vec![Fragment::paragraph(vec![Fragment::text(text)])]).unwrap(),
            mode: Mode::Rich,
        }
    }

    fn text(e: &Entry) -> String {
        e.doc.text_content(e.doc.root_children()[0])
    }

    #[test]
    fn oldest_entries_fall_off() {
        let mut h = History::new(2);
        h.record(entry("a"));
        h.record(entry("b"));
        h.record(entry("c"));
        assert_eq!(text(&h.undo(entry("d")).unwrap()), "c");
        assert_eq!(text(&h.undo(entry("c")).unwrap()), "b");
        assert!(h.undo(entry("b")).is_none());
    }

    #[test]
    fn new_record_clears_redo() {
        let mut h = History::new(10);
        h.record(entry("a"));
        h.undo(entry("b")).unwrap();
        assert!(h.can_redo());
        h.record(entry("a"));
        assert!(!h.can_redo());
    }

    #[test]
    fn zero_limit_keeps_nothing() {
        let mut h = History::new(0);
        h.record(entry("a"));
        assert!(!h.can_undo());
    }
}
