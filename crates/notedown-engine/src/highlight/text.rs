use std::ops::Range;

use crate::editing::Snapshot;
use crate::model::{Document, NodeKey, rendered_text};

/// A character position inside one text-bearing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextPoint {
    pub key: NodeKey,
    pub offset: usize,
}

/// `end` is exclusive and may sit in a different node than `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: TextPoint,
    pub end: TextPoint,
}

#[derive(Debug, Clone)]
struct Segment {
    key: NodeKey,
    block: NodeKey,
    /// Index of the segment's first character in `flat`.
    start: usize,
    len: usize,
}

/// All rendered text of a document concatenated, with a map from every
/// character back to the node and offset it came from.
#[derive(Debug, Clone, Default)]
pub struct RenderedText {
    flat: String,
    points: Vec<TextPoint>,
    segments: Vec<Segment>,
}

impl RenderedText {
    /// Builds from `(node, enclosing block, text)` triples in render order.
    pub fn new<'a>(segments: impl IntoIterator<Item = (NodeKey, NodeKey, &'a str)>) -> Self {
        let mut out = Self::default();
        for (key, block, text) in segments {
            let start = out.points.len();
            let mut len = 0;
            for c in text.chars() {
                out.flat.push(c);
                out.points.push(TextPoint { key, offset: len });
                len += 1;
            }
            out.segments.push(Segment { key, block, start, len });
        }
        out
    }

    pub fn from_document(doc: &Document) -> Self {
        Self::new(doc.walk().into_iter().filter_map(|k| {
            let text = rendered_text(doc.kind(k)?)?;
            let block = doc.inline_holder(k).or_else(|| doc.top_level_block(k))?;
            Some((k, block, text))
        }))
    }

    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self::new(
            snapshot
                .blocks
                .iter()
                .flat_map(|b| &b.segments)
                .filter(|s| s.embed_label.is_none())
                .map(|s| (s.key, s.holder, s.text.as_str())),
        )
    }

    #[cfg(test)]
    pub(crate) fn from_strings(parts: &[&str]) -> Self {
        let block = NodeKey::allocate();
        let keys: Vec<NodeKey> = parts.iter().map(|_| NodeKey::allocate()).collect();
        Self::new(keys.into_iter().zip(parts.iter().copied()).map(|(k, t)| (k, block, t)))
    }

    #[cfg(test)]
    pub(crate) fn keys(&self) -> Vec<NodeKey> {
        self.segments.iter().map(|s| s.key).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.flat
    }

    pub fn char_len(&self) -> usize {
        self.points.len()
    }

    /// First occurrence of `needle`.
    pub fn find(&self, needle: &str) -> Option<TextRange> {
        if needle.is_empty() {
            return None;
        }
        let byte = self.flat.find(needle)?;
        let start = self.flat[..byte].chars().count();
        let last = start + needle.chars().count() - 1;
        let first = *self.points.get(start)?;
        let end = *self.points.get(last)?;
        Some(TextRange {
            start: first,
            end: TextPoint {
                key: end.key,
                offset: end.offset + 1,
            },
        })
    }

    /// Position of `point` in the flattened text. An offset equal to the
    /// node's length is the position right after it.
    pub fn index_of(&self, point: TextPoint) -> Option<usize> {
        self.segments
            .iter()
            .find(|s| s.key == point.key && point.offset <= s.len)
            .map(|s| s.start + point.offset)
    }

    pub fn char_range(&self, range: &TextRange) -> Option<Range<usize>> {
        let a = self.index_of(range.start)?;
        let b = self.index_of(range.end)?;
        Some(a.min(b)..a.max(b))
    }

    pub fn slice(&self, chars: Range<usize>) -> String {
        self.flat
            .chars()
            .skip(chars.start)
            .take(chars.end.saturating_sub(chars.start))
            .collect()
    }

    pub fn block_of(&self, key: NodeKey) -> Option<NodeKey> {
        self.segments.iter().find(|s| s.key == key).map(|s| s.block)
    }

    /// Text of every segment in `block`.
    pub fn block_text(&self, block: NodeKey) -> String {
        self.segments
            .iter()
            .filter(|s| s.block == block)
            .map(|s| self.slice(s.start..s.start + s.len))
            .collect()
    }
}
