//! Keyboard and clipboard input.

use log::{debug, warn};

use super::{Editor, Mode, Point, Selection};
use crate::bridge::{self, scan};
use crate::error::EngineError;
use crate::model::{Document, Fragment, NodeKey, NodeKind, TextFormat};
use crate::transform::inline::into_fragments;
use crate::transform::{Piece, Trigger, registry};

/// A point resolved against the tree.
enum Caret {
    /// Inside a text run, `offset` in characters.
    Text { holder: NodeKey, node: NodeKey, offset: usize },
    /// Between two inline children of `holder`.
    Gap { holder: NodeKey, index: usize },
    Code { node: NodeKey, offset: usize },
}

fn locate(doc: &Document, at: Point) -> Result<Caret, EngineError> {
    let kind = doc.kind(at.key).ok_or(EngineError::Detached(at.key))?;
    match kind {
        NodeKind::Text { text, .. } => Ok(Caret::Text {
            holder: doc.parent(at.key).ok_or(EngineError::Detached(at.key))?,
            node: at.key,
            offset: at.offset.min(text.chars().count()),
        }),
        NodeKind::CodeBlock { code, .. } => Ok(Caret::Code {
            node: at.key,
            offset: at.offset.min(code.chars().count()),
        }),
        k if k.holds_inline() => Ok(Caret::Gap {
            holder: at.key,
            index: at.offset.min(doc.children(at.key).len()),
        }),
        k if k.is_inline() => {
            let holder = doc.parent(at.key).ok_or(EngineError::Detached(at.key))?;
            let index = doc.index_in_parent(at.key).ok_or(EngineError::Detached(at.key))?;
            Ok(Caret::Gap {
                holder,
                index: index + usize::from(at.offset > 0),
            })
        }
        k => Err(EngineError::WrongNodeType {
            expected: "text position",
            found: k.node_type(),
        }),
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn split_chars(s: &str, at: usize) -> (&str, &str) {
    let byte = s.char_indices().nth(at).map_or(s.len(), |(i, _)| i);
    s.split_at(byte)
}

fn text_of(doc: &Document, key: NodeKey) -> Option<(String, TextFormat)> {
    match doc.kind(key)? {
        NodeKind::Text { text, format } => Some((text.clone(), *format)),
        _ => None,
    }
}

/// The text run typing at a gap goes into, creating an empty one when the
/// gap has no plain text on its left. A collapse marker stays the last
/// child.
fn text_at_gap(doc: &mut Document, holder: NodeKey, mut index: usize) -> Result<(NodeKey, usize), EngineError> {
    let children = doc.children(holder).to_vec();
    if index > 0 && matches!(doc.kind(children[index - 1]), Some(NodeKind::CollapseMarker)) {
        index -= 1;
    }
    if index > 0
        && let Some((text, format)) = text_of(doc, children[index - 1])
        && format.is_plain()
    {
        return Ok((children[index - 1], char_len(&text)));
    }
    let key = doc.insert_child(holder, index, Fragment::text(""))?;
    Ok((key, 0))
}

fn trigger_for(c: char) -> Option<Trigger> {
    if c.is_whitespace() {
        return Some(Trigger::Boundary);
    }
    let trigger = Trigger::Char(c);
    registry()
        .text_matches
        .iter()
        .any(|t| t.trigger == trigger)
        .then_some(trigger)
}

fn run_fragment(text: String, format: TextFormat) -> Fragment {
    Fragment::new(NodeKind::Text { text, format })
}

fn type_char(doc: &mut Document, at: Point, c: char) -> Result<Point, EngineError> {
    let (holder, node, offset) = match locate(doc, at)? {
        Caret::Code { node, offset } => {
            if let Some(NodeKind::CodeBlock { language, code }) = doc.kind(node).cloned() {
                let (before, after) = split_chars(&code, offset);
                let code = format!("{before}{c}{after}");
                doc.set_kind(node, NodeKind::CodeBlock { language, code })?;
            }
            return Ok(Point::new(node, offset + 1));
        }
        Caret::Text { holder, node, offset } => (holder, node, offset),
        Caret::Gap { holder, index } => {
            let (node, offset) = text_at_gap(doc, holder, index)?;
            (holder, node, offset)
        }
    };
    let Some((text, format)) = text_of(doc, node) else {
        return Err(EngineError::Detached(node));
    };
    let (before, after) = split_chars(&text, offset);

    if let Some(trigger) = trigger_for(c) {
        let boundary = trigger == Trigger::Boundary;
        let siblings = doc.children(holder).to_vec();
        let index = doc.index_in_parent(node).ok_or(EngineError::Detached(node))?;

        let mut head: Vec<Piece> = siblings[..index]
            .iter()
            .filter_map(|k| match doc.kind(*k)? {
                NodeKind::Text { text, format } if format.is_plain() => Some(Piece::Text(text.clone())),
                _ => doc.to_fragment(*k).map(Piece::Node),
            })
            .collect();
        let mut typed = before.to_string();
        if !boundary {
            typed.push(c);
        }
        if format.is_plain() {
            head.push(Piece::Text(typed));
        } else {
            head.push(Piece::Node(run_fragment(typed, format)));
        }

        if let Some(rewritten) = scan::import_at_trigger(registry(), head, trigger) {
            debug!("typing {c:?} rewrote inline content of {holder}");
            let mut built = into_fragments(rewritten);
            if boundary {
                match built.last_mut() {
                    Some(Fragment {
                        kind: NodeKind::Text { text, format },
                        ..
                    }) if format.is_plain() => text.push(c),
                    _ => built.push(Fragment::text(c.to_string())),
                }
            }
            let mut tail = Vec::new();
            if !after.is_empty() {
                tail.push(run_fragment(after.to_string(), format));
            }
            tail.extend(siblings[index + 1..].iter().filter_map(|k| doc.to_fragment(*k)));

            for k in siblings {
                doc.remove(k)?;
            }
            let mut caret = Point::new(holder, 0);
            for (i, fragment) in built.into_iter().enumerate() {
                let len = fragment_text_len(&fragment);
                let key = doc.append_child(holder, fragment)?;
                caret = match len {
                    Some(len) => Point::new(key, len),
                    None => Point::new(holder, i + 1),
                };
            }
            for fragment in tail {
                doc.append_child(holder, fragment)?;
            }
            return Ok(caret);
        }
    }

    let text = format!("{before}{c}{after}");
    doc.set_kind(node, NodeKind::Text { text, format })?;
    Ok(Point::new(node, offset + 1))
}

/// Where the caret lands after a rebuilt fragment: inside a plain run, or
/// in the gap after anything else so that typing continues unformatted.
fn fragment_text_len(f: &Fragment) -> Option<usize> {
    match &f.kind {
        NodeKind::Text { text, format } if format.is_plain() => Some(char_len(text)),
        _ => None,
    }
}

fn delete_backward(doc: &mut Document, at: Point) -> Result<Point, EngineError> {
    match locate(doc, at)? {
        Caret::Code { node, offset } => {
            if offset == 0 {
                return Ok(at);
            }
            if let Some(NodeKind::CodeBlock { language, code }) = doc.kind(node).cloned() {
                let (before, after) = split_chars(&code, offset);
                let mut before = before.to_string();
                before.pop();
                doc.set_kind(
                    node,
                    NodeKind::CodeBlock {
                        language,
                        code: before + after,
                    },
                )?;
            }
            Ok(Point::new(node, offset - 1))
        }
        Caret::Text { node, offset, .. } if offset > 0 => {
            let Some((text, format)) = text_of(doc, node) else {
                return Err(EngineError::Detached(node));
            };
            let (before, after) = split_chars(&text, offset);
            let mut before = before.to_string();
            before.pop();
            doc.set_kind(
                node,
                NodeKind::Text {
                    text: before + after,
                    format,
                },
            )?;
            Ok(Point::new(node, offset - 1))
        }
        Caret::Text { holder, node, .. } => {
            let index = doc.index_in_parent(node).ok_or(EngineError::Detached(node))?;
            delete_before_gap(doc, holder, index)
        }
        Caret::Gap { holder, index } => delete_before_gap(doc, holder, index),
    }
}

fn delete_before_gap(doc: &mut Document, holder: NodeKey, index: usize) -> Result<Point, EngineError> {
    if index == 0 {
        return merge_into_previous(doc, holder);
    }
    let prev = doc.children(holder)[index - 1];
    match doc.kind(prev).cloned() {
        Some(NodeKind::CollapseMarker) => {
            doc.remove(prev)?;
            debug!("backspace over collapse marker expanded {holder}");
            Ok(Point::new(holder, index - 1))
        }
        Some(NodeKind::Text { text, .. }) if text.is_empty() => {
            doc.remove(prev)?;
            delete_before_gap(doc, holder, index - 1)
        }
        Some(NodeKind::Text { mut text, format }) => {
            text.pop();
            let offset = char_len(&text);
            doc.set_kind(prev, NodeKind::Text { text, format })?;
            Ok(Point::new(prev, offset))
        }
        _ => {
            doc.remove(prev)?;
            Ok(Point::new(holder, index - 1))
        }
    }
}

/// Backspace at the very start of a top-level block: join it onto the
/// block before, or drop it when it is empty and cannot be joined.
fn merge_into_previous(doc: &mut Document, holder: NodeKey) -> Result<Point, EngineError> {
    let stay = Point::new(holder, 0);
    if doc.parent(holder).is_some() {
        return Ok(stay);
    }
    let index = doc.index_in_parent(holder).ok_or(EngineError::Detached(holder))?;
    if index == 0 {
        return Ok(stay);
    }
    let prev = doc.root_children()[index - 1];
    let prev_holds_inline = doc.kind(prev).is_some_and(NodeKind::holds_inline);
    if !prev_holds_inline {
        if doc.children(holder).is_empty()
            && let Some(end) = end_point(doc, prev)
        {
            doc.remove(holder)?;
            return Ok(end);
        }
        return Ok(stay);
    }
    let moved: Vec<Fragment> = doc
        .children(holder)
        .iter()
        .filter_map(|k| doc.to_fragment(*k))
        .collect();
    let mut at = doc.children(prev).len();
    if let Some(marker) = crate::outline::marker_of(doc, prev) {
        at = doc.index_in_parent(marker).unwrap_or(at);
    }
    let caret = Point::new(prev, at);
    for (i, fragment) in moved.into_iter().enumerate() {
        doc.insert_child(prev, at + i, fragment)?;
    }
    doc.remove(holder)?;
    Ok(caret)
}

/// Caret position at the end of a block's editable content.
fn end_point(doc: &Document, block: NodeKey) -> Option<Point> {
    match doc.kind(block)? {
        NodeKind::CodeBlock { code, .. } => Some(Point::new(block, char_len(code))),
        k if k.holds_inline() => Some(Point::new(block, doc.children(block).len())),
        _ => doc
            .descendants(block)
            .into_iter()
            .rev()
            .find(|k| doc.kind(*k).is_some_and(NodeKind::holds_inline))
            .map(|k| Point::new(k, doc.children(k).len())),
    }
}

impl Editor {
    fn caret(&self) -> Result<Point, EngineError> {
        self.selection.map(|s| s.focus).ok_or(EngineError::NoSelection)
    }

    /// Types `text` at the caret one character at a time. Each trigger
    /// character runs the inline transformers over the text before the
    /// caret, exactly as a full import would.
    pub fn type_text(&mut self, text: &str) -> Result<(), EngineError> {
        let start = self.caret()?;
        let end = self.update(|doc| {
            text.chars().try_fold(start, |at, c| type_char(doc, at, c))
        })?;
        self.selection = Some(Selection::caret(end));
        Ok(())
    }

    /// Deletes one character before the caret. Right after a collapse
    /// marker it expands the heading instead.
    pub fn backspace(&mut self) -> Result<(), EngineError> {
        let at = self.caret()?;
        let caret = self.update(|doc| delete_backward(doc, at))?;
        self.selection = Some(Selection::caret(caret));
        Ok(())
    }

    /// Imports `text` and inserts its blocks after the caret's block, or at
    /// the end without a caret. In raw mode the text is typed verbatim.
    pub fn paste_markdown(&mut self, text: &str) -> Result<Vec<NodeKey>, EngineError> {
        if self.mode == Mode::Raw {
            self.type_text(text)?;
            return Ok(Vec::new());
        }
        let blocks = bridge::import_blocks(registry(), text);
        if blocks.is_empty() {
            return Ok(Vec::new());
        }
        let index = self
            .selection
            .and_then(|s| self.doc.top_level_block(s.focus.key))
            .and_then(|b| self.doc.index_in_parent(b))
            .map_or(self.doc.root_children().len(), |i| i + 1);
        let keys = self.update(|doc| {
            blocks
                .into_iter()
                .enumerate()
                .map(|(i, block)| doc.insert_block(index + i, block))
                .collect::<Result<Vec<_>, _>>()
        })?;
        if let Some(end) = keys.last().and_then(|k| end_point(&self.doc, *k)) {
            self.selection = Some(Selection::caret(end));
        }
        Ok(keys)
    }

    /// Binary clipboard content (images, files) is never inserted.
    pub fn paste_binary(&mut self, mime: &str) -> Result<(), EngineError> {
        warn!("rejecting binary paste of {mime}");
        Err(EngineError::UnsupportedInput(mime.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::EditorOptions;
    use crate::model::EntityKind;
    use crate::model::normalize::format_tree;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn editor_at_end(md: &str) -> Editor {
        let mut ed = Editor::from_markdown(md, EditorOptions::default());
        let last = *ed.document().root_children().last().unwrap();
        let end = end_point(ed.document(), last).unwrap();
        ed.set_selection(Selection::caret(end)).unwrap();
        ed
    }

    fn empty_paragraph_editor() -> Editor {
        let mut ed = Editor::default();
        let p = ed.insert_block(0, Fragment::paragraph(vec![])).unwrap();
        ed.set_selection(Selection::caret(Point::new(p, 0))).unwrap();
        ed
    }

    #[test]
    fn typing_builds_bold_on_closing_star() {
        let mut ed = empty_paragraph_editor();
        ed.type_text("say **hi**").unwrap();
        assert_snapshot!(format_tree(ed.document()), @r#"
        Paragraph
          Text "say "
          Text(bold) "hi"
        "#);
        ed.type_text(" there").unwrap();
        assert_eq!(ed.to_markdown(), "say **hi** there");
    }

    #[test]
    fn typing_matches_full_import() {
        let input = "see [docs](https://x.io) and `a*b*` or nostr:npub1abc ok";
        let mut ed = empty_paragraph_editor();
        ed.type_text(input).unwrap();
        let imported = bridge::from_markdown(input);
        assert_eq!(format_tree(ed.document()), format_tree(&imported));
    }

    #[test]
    fn entity_needs_boundary_when_typed() {
        let mut ed = empty_paragraph_editor();
        ed.type_text("hi nostr:npub1abc").unwrap();
        let p = ed.document().root_children()[0];
        assert_eq!(ed.document().children(p).len(), 1);
        ed.type_text(" ").unwrap();
        let children = ed.document().children(p).to_vec();
        assert!(matches!(
            ed.document().kind(children[1]),
            Some(NodeKind::Entity {
                kind: EntityKind::Npub,
                is_embed: true,
                ..
            })
        ));
        assert_eq!(ed.embeds.take_requests().len(), 1);
    }

    #[test]
    fn typing_in_the_middle_keeps_tail() {
        let mut ed = Editor::from_markdown("ab", EditorOptions::default());
        let p = ed.document().root_children()[0];
        let text = ed.document().children(p)[0];
        ed.set_selection(Selection::caret(Point::new(text, 1))).unwrap();
        ed.type_text("X").unwrap();
        assert_eq!(ed.to_markdown(), "aXb");
        assert_eq!(ed.selection().unwrap().focus, Point::new(text, 2));
    }

    #[test]
    fn typing_is_one_undo_step() {
        let mut ed = empty_paragraph_editor();
        ed.type_text("word").unwrap();
        ed.undo().unwrap();
        assert_eq!(ed.to_markdown(), "");
    }

    #[test]
    fn backspace_deletes_characters() {
        let mut ed = editor_at_end("abc");
        ed.backspace().unwrap();
        assert_eq!(ed.to_markdown(), "ab");
    }

    #[test]
    fn backspace_after_marker_expands() {
        let mut ed = Editor::from_markdown("# Title\n\nbody", EditorOptions::default());
        let h = ed.document().root_children()[0];
        ed.collapse(h).unwrap();
        ed.set_selection(Selection::caret(Point::new(h, 2))).unwrap();
        ed.backspace().unwrap();
        assert!(!ed.is_collapsed(h));
        assert_eq!(ed.to_markdown(), "# Title\n\nbody");
        ed.backspace().unwrap();
        assert_eq!(ed.to_markdown(), "# Titl\n\nbody");
    }

    #[test]
    fn typing_after_marker_keeps_it_last() {
        let mut ed = Editor::from_markdown("# T", EditorOptions::default());
        let h = ed.document().root_children()[0];
        ed.collapse(h).unwrap();
        ed.set_selection(Selection::caret(Point::new(h, 2))).unwrap();
        ed.type_text("x").unwrap();
        let last = *ed.document().children(h).last().unwrap();
        assert_eq!(ed.document().kind(last), Some(&NodeKind::CollapseMarker));
        assert_eq!(ed.to_markdown(), "# Tx");
    }

    #[test]
    fn backspace_at_block_start_joins_blocks() {
        let mut ed = Editor::from_markdown("one\n\ntwo", EditorOptions::default());
        let second = ed.document().root_children()[1];
        ed.set_selection(Selection::caret(Point::new(second, 0))).unwrap();
        ed.backspace().unwrap();
        assert_eq!(ed.to_markdown(), "onetwo");
        let p = ed.document().root_children()[0];
        assert_eq!(ed.selection().unwrap().focus, Point::new(p, 1));
    }

    #[test]
    fn backspace_removes_embed_leaf() {
        let mut ed = editor_at_end("see https://youtu.be/dQw4w9WgXcQ");
        ed.backspace().unwrap();
        assert_eq!(ed.to_markdown(), "see ");
    }

    #[test]
    fn paste_inserts_after_caret_block() {
        let mut ed = Editor::from_markdown("one\n\nthree", EditorOptions::default());
        let first = ed.document().root_children()[0];
        ed.set_selection(Selection::caret(Point::new(first, 0))).unwrap();
        let keys = ed.paste_markdown("## two").unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(ed.to_markdown(), "one\n\n## two\n\nthree");
        assert_eq!(ed.selection().unwrap().focus.key, keys[0]);
    }

    #[test]
    fn binary_paste_is_rejected() {
        let mut ed = editor_at_end("text");
        let version = ed.version();
        assert_eq!(
            ed.paste_binary("image/png"),
            Err(EngineError::UnsupportedInput("image/png".into()))
        );
        assert_eq!(ed.version(), version);
    }

    #[test]
    fn raw_mode_types_into_code() {
        let mut ed = Editor::from_markdown("# A", EditorOptions::default());
        ed.toggle_mode().unwrap();
        let raw = ed.document().root_children()[0];
        ed.set_selection(Selection::caret(Point::new(raw, 3))).unwrap();
        ed.paste_markdown("\n\n*b*").unwrap();
        assert_eq!(ed.to_markdown(), "# A\n\n*b*");
        ed.toggle_mode().unwrap();
        assert_eq!(ed.document().root_children().len(), 2);
    }

    #[test]
    fn no_caret_no_typing() {
        let mut ed = Editor::default();
        assert_eq!(ed.type_text("x"), Err(EngineError::NoSelection));
        assert_eq!(ed.backspace(), Err(EngineError::NoSelection));
    }
}
