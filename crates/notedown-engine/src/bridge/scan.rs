//! Trigger-driven inline scan.
//!
//! Text is fed left to right. Whenever a trigger character has just been
//! pushed (or a boundary is reached) the text-match transformers get one
//! chance, in registration order, to replace the trailing text with a node.
//! Full import and typing share [`Scanner::fire`].

use log::trace;

use crate::model::Fragment;
use crate::parsing::Cursor;
use crate::transform::inline::into_fragments;
use crate::transform::{Piece, Registry, Shadow, Trigger};

pub struct Scanner<'r> {
    registry: &'r Registry,
    pieces: Vec<Piece>,
    open_ticks: usize,
}

impl<'r> Scanner<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self::from_pieces(registry, Vec::new())
    }

    pub fn from_pieces(registry: &'r Registry, pieces: Vec<Piece>) -> Self {
        let mut scanner = Self {
            registry,
            pieces,
            open_ticks: 0,
        };
        scanner.recount_ticks();
        scanner
    }

    pub fn push_char(&mut self, c: char) {
        if c == '`' {
            self.open_ticks += 1;
        }
        match self.pieces.last_mut() {
            Some(Piece::Text(t)) => t.push(c),
            _ => self.pieces.push(Piece::Text(c.to_string())),
        }
    }

    pub fn push_escaped(&mut self, c: char) {
        self.pieces.push(Piece::Escaped(c));
    }

    pub fn in_code_span(&self) -> bool {
        self.open_ticks % 2 == 1
    }

    /// Gives every transformer registered for `trigger` a chance to match
    /// the text scanned so far. Returns whether one fired.
    pub fn fire(&mut self, trigger: Trigger) -> bool {
        let raw_zone = self.in_code_span();
        let candidates = self
            .registry
            .text_matches
            .iter()
            .filter(|t| t.trigger == trigger && (t.raw || !raw_zone));
        let shadow = Shadow::build(&self.pieces);
        let mut hit = None;
        for t in candidates {
            let Some(caps) = t.regex.captures(&shadow.text) else {
                continue;
            };
            if let Some(rep) = (t.replace)(&caps, &shadow) {
                trace!("{} matched {:?}", t.name, &shadow.text[rep.range.clone()]);
                hit = Some(rep);
                break;
            }
        }
        let Some(rep) = hit else {
            return false;
        };
        let mut pieces = shadow.pieces(0..rep.range.start);
        let after = shadow.pieces(rep.range.end..shadow.text.len());
        pieces.extend(rep.with);
        pieces.extend(after);
        self.pieces = pieces;
        self.recount_ticks();
        true
    }

    pub fn into_pieces(self) -> Vec<Piece> {
        self.pieces
    }

    pub fn finish(self) -> Vec<Fragment> {
        into_fragments(self.pieces)
    }

    fn recount_ticks(&mut self) {
        self.open_ticks = self
            .pieces
            .iter()
            .map(|p| match p {
                Piece::Text(t) => t.matches('`').count(),
                _ => 0,
            })
            .sum();
    }
}

/// Imports the inline content of one block.
pub fn scan_inline(registry: &Registry, text: &str) -> Vec<Fragment> {
    let mut scanner = Scanner::new(registry);
    let mut cur = Cursor::new(text);
    while let Some(c) = cur.peek() {
        if c == '\\'
            && !scanner.in_code_span()
            && let Some(next) = cur.peek_next()
            && next.is_ascii_punctuation()
        {
            cur.bump();
            cur.bump();
            scanner.push_escaped(next);
            continue;
        }
        if c.is_whitespace() {
            scanner.fire(Trigger::Boundary);
        }
        cur.bump();
        scanner.push_char(c);
        scanner.fire(Trigger::Char(c));
    }
    scanner.fire(Trigger::Boundary);
    scanner.finish()
}

/// The typing path: `pieces` is the block content up to the caret, with
/// the trigger character already appended (or, for a boundary, the
/// whitespace not yet appended). Returns the rewritten pieces when a
/// transformer fired.
pub fn import_at_trigger(registry: &Registry, pieces: Vec<Piece>, trigger: Trigger) -> Option<Vec<Piece>> {
    let mut scanner = Scanner::from_pieces(registry, pieces);
    scanner.fire(trigger).then(|| scanner.into_pieces())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityKind, NodeKind, TextFormat};
    use crate::transform::registry;
    use pretty_assertions::assert_eq;

    fn scan(text: &str) -> Vec<Fragment> {
        scan_inline(registry(), text)
    }

    fn run(text: &str, format: TextFormat) -> Fragment {
        Fragment::new(NodeKind::Text {
            text: text.into(),
            format,
        })
    }

    #[test]
    fn plain_text_stays_one_run() {
        assert_eq!(scan("just words"), vec![Fragment::text("just words")]);
    }

    #[test]
    fn image_wins_over_link() {
        let out = scan("![alt](http://x/img.png)");
        assert_eq!(
            out,
            vec![Fragment::new(NodeKind::Image {
                url: "http://x/img.png".into(),
                alt: "alt".into()
            })]
        );
    }

    #[test]
    fn link_keeps_preceding_text() {
        let out = scan("see [text](https://x.io) now");
        assert_eq!(
            out,
            vec![
                Fragment::text("see "),
                Fragment::new(NodeKind::Link {
                    url: "https://x.io".into(),
                    text: "text".into()
                }),
                Fragment::text(" now"),
            ]
        );
    }

    #[test]
    fn nostr_scheme_marks_embed() {
        let out = scan("nostr:npub1abc and npub1def");
        assert_eq!(
            out,
            vec![
                Fragment::new(NodeKind::Entity {
                    kind: EntityKind::Npub,
                    identifier: "npub1abc".into(),
                    is_embed: true
                }),
                Fragment::text(" and "),
                Fragment::new(NodeKind::Entity {
                    kind: EntityKind::Npub,
                    identifier: "npub1def".into(),
                    is_embed: false
                }),
            ]
        );
    }

    #[test]
    fn entity_needs_whitespace_before_it() {
        assert_eq!(scan("xnpub1abc"), vec![Fragment::text("xnpub1abc")]);
    }

    #[test]
    fn angle_brackets_delimit_targets_against_text() {
        let out = scan("x<nostr:npub1abc>def<https://x.io/s.mp3>.");
        assert_eq!(
            out,
            vec![
                Fragment::text("x"),
                Fragment::new(NodeKind::Entity {
                    kind: EntityKind::Npub,
                    identifier: "npub1abc".into(),
                    is_embed: true
                }),
                Fragment::text("def"),
                Fragment::new(NodeKind::Audio {
                    url: "https://x.io/s.mp3".into()
                }),
                Fragment::text("."),
            ]
        );
        let out = scan("<https://www.youtube.com/watch?v=dQw4w9WgXcQ>s <https://x.io>!");
        assert_eq!(
            out,
            vec![
                Fragment::new(NodeKind::YouTube {
                    video_id: "dQw4w9WgXcQ".into()
                }),
                Fragment::text("s "),
                Fragment::new(NodeKind::Link {
                    url: "https://x.io".into(),
                    text: "https://x.io".into()
                }),
                Fragment::text("!"),
            ]
        );
        assert_eq!(scan(r"\<https://x.io>"), vec![Fragment::text("<https://x.io>")]);
        assert_eq!(scan("<ftp://x.io>"), vec![Fragment::text("<ftp://x.io>")]);
    }

    #[test]
    fn video_url_beats_autolink() {
        let out = scan("https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(
            out,
            vec![Fragment::new(NodeKind::YouTube {
                video_id: "dQw4w9WgXcQ".into()
            })]
        );
        let out = scan("https://x.io/song.mp3 https://x.io.");
        assert_eq!(
            out,
            vec![
                Fragment::new(NodeKind::Audio {
                    url: "https://x.io/song.mp3".into()
                }),
                Fragment::text(" "),
                Fragment::new(NodeKind::Link {
                    url: "https://x.io".into(),
                    text: "https://x.io".into()
                }),
                Fragment::text("."),
            ]
        );
    }

    #[test]
    fn nested_formats() {
        let out = scan("**_both_** and ~~gone~~");
        assert_eq!(
            out,
            vec![
                run("both", TextFormat::bold().union(TextFormat::italic())),
                Fragment::text(" and "),
                run("gone", TextFormat::strikethrough()),
            ]
        );
    }

    #[test]
    fn code_span_is_raw() {
        let out = scan("`**not bold** \\*` after");
        assert_eq!(
            out,
            vec![run("**not bold** \\*", TextFormat::code()), Fragment::text(" after")]
        );
    }

    #[test]
    fn escapes_are_literal() {
        assert_eq!(scan(r"\*not italic\*"), vec![Fragment::text("*not italic*")]);
        assert_eq!(scan(r"a\b"), vec![Fragment::text(r"a\b")]);
    }

    #[test]
    fn intraword_underscores_stay_text() {
        assert_eq!(scan("snake_case_name"), vec![Fragment::text("snake_case_name")]);
    }

    #[test]
    fn unclosed_delimiters_are_plain() {
        assert_eq!(scan("**open"), vec![Fragment::text("**open")]);
        assert_eq!(scan("[text](no close"), vec![Fragment::text("[text](no close")]);
    }

    #[test]
    fn typing_path_fires_at_trigger() {
        let pieces = vec![Piece::Text("a **b**".into())];
        let out = import_at_trigger(registry(), pieces, Trigger::Char('*')).unwrap();
        assert_eq!(
            into_fragments(out),
            vec![Fragment::text("a "), run("b", TextFormat::bold())]
        );
        let pieces = vec![Piece::Text("a **b*".into())];
        assert!(import_at_trigger(registry(), pieces, Trigger::Char('*')).is_none());
    }
}
