//! Markdown ⇄ document conversion.

pub mod scan;

use log::{debug, warn};

use crate::model::{Document, ExportOptions, Fragment, NodeKind, export_markdown_fragment};
use crate::parsing::{detect_indent_style, lines_with_spans};
use crate::transform::{ImportContext, Registry, registry};

/// Language tag of the code block that holds the document in raw mode.
pub const RAW_LANGUAGE: &str = "markdown";

pub fn from_markdown(text: &str) -> Document {
    import_document(registry(), text)
}

pub fn to_markdown(doc: &Document) -> String {
    export_document(doc, &ExportOptions::default())
}

/// Top-level blocks joined by a blank line.
pub fn export_document(doc: &Document, opts: &ExportOptions) -> String {
    doc.root_children()
        .iter()
        .map(|k| export_markdown_fragment(doc, *k, opts))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn import_document(registry: &Registry, text: &str) -> Document {
    let mut doc = Document::new();
    for block in import_blocks(registry, text) {
        if let Err(e) = doc.append_block(block) {
            warn!("dropping imported block: {e}");
        }
    }
    doc
}

/// Collects blocks while turning runs of blank lines back into the empty
/// paragraphs they encode.
///
/// Blocks are written with one blank line between them and an empty
/// paragraph adds two more, so between blocks `k` blank lines carry
/// `(k - 1) / 2` empty paragraphs and at either edge `k / 2`.
#[derive(Default)]
struct BlockSink {
    blocks: Vec<Fragment>,
    blank_run: usize,
}

impl BlockSink {
    fn blank(&mut self) {
        self.blank_run += 1;
    }

    fn push(&mut self, block: Fragment) {
        let empties = if self.blocks.is_empty() {
            self.blank_run / 2
        } else {
            self.blank_run.saturating_sub(1) / 2
        };
        self.push_empties(empties);
        self.blank_run = 0;
        self.blocks.push(block);
    }

    fn finish(mut self) -> Vec<Fragment> {
        let empties = if self.blocks.is_empty() {
            (self.blank_run + 1) / 2
        } else {
            self.blank_run / 2
        };
        self.push_empties(empties);
        self.blocks
    }

    fn push_empties(&mut self, n: usize) {
        self.blocks
            .extend(std::iter::repeat_with(|| Fragment::paragraph(Vec::new())).take(n));
    }
}

/// Line-based block import. At each non-blank line the block transformers
/// are tried in registration order; lines nobody claims accumulate into a
/// paragraph.
pub fn import_blocks(registry: &Registry, text: &str) -> Vec<Fragment> {
    let lines = lines_with_spans(text);
    let ctx = ImportContext {
        registry,
        indent: detect_indent_style(text),
    };
    let mut sink = BlockSink::default();
    let mut paragraph: Vec<&str> = Vec::new();

    let flush = |paragraph: &mut Vec<&str>, sink: &mut BlockSink| {
        if !paragraph.is_empty() {
            let text = paragraph.join("\n");
            sink.push(Fragment::paragraph(ctx.inline(&text)));
            paragraph.clear();
        }
    };

    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];
        if line.is_blank() {
            flush(&mut paragraph, &mut sink);
            sink.blank();
            i += 1;
            continue;
        }
        let matched = registry
            .blocks
            .iter()
            .find_map(|t| t.import(&lines, i, &ctx).map(|m| (t.name(), m)));
        match matched {
            Some((name, m)) => {
                debug!("{name} claimed lines {}..{}", i, i + m.consumed);
                flush(&mut paragraph, &mut sink);
                sink.push(m.fragment);
                i += m.consumed.max(1);
            }
            None => {
                paragraph.push(line.text);
                i += 1;
            }
        }
    }
    flush(&mut paragraph, &mut sink);
    sink.finish()
}

/// Rich → raw: the whole document as one markdown code block.
pub fn to_raw(doc: &Document, opts: &ExportOptions) -> Fragment {
    Fragment::new(NodeKind::CodeBlock {
        language: Some(RAW_LANGUAGE.to_string()),
        code: export_document(doc, opts),
    })
}

/// The markdown held by a raw-mode document, if it is one.
pub fn raw_text(doc: &Document) -> Option<&str> {
    match doc.root_children() {
        [only] => match doc.kind(*only)? {
            NodeKind::CodeBlock { language, code } if language.as_deref() == Some(RAW_LANGUAGE) => {
                Some(code)
            }
            _ => None,
        },
        _ => None,
    }
}
