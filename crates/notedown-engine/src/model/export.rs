use serde::Deserialize;

use super::{Document, NodeKey, NodeKind, TextFormat};
use crate::parsing::CodeFence;
use crate::transform::escape;

/// Knobs for markdown rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Spaces per list indent level.
    pub list_indent: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { list_indent: 2 }
    }
}

/// Markdown for one node and its subtree.
///
/// Total: a detached key or a node in a position it cannot render from
/// yields the empty string.
pub fn export_markdown_fragment(doc: &Document, key: NodeKey, opts: &ExportOptions) -> String {
    let Some(kind) = doc.kind(key) else {
        return String::new();
    };
    match kind {
        NodeKind::Paragraph => escape::escape_block_starts(&export_inline_children(doc, key)),
        NodeKind::Heading { level } => {
            let hashes = "#".repeat(usize::from((*level).clamp(1, 6)));
            let inline = single_line(&export_inline_children(doc, key));
            if inline.is_empty() {
                hashes
            } else {
                format!("{hashes} {inline}")
            }
        }
        NodeKind::List { ordered } => export_list(doc, key, *ordered, opts),
        NodeKind::ListItem { indent } => list_item_line(doc, key, *indent, "-", opts),
        NodeKind::Quote => {
            let inline = export_inline_children(doc, key);
            inline
                .split('\n')
                .map(|line| {
                    if line.is_empty() {
                        ">".to_string()
                    } else {
                        format!("> {line}")
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        NodeKind::HorizontalRule => "---".to_string(),
        NodeKind::CodeBlock { language, code } => {
            let fence = CodeFence::backticks_for(code);
            format!("{fence}{}\n{code}\n{fence}", language.as_deref().unwrap_or(""))
        }
        NodeKind::Table => export_table(doc, key),
        NodeKind::TableRow => table_row_line(doc, key),
        NodeKind::TableCell { .. } => table_cell_text(doc, key),
        leaf => export_leaf(leaf),
    }
}

/// Inline markdown of an inline holder's children, merging adjacent runs
/// that share a format.
pub fn export_inline_children(doc: &Document, key: NodeKey) -> String {
    let children = doc.children(key);
    let mut out = String::new();
    let mut i = 0;
    while i < children.len() {
        match doc.kind(children[i]) {
            Some(NodeKind::Text { text, format }) => {
                let mut merged = text.clone();
                let mut j = i + 1;
                while let Some(NodeKind::Text { text: t, format: f }) =
                    children.get(j).and_then(|k| doc.kind(*k))
                {
                    if f != format {
                        break;
                    }
                    merged.push_str(t);
                    j += 1;
                }
                let before_link = matches!(
                    children.get(j).and_then(|k| doc.kind(*k)),
                    Some(NodeKind::Link { .. })
                );
                let run = wrap_run(&merged, *format, out.chars().last(), before_link);
                out.push_str(&run);
                i = j;
            }
            Some(other) => {
                let leaf = export_leaf(other);
                let flush = out.chars().last().is_some_and(|c| !c.is_whitespace())
                    || !followed_by_space(doc, &children[i + 1..]);
                if is_bare(other) && flush {
                    out.push_str(&format!("<{leaf}>"));
                } else {
                    out.push_str(&leaf);
                }
                i += 1;
            }
            None => i += 1,
        }
    }
    out
}

/// Leaves written without delimiters, which would absorb touching text.
fn is_bare(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Audio { .. } | NodeKind::YouTube { .. } | NodeKind::Entity { .. }
    )
}

/// Whether what follows starts with whitespace or ends the holder.
fn followed_by_space(doc: &Document, rest: &[NodeKey]) -> bool {
    for key in rest {
        match doc.kind(*key) {
            Some(NodeKind::Text { text, .. }) => match text.chars().next() {
                Some(c) => return c.is_whitespace(),
                None => continue,
            },
            Some(NodeKind::CollapseMarker) | None => continue,
            Some(_) => return false,
        }
    }
    true
}

fn export_leaf(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Text { text, format } => wrap_run(text, *format, None, false),
        NodeKind::Link { url, text } => {
            format!("[{}]({})", escape::escape_text(text, false), escape::encode_url(url))
        }
        NodeKind::Image { url, alt } => {
            format!("![{}]({})", escape::escape_text(alt, false), escape::encode_url(url))
        }
        NodeKind::Audio { url } => escape::encode_url(url),
        NodeKind::YouTube { video_id } => format!("https://www.youtube.com/watch?v={video_id}"),
        NodeKind::Entity {
            identifier,
            is_embed,
            ..
        } => {
            if *is_embed {
                format!("nostr:{identifier}")
            } else {
                identifier.clone()
            }
        }
        NodeKind::CollapseMarker => String::new(),
        _ => String::new(),
    }
}

/// Wraps one run in its format delimiters, keeping surrounding whitespace
/// outside them.
fn wrap_run(text: &str, format: TextFormat, prev: Option<char>, before_link: bool) -> String {
    if format.is_plain() || text.trim().is_empty() {
        return escape::escape_text(text, before_link);
    }
    let core = text.trim();
    let lead = &text[..text.len() - text.trim_start().len()];
    let trail = &text[text.trim_end().len()..];

    let mut body = if format.code {
        format!("`{core}`")
    } else {
        escape::escape_text(core, false)
    };
    if format.strikethrough {
        body = format!("~~{body}~~");
    }
    if format.italic {
        let before = if lead.is_empty() { prev } else { lead.chars().last() };
        let delim = if escape::underscore_may_open_after(before) {
            '_'
        } else {
            '*'
        };
        body = format!("{delim}{body}{delim}");
    }
    if format.bold {
        body = format!("**{body}**");
    }
    format!(
        "{}{body}{}",
        escape::escape_text(lead, false),
        escape::escape_text(trail, false)
    )
}

fn single_line(s: &str) -> String {
    s.replace('\n', " ")
}

fn export_list(doc: &Document, key: NodeKey, ordered: bool, opts: &ExportOptions) -> String {
    let mut counters: Vec<usize> = Vec::new();
    let mut lines = Vec::new();
    for &item in doc.children(key) {
        let Some(NodeKind::ListItem { indent }) = doc.kind(item) else {
            continue;
        };
        let depth = usize::from(*indent);
        counters.truncate(depth + 1);
        counters.resize(depth + 1, 0);
        counters[depth] += 1;
        let marker = if ordered {
            format!("{}.", counters[depth])
        } else {
            "-".to_string()
        };
        lines.push(list_item_line(doc, item, *indent, &marker, opts));
    }
    lines.join("\n")
}

fn list_item_line(doc: &Document, key: NodeKey, indent: u8, marker: &str, opts: &ExportOptions) -> String {
    let pad = " ".repeat(usize::from(indent) * opts.list_indent);
    let inline = escape::escape_block_starts(&single_line(&export_inline_children(doc, key)));
    if inline.is_empty() {
        format!("{pad}{marker}")
    } else {
        format!("{pad}{marker} {inline}")
    }
}

fn export_table(doc: &Document, key: NodeKey) -> String {
    let rows: Vec<NodeKey> = doc
        .children(key)
        .iter()
        .copied()
        .filter(|r| matches!(doc.kind(*r), Some(NodeKind::TableRow)))
        .collect();
    let Some(first) = rows.first() else {
        return String::new();
    };
    let width = doc.children(*first).len().max(1);
    let mut lines = vec![table_row_line(doc, *first)];
    lines.push(format!("|{}", " --- |".repeat(width)));
    lines.extend(rows[1..].iter().map(|r| table_row_line(doc, *r)));
    lines.join("\n")
}

fn table_row_line(doc: &Document, key: NodeKey) -> String {
    let cells: Vec<String> = doc
        .children(key)
        .iter()
        .map(|c| table_cell_text(doc, *c))
        .collect();
    if cells.is_empty() {
        return "|  |".to_string();
    }
    format!("| {} |", cells.join(" | "))
}

fn table_cell_text(doc: &Document, key: NodeKey) -> String {
    match doc.kind(key) {
        Some(NodeKind::TableCell { .. }) => single_line(&export_inline_children(doc, key))
            .trim()
            .to_string(),
        _ => String::new(),
    }
}
