use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{BlockMatch, ImportContext};
use crate::model::{Fragment, NodeKind, NodeType};
use crate::parsing::{CodeFence, LineRef};

/// Whole-line rule. With `groups_lines`, a run of consecutive matching
/// lines becomes a single block.
pub struct ElementTransformer {
    pub name: &'static str,
    pub regex: &'static Regex,
    pub exports: &'static [NodeType],
    pub groups_lines: bool,
    pub build: fn(&[Captures<'_>], &ImportContext<'_>) -> Option<Fragment>,
}

/// Rule for a block delimited across several lines.
pub struct MultilineElementTransformer {
    pub name: &'static str,
    pub exports: &'static [NodeType],
    pub starts: fn(&str) -> bool,
    pub import: fn(&[LineRef<'_>], usize, &ImportContext<'_>) -> Option<BlockMatch>,
}

pub enum BlockTransformer {
    Element(ElementTransformer),
    Multiline(MultilineElementTransformer),
}

static HR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(?:(?:-[ \t]*){3,}|(?:\*[ \t]*){3,}|(?:_[ \t]*){3,})$").unwrap());
static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ {0,3}(#{1,6})(?:[ \t](.*))?$").unwrap());
static QUOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ {0,3}>[ \t]?(.*)$").unwrap());
static UNORDERED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([ \t]*)[-*+](?:[ \t](.*))?$").unwrap());
static ORDERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([ \t]*)(\d{1,9})[.)](?:[ \t](.*))?$").unwrap());
static TABLE_ROW: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[ \t]*\|").unwrap());
static TABLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*\|?(?:[ \t]*:?-+:?[ \t]*\|)+(?:[ \t]*:?-+:?[ \t]*)?$").unwrap());

pub(crate) fn standard() -> Vec<BlockTransformer> {
    vec![
        BlockTransformer::Multiline(MultilineElementTransformer {
            name: "code_fence",
            exports: &[NodeType::CodeBlock],
            starts: |line| CodeFence::open(line).is_some(),
            import: import_code_fence,
        }),
        BlockTransformer::Multiline(MultilineElementTransformer {
            name: "table",
            exports: &[NodeType::Table, NodeType::TableRow, NodeType::TableCell],
            starts: |line| TABLE_ROW.is_match(line),
            import: import_table,
        }),
        BlockTransformer::Element(ElementTransformer {
            name: "horizontal_rule",
            regex: &HR,
            exports: &[NodeType::HorizontalRule],
            groups_lines: false,
            build: |_, _| Some(Fragment::new(NodeKind::HorizontalRule)),
        }),
        BlockTransformer::Element(ElementTransformer {
            name: "heading",
            regex: &HEADING,
            exports: &[NodeType::Heading],
            groups_lines: false,
            build: build_heading,
        }),
        BlockTransformer::Element(ElementTransformer {
            name: "quote",
            regex: &QUOTE,
            exports: &[NodeType::Quote],
            groups_lines: true,
            build: build_quote,
        }),
        BlockTransformer::Element(ElementTransformer {
            name: "unordered_list",
            regex: &UNORDERED,
            exports: &[NodeType::List, NodeType::ListItem],
            groups_lines: true,
            build: |caps, ctx| build_list(caps, ctx, false),
        }),
        BlockTransformer::Element(ElementTransformer {
            name: "ordered_list",
            regex: &ORDERED,
            exports: &[NodeType::List, NodeType::ListItem],
            groups_lines: true,
            build: |caps, ctx| build_list(caps, ctx, true),
        }),
    ]
}

fn group<'t>(caps: &Captures<'t>, i: usize) -> &'t str {
    caps.get(i).map_or("", |m| m.as_str())
}

fn build_heading(caps: &[Captures<'_>], ctx: &ImportContext<'_>) -> Option<Fragment> {
    let first = caps.first()?;
    let level = u8::try_from(group(first, 1).len()).ok()?;
    Some(Fragment::heading(level, ctx.inline(group(first, 2))))
}

fn build_quote(caps: &[Captures<'_>], ctx: &ImportContext<'_>) -> Option<Fragment> {
    let text = caps.iter().map(|c| group(c, 1)).collect::<Vec<_>>().join("\n");
    Some(Fragment::with_children(NodeKind::Quote, ctx.inline(&text)))
}

fn build_list(caps: &[Captures<'_>], ctx: &ImportContext<'_>, ordered: bool) -> Option<Fragment> {
    let text_group = if ordered { 3 } else { 2 };
    let items = caps
        .iter()
        .map(|c| {
            let depth = ctx.indent.calculate_depth(group(c, 1));
            let indent = u8::try_from(depth).unwrap_or(u8::MAX);
            Fragment::with_children(
                NodeKind::ListItem { indent },
                ctx.inline(group(c, text_group)),
            )
        })
        .collect();
    Some(Fragment::with_children(NodeKind::List { ordered }, items))
}

fn import_code_fence(lines: &[LineRef<'_>], at: usize, _ctx: &ImportContext<'_>) -> Option<BlockMatch> {
    let (fence, info) = CodeFence::open(lines.get(at)?.text)?;
    let body = &lines[at + 1..];
    let close = body.iter().position(|l| CodeFence::closes(fence, l.text));
    // An unterminated fence runs to the end of the document.
    let (code_lines, consumed) = match close {
        Some(i) => (&body[..i], i + 2),
        None => (body, body.len() + 1),
    };
    let code = code_lines.iter().map(|l| l.text).collect::<Vec<_>>().join("\n");
    let language = (!info.is_empty()).then(|| info.to_string());
    Some(BlockMatch {
        consumed,
        fragment: Fragment::new(NodeKind::CodeBlock { language, code }),
    })
}

fn import_table(lines: &[LineRef<'_>], at: usize, ctx: &ImportContext<'_>) -> Option<BlockMatch> {
    let header = lines.get(at)?;
    let separator = lines.get(at + 1)?;
    if !TABLE_ROW.is_match(header.text) || !TABLE_SEPARATOR.is_match(separator.text) {
        return None;
    }
    let body: Vec<&LineRef<'_>> = lines[at + 2..]
        .iter()
        .take_while(|l| TABLE_ROW.is_match(l.text))
        .collect();

    let row = |line: &str, is_header: bool| {
        let cells = split_cells(line)
            .into_iter()
            .map(|cell| {
                Fragment::with_children(
                    NodeKind::TableCell {
                        header: is_header,
                        col_span: 1,
                        row_span: 1,
                    },
                    ctx.inline(cell.trim()),
                )
            })
            .collect();
        Fragment::with_children(NodeKind::TableRow, cells)
    };

    let mut rows = vec![row(header.text, true)];
    rows.extend(body.iter().map(|l| row(l.text, false)));
    Some(BlockMatch {
        consumed: 2 + body.len(),
        fragment: Fragment::with_children(NodeKind::Table, rows),
    })
}

/// Splits a pipe row into raw cell strings. Escaped pipes stay escaped so
/// the inline scan turns them into literal `|`.
fn split_cells(line: &str) -> Vec<String> {
    let t = line.trim();
    let t = t.strip_prefix('|').unwrap_or(t);
    let mut cells = vec![String::new()];
    let mut chars = t.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let cell = cells.last_mut();
                if let Some(cell) = cell {
                    cell.push(c);
                    if let Some(next) = chars.next() {
                        cell.push(next);
                    }
                }
            }
            '|' => cells.push(String::new()),
            _ => {
                if let Some(cell) = cells.last_mut() {
                    cell.push(c);
                }
            }
        }
    }
    // A closing pipe leaves one empty trailing cell behind.
    if cells.len() > 1 && cells.last().is_some_and(|c| c.trim().is_empty()) {
        cells.pop();
    }
    cells
}
