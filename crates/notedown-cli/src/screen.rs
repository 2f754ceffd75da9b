use std::collections::{HashMap, HashSet};

use notedown_engine::NodeKey;
use notedown_engine::NodeType;
use notedown_engine::editing::Snapshot;
use notedown_engine::highlight::{Anchored, HighlightSurface, Rect, TextRange};

/// A rendered line of the content pane.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenLine {
    pub block: Option<NodeKey>,
    pub text: String,
}

impl ScreenLine {
    fn new(block: NodeKey, prefix: &str) -> Self {
        Self {
            block: Some(block),
            text: prefix.to_string(),
        }
    }

    fn blank() -> Self {
        Self {
            block: None,
            text: String::new(),
        }
    }

    fn width(&self) -> usize {
        self.text.chars().count()
    }
}

/// Character grid laid out from a snapshot, with a cell position for every
/// visible text character so highlight ranges can be painted onto it.
#[derive(Debug, Default)]
pub struct Screen {
    pub lines: Vec<ScreenLine>,
    positions: HashMap<NodeKey, Vec<(usize, usize)>>,
    order: Vec<NodeKey>,
    marked: HashSet<(usize, usize)>,
}

fn prefix(node_type: NodeType, depth: u8) -> String {
    match node_type {
        NodeType::Heading => format!("{} ", "#".repeat(depth as usize)),
        NodeType::Quote => "> ".into(),
        NodeType::List => "• ".into(),
        NodeType::CodeBlock => "    ".into(),
        _ => String::new(),
    }
}

impl Screen {
    pub fn build(snapshot: &Snapshot) -> Self {
        let mut screen = Screen::default();
        for block in snapshot.blocks.iter().filter(|b| !b.hidden) {
            if block.node_type == NodeType::HorizontalRule {
                screen.lines.push(ScreenLine {
                    block: Some(block.key),
                    text: "─".repeat(20),
                });
                screen.lines.push(ScreenLine::blank());
                continue;
            }
            let lead = prefix(block.node_type, block.depth);
            let mut line = ScreenLine::new(block.key, &lead);
            let mut holder = None;
            for seg in &block.segments {
                if holder.is_some_and(|h| h != seg.holder) {
                    screen.lines.push(std::mem::replace(&mut line, ScreenLine::new(block.key, &lead)));
                }
                holder = Some(seg.holder);
                if let Some(label) = &seg.embed_label {
                    line.text.push_str(&format!("[{label}]"));
                    continue;
                }
                let mut cells = Vec::with_capacity(seg.text.len());
                for c in seg.text.chars() {
                    cells.push((screen.lines.len(), line.width()));
                    if c == '\n' {
                        screen.lines.push(std::mem::replace(&mut line, ScreenLine::new(block.key, &lead)));
                    } else {
                        line.text.push(c);
                    }
                }
                screen.positions.insert(seg.key, cells);
                screen.order.push(seg.key);
            }
            if block.collapsed {
                line.text.push_str(" …");
            }
            screen.lines.push(line);
            screen.lines.push(ScreenLine::blank());
        }
        screen
    }

    /// First line of `block`, if it is on screen.
    pub fn row_of(&self, block: NodeKey) -> Option<usize> {
        self.lines.iter().position(|l| l.block == Some(block))
    }

    pub fn is_marked(&self, row: usize, col: usize) -> bool {
        self.marked.contains(&(row, col))
    }

    fn cells(&self, range: &TextRange) -> Vec<(usize, usize)> {
        let Some(first) = self.order.iter().position(|k| *k == range.start.key) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for key in &self.order[first..] {
            let Some(chars) = self.positions.get(key) else {
                continue;
            };
            let from = if *key == range.start.key { range.start.offset } else { 0 };
            let to = if *key == range.end.key { range.end.offset } else { chars.len() };
            out.extend(chars.iter().take(to).skip(from).copied());
            if *key == range.end.key {
                break;
            }
        }
        out
    }
}

impl HighlightSurface for Screen {
    fn set_highlights(&mut self, highlights: &[Anchored]) {
        let marked = highlights.iter().flat_map(|a| self.cells(&a.range)).collect();
        self.marked = marked;
    }

    /// One rectangle per run of consecutive cells on a row.
    fn client_rects(&self, range: &TextRange) -> Vec<Rect> {
        let mut rects: Vec<Rect> = Vec::new();
        for (row, col) in self.cells(range) {
            let (x, y) = (col as f32, row as f32);
            match rects.last_mut() {
                Some(r) if r.y == y && r.x + r.width == x => r.width += 1.0,
                _ => rects.push(Rect {
                    x,
                    y,
                    width: 1.0,
                    height: 1.0,
                }),
            }
        }
        rects
    }
}
