//! Transformer registry: the bidirectional rules between markdown syntax
//! and node types.
//!
//! Each syntax owns its delimiters and patterns here; the bridge only
//! drives them in registration order.

pub mod block;
pub mod escape;
pub mod inline;

use std::sync::LazyLock;

use regex::Captures;

use crate::model::{Fragment, NodeType};
use crate::parsing::{IndentStyle, LineRef};

pub use block::{BlockTransformer, ElementTransformer, MultilineElementTransformer};
pub use inline::{Piece, Replacement, Shadow, TextMatchTransformer, Trigger};

static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::standard);

/// The process-wide registry. Immutable once built.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

/// Ordered transformer lists. Order is precedence: the first transformer
/// that matches wins.
pub struct Registry {
    pub blocks: Vec<BlockTransformer>,
    pub text_matches: Vec<TextMatchTransformer>,
}

impl Registry {
    pub fn standard() -> Self {
        Self {
            blocks: block::standard(),
            text_matches: inline::standard(),
        }
    }

    /// Whether `line` would be read as the start of a non-paragraph block.
    pub fn line_starts_block(&self, line: &str) -> bool {
        self.blocks.iter().any(|t| match t {
            BlockTransformer::Element(e) => e.regex.is_match(line),
            BlockTransformer::Multiline(m) => (m.starts)(line),
        })
    }

    pub fn block(&self, name: &str) -> Option<&BlockTransformer> {
        self.blocks.iter().find(|t| t.name() == name)
    }

    pub fn text_match(&self, name: &str) -> Option<&TextMatchTransformer> {
        self.text_matches.iter().find(|t| t.name == name)
    }

    /// Names of the transformers that export `node_type`.
    pub fn exporters_of(&self, node_type: NodeType) -> Vec<&'static str> {
        let blocks = self
            .blocks
            .iter()
            .filter(|t| t.exports().contains(&node_type))
            .map(|t| t.name());
        let inline = self
            .text_matches
            .iter()
            .filter(|t| t.exports.contains(&node_type))
            .map(|t| t.name);
        blocks.chain(inline).collect()
    }
}

/// What a block transformer sees while importing.
pub struct ImportContext<'r> {
    pub registry: &'r Registry,
    pub indent: IndentStyle,
}

impl ImportContext<'_> {
    /// Runs the inline scan over block content.
    pub fn inline(&self, text: &str) -> Vec<Fragment> {
        crate::bridge::scan::scan_inline(self.registry, text)
    }
}

/// A block recognized at some line, covering `consumed` lines.
pub struct BlockMatch {
    pub consumed: usize,
    pub fragment: Fragment,
}

impl BlockTransformer {
    pub fn name(&self) -> &'static str {
        match self {
            BlockTransformer::Element(e) => e.name,
            BlockTransformer::Multiline(m) => m.name,
        }
    }

    pub fn exports(&self) -> &'static [NodeType] {
        match self {
            BlockTransformer::Element(e) => e.exports,
            BlockTransformer::Multiline(m) => m.exports,
        }
    }

    /// Attempts this transformer at `lines[at]`.
    pub fn import(&self, lines: &[LineRef<'_>], at: usize, ctx: &ImportContext<'_>) -> Option<BlockMatch> {
        match self {
            BlockTransformer::Element(e) => {
                let first = e.regex.captures(lines.get(at)?.text)?;
                let mut caps: Vec<Captures<'_>> = vec![first];
                if e.groups_lines {
                    caps.extend(
                        lines[at + 1..]
                            .iter()
                            .map_while(|l| e.regex.captures(l.text)),
                    );
                }
                let consumed = caps.len();
                (e.build)(&caps, ctx).map(|fragment| BlockMatch { consumed, fragment })
            }
            BlockTransformer::Multiline(m) => (m.import)(lines, at, ctx),
        }
    }
}
