use std::sync::LazyLock;

use regex::Regex;

static INDENTED_LIST_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([ \t]+)(?:[-*+]|\d{1,9}[.)])(?:[ \t]|$)").unwrap());

/// How list nesting is written in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentStyle {
    Spaces(usize),
    Tabs,
}

impl Default for IndentStyle {
    fn default() -> Self {
        IndentStyle::Spaces(2)
    }
}

impl IndentStyle {
    /// Convert an indentation string to depth level
    pub fn calculate_depth(&self, indent_str: &str) -> usize {
        match self {
            IndentStyle::Tabs => indent_str.chars().take_while(|&c| c == '\t').count(),
            IndentStyle::Spaces(spaces_per_level) => {
                let space_count = indent_str.chars().take_while(|&c| c == ' ').count();
                space_count / (*spaces_per_level).max(1)
            }
        }
    }
}

/// Detect the indent style from the first indented list line.
pub fn detect_indent_style(text: &str) -> IndentStyle {
    for line in text.lines() {
        let Some(caps) = INDENTED_LIST_LINE.captures(line) else {
            continue;
        };
        let indent = &caps[1];
        if indent.starts_with('\t') {
            return IndentStyle::Tabs;
        }
        let spaces = indent.chars().take_while(|&c| c == ' ').count();
        if spaces > 0 {
            return IndentStyle::Spaces(spaces);
        }
    }
    IndentStyle::default()
}
