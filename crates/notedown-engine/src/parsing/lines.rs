/// A byte range `[start, end)` into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }
}

/// A reference to a single line of the source with its byte span.
#[derive(Debug, Clone, Copy)]
pub struct LineRef<'a> {
    /// Byte span of the line, excluding its terminator.
    pub span: Span,
    /// The line text without `\n` or a trailing `\r`.
    pub text: &'a str,
}

impl LineRef<'_> {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Splits `text` into lines. Every `\n` ends a line, so a trailing newline
/// produces a final empty line; the empty string produces none.
pub fn lines_with_spans(text: &str) -> Vec<LineRef<'_>> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut offset = 0usize;
    text.split('\n')
        .map(|raw| {
            let start = offset;
            offset += raw.len() + 1;
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            LineRef {
                span: Span {
                    start,
                    end: start + line.len(),
                },
                text: line,
            }
        })
        .collect()
}
