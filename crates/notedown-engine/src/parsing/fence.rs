/// Fence character family. A fence only closes with the family it opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceKind {
    Backticks,
    Tildes,
}

impl FenceKind {
    fn marker(self) -> char {
        match self {
            FenceKind::Backticks => '`',
            FenceKind::Tildes => '~',
        }
    }
}

/// An opening fence line: its family and how many marker characters it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fence {
    pub kind: FenceKind,
    pub len: usize,
}

/// Fenced code block syntax.
pub struct CodeFence;

impl CodeFence {
    const MIN_LEN: usize = 3;

    /// Recognizes an opening fence line, returning the fence and its info
    /// string (the language, possibly empty).
    pub fn open(line: &str) -> Option<(Fence, &str)> {
        let t = line.trim_start_matches(' ');
        if line.len() - t.len() > 3 {
            return None;
        }
        let kind = match t.chars().next()? {
            '`' => FenceKind::Backticks,
            '~' => FenceKind::Tildes,
            _ => return None,
        };
        let len = t.chars().take_while(|&c| c == kind.marker()).count();
        if len < Self::MIN_LEN {
            return None;
        }
        let info = t[len..].trim();
        // Backtick info strings may not contain backticks.
        if kind == FenceKind::Backticks && info.contains('`') {
            return None;
        }
        Some((Fence { kind, len }, info))
    }

    /// Whether `line` closes `fence`: same family, at least as long, nothing
    /// else on the line.
    pub fn closes(fence: Fence, line: &str) -> bool {
        let t = line.trim();
        let run = t.chars().take_while(|&c| c == fence.kind.marker()).count();
        run >= fence.len && run == t.chars().count()
    }

    /// A backtick fence longer than any backtick run that starts a line of
    /// `code`, so no line of it can close the block.
    pub fn backticks_for(code: &str) -> String {
        let longest = code
            .lines()
            .map(|l| l.trim_start().chars().take_while(|&c| c == '`').count())
            .max()
            .unwrap_or(0);
        "`".repeat(longest.max(Self::MIN_LEN - 1) + 1)
    }
}
