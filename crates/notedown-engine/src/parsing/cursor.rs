/// A cursor for character-by-character inline scanning.
///
/// Positions are byte offsets into `s`, always on a char boundary.
#[derive(Clone)]
pub struct Cursor<'a> {
    /// The string being scanned.
    pub s: &'a str,
    /// Current byte index into `s`.
    pub i: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    /// Peeks at the current char without advancing.
    pub fn peek(&self) -> Option<char> {
        self.s.get(self.i..)?.chars().next()
    }

    /// Peeks at the char after the current one.
    pub fn peek_next(&self) -> Option<char> {
        let mut chars = self.s.get(self.i..)?.chars();
        chars.next();
        chars.next()
    }

    /// Advances by one char, returning it.
    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.i += c.len_utf8();
        Some(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peeks_do_not_advance() {
        let mut cur = Cursor::new("nostr:");
        assert_eq!((cur.peek(), cur.peek_next()), (Some('n'), Some('o')));
        assert_eq!(cur.i, 0);
        cur.bump();
        assert_eq!(cur.peek(), Some('o'));
    }

    #[test]
    fn bump_steps_whole_chars() {
        let mut cur = Cursor::new("ü…z");
        cur.bump();
        cur.bump();
        assert_eq!(cur.i, "ü…".len());
        assert_eq!(cur.bump(), Some('z'));
        assert_eq!(cur.i, "ü…z".len());
        assert_eq!(cur.bump(), None);
    }
}
