use crate::model::NodeKey;

/// A position in the document.
///
/// In a text run `offset` counts characters. In a node that holds inline
/// content it is a child index. On any other inline leaf `0` is before the
/// node and `1` after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub key: NodeKey,
    pub offset: usize,
}

impl Point {
    pub fn new(key: NodeKey, offset: usize) -> Self {
        Self { key, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn caret(point: Point) -> Self {
        Self {
            anchor: point,
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caret_is_collapsed() {
        let k = NodeKey::allocate();
        let sel = Selection::caret(Point::new(k, 3));
        assert!(sel.is_collapsed());
        assert_eq!((sel.anchor.key, sel.focus.key), (k, k));
        let wide = Selection {
            anchor: Point::new(k, 0),
            focus: Point::new(k, 3),
        };
        assert!(!wide.is_collapsed());
    }
}
