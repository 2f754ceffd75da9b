//! Line and character level scanning primitives shared by the block and
//! inline importers.

pub mod cursor;
pub mod fence;
pub mod indent;
pub mod lines;

pub use cursor::Cursor;
pub use fence::{CodeFence, Fence, FenceKind};
pub use indent::{IndentStyle, detect_indent_style};
pub use lines::{LineRef, Span, lines_with_spans};
