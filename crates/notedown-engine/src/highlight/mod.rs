//! Highlight anchoring for read-only viewing.
//!
//! Highlights arrive as plain text with no coordinates, because node keys
//! do not survive a reload. They are found again in the rendered text on
//! every paint and handed to a [`HighlightSurface`] as ranges. The document
//! itself is never touched.

mod session;
mod text;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use session::{HighlightSession, TextSelection};
pub use text::{RenderedText, TextPoint, TextRange};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightRecord {
    pub id: String,
    /// The exact text that was selected.
    pub content: String,
    /// Enclosing block text at the time of selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl HighlightRecord {
    /// A record for `draft` under a fresh random id.
    pub fn from_draft(draft: NewHighlight, author: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: draft.content,
            context: draft.context,
            author: author.into(),
            source: Some(draft.source),
        }
    }
}

/// What the publish collaborator needs to create a highlight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewHighlight {
    pub content: String,
    pub context: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store rejected the request: {0}")]
    Rejected(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HighlightError {
    #[error("no highlight with id {0}")]
    NotFound(String),
    #[error("highlight {0} belongs to someone else")]
    NotAuthor(String),
    #[error("selection cannot be highlighted")]
    InvalidSelection,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// External persistence for highlights.
pub trait HighlightStore {
    fn create(
        &self,
        draft: NewHighlight,
    ) -> impl std::future::Future<Output = Result<HighlightRecord, StoreError>>;

    fn delete(&self, id: &str) -> impl std::future::Future<Output = Result<(), StoreError>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// A located highlight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchored {
    pub id: String,
    pub range: TextRange,
}

/// The paint-only layer a renderer exposes. Registering ranges must not
/// change the document or the selection.
pub trait HighlightSurface {
    /// Replaces every painted range.
    fn set_highlights(&mut self, highlights: &[Anchored]);

    /// Screen rectangles covered by `range`.
    fn client_rects(&self, range: &TextRange) -> Vec<Rect>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightOptions {
    /// Shortest content, in characters, that is anchored or created.
    pub min_length: usize,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self { min_length: 3 }
    }
}

/// Records with distinct trimmed content, first one kept.
pub fn dedupe(records: &[HighlightRecord]) -> Vec<&HighlightRecord> {
    let mut seen = std::collections::HashSet::new();
    records
        .iter()
        .filter(|r| seen.insert(r.content.trim()))
        .collect()
}

/// Locates each distinct highlight at the first place its content occurs.
/// Highlights that are too short or not found are left out.
pub fn anchor(records: &[HighlightRecord], texts: &RenderedText, opts: &HighlightOptions) -> Vec<Anchored> {
    dedupe(records)
        .into_iter()
        .filter_map(|r| {
            let needle = r.content.trim();
            if needle.chars().count() < opts.min_length {
                log::debug!("highlight {} too short to anchor", r.id);
                return None;
            }
            let Some(range) = texts.find(needle) else {
                log::debug!("highlight {} not found in rendered text", r.id);
                return None;
            };
            Some(Anchored {
                id: r.id.clone(),
                range,
            })
        })
        .collect()
}
