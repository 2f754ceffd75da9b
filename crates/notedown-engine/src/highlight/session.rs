use log::debug;

use super::{
    Anchored, HighlightError, HighlightOptions, HighlightRecord, HighlightStore, HighlightSurface, NewHighlight,
    RenderedText, TextPoint, anchor,
};

/// A selection over rendered text, in either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSelection {
    pub anchor: TextPoint,
    pub focus: TextPoint,
}

impl TextSelection {
    pub fn new(anchor: TextPoint, focus: TextPoint) -> Self {
        Self { anchor, focus }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn text(&self, texts: &RenderedText) -> Option<String> {
        let a = texts.index_of(self.anchor)?;
        let b = texts.index_of(self.focus)?;
        Some(texts.slice(a.min(b)..a.max(b)))
    }

    /// Full text of the block the selection starts in.
    pub fn context(&self, texts: &RenderedText) -> Option<String> {
        let a = texts.index_of(self.anchor)?;
        let b = texts.index_of(self.focus)?;
        let start = if a <= b { self.anchor } else { self.focus };
        texts.block_of(start.key).map(|block| texts.block_text(block))
    }
}

/// Highlights shown over one read-only document view.
#[derive(Debug, Clone)]
pub struct HighlightSession {
    records: Vec<HighlightRecord>,
    viewer: Option<String>,
    options: HighlightOptions,
    anchored: Vec<Anchored>,
}

impl HighlightSession {
    pub fn new(records: Vec<HighlightRecord>, viewer: Option<String>, options: HighlightOptions) -> Self {
        Self {
            records,
            viewer,
            options,
            anchored: Vec::new(),
        }
    }

    pub fn records(&self) -> &[HighlightRecord] {
        &self.records
    }

    /// Result of the last [`anchor`](Self::anchor) or paint.
    pub fn anchored(&self) -> &[Anchored] {
        &self.anchored
    }

    pub fn anchor(&mut self, texts: &RenderedText) -> &[Anchored] {
        self.anchored = anchor(&self.records, texts, &self.options);
        &self.anchored
    }

    pub fn paint(&mut self, texts: &RenderedText, surface: &mut impl HighlightSurface) {
        self.anchor(texts);
        surface.set_highlights(&self.anchored);
    }

    /// The painted highlight under a point, if any.
    pub fn hit_test(&self, surface: &impl HighlightSurface, x: f32, y: f32) -> Option<&HighlightRecord> {
        let hit = self.anchored.iter().find(|a| {
            surface
                .client_rects(&a.range)
                .iter()
                .any(|r| r.contains(x, y))
        })?;
        self.records.iter().find(|r| r.id == hit.id)
    }

    pub fn can_delete(&self, record: &HighlightRecord) -> bool {
        self.viewer.as_deref() == Some(record.author.as_str())
    }

    pub fn can_create(
        &self,
        selection: &TextSelection,
        texts: &RenderedText,
        read_only: bool,
        source: Option<&str>,
    ) -> bool {
        self.draft(selection, texts, read_only, source).is_some()
    }

    /// What would be published for `selection`, when it qualifies.
    pub fn draft(
        &self,
        selection: &TextSelection,
        texts: &RenderedText,
        read_only: bool,
        source: Option<&str>,
    ) -> Option<NewHighlight> {
        let source = source.filter(|s| !s.trim().is_empty())?;
        if !read_only || selection.is_collapsed() || self.viewer.is_none() {
            return None;
        }
        let content = selection.text(texts)?;
        if content.trim().chars().count() < self.options.min_length {
            return None;
        }
        Some(NewHighlight {
            context: selection.context(texts),
            content,
            source: source.to_string(),
        })
    }

    /// Publishes `draft` and appends the stored record locally.
    pub async fn create(
        &mut self,
        store: &impl HighlightStore,
        draft: NewHighlight,
    ) -> Result<&HighlightRecord, HighlightError> {
        if draft.content.trim().chars().count() < self.options.min_length {
            return Err(HighlightError::InvalidSelection);
        }
        let record = store.create(draft).await?;
        debug!("created highlight {}", record.id);
        self.records.push(record);
        self.records.last().ok_or(HighlightError::InvalidSelection)
    }

    /// Deletes one of the viewer's own highlights and repaints.
    pub async fn delete(
        &mut self,
        store: &impl HighlightStore,
        id: &str,
        texts: &RenderedText,
        surface: &mut impl HighlightSurface,
    ) -> Result<(), HighlightError> {
        let record = self
            .records
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| HighlightError::NotFound(id.to_string()))?;
        if !self.can_delete(record) {
            return Err(HighlightError::NotAuthor(id.to_string()));
        }
        store.delete(id).await?;
        self.records.retain(|r| r.id != id);
        self.paint(texts, surface);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::tests::record;
    use crate::highlight::{Rect, StoreError, TextRange};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    /// One row per text node, one column per character.
    #[derive(Default)]
    struct GridSurface {
        rows: Vec<crate::model::NodeKey>,
        painted: Vec<Anchored>,
    }

    impl HighlightSurface for GridSurface {
        fn set_highlights(&mut self, highlights: &[Anchored]) {
            self.painted = highlights.to_vec();
        }

        fn client_rects(&self, range: &TextRange) -> Vec<Rect> {
            let row = |k| self.rows.iter().position(|r| *r == k).unwrap_or(0) as f32;
            let (start, end) = (range.start, range.end);
            if start.key == end.key {
                return vec![Rect {
                    x: start.offset as f32,
                    y: row(start.key),
                    width: (end.offset - start.offset) as f32,
                    height: 1.0,
                }];
            }
            vec![
                Rect {
                    x: start.offset as f32,
                    y: row(start.key),
                    width: 100.0,
                    height: 1.0,
                },
                Rect {
                    x: 0.0,
                    y: row(end.key),
                    width: end.offset as f32,
                    height: 1.0,
                },
            ]
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        deleted: RefCell<Vec<String>>,
        fail: bool,
    }

    impl HighlightStore for MemoryStore {
        async fn create(&self, draft: NewHighlight) -> Result<HighlightRecord, StoreError> {
            if self.fail {
                return Err(StoreError::Unavailable("offline".into()));
            }
            Ok(HighlightRecord::from_draft(draft, "me"))
        }

        async fn delete(&self, id: &str) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::Unavailable("offline".into()));
            }
            self.deleted.borrow_mut().push(id.to_string());
            Ok(())
        }
    }

    fn setup() -> (RenderedText, GridSurface) {
        let texts = RenderedText::from_strings(&["The quick ", "brown fox"]);
        let surface = GridSurface {
            rows: texts.keys(),
            ..GridSurface::default()
        };
        (texts, surface)
    }

    #[test]
    fn paint_and_hit_test() {
        let (texts, mut surface) = setup();
        let mut session = HighlightSession::new(
            vec![record("h1", "quick brown", "me"), record("h2", "missing", "me")],
            Some("me".into()),
            HighlightOptions::default(),
        );
        session.paint(&texts, &mut surface);
        assert_eq!(surface.painted.len(), 1);
        assert_eq!(session.hit_test(&surface, 1.0, 1.0).map(|r| r.id.as_str()), Some("h1"));
        assert_eq!(session.hit_test(&surface, 8.0, 1.0), None);
    }

    #[test]
    fn selection_text_and_context() {
        let (texts, _) = setup();
        let keys = texts.keys();
        let sel = TextSelection::new(
            TextPoint { key: keys[1], offset: 5 },
            TextPoint { key: keys[0], offset: 4 },
        );
        assert_eq!(sel.text(&texts).as_deref(), Some("quick brown"));
        assert_eq!(sel.context(&texts).as_deref(), Some("The quick brown fox"));
    }

    #[test]
    fn create_affordance_rules() {
        let (texts, _) = setup();
        let keys = texts.keys();
        let session = HighlightSession::new(Vec::new(), Some("me".into()), HighlightOptions::default());
        let wide = TextSelection::new(TextPoint { key: keys[0], offset: 0 }, TextPoint { key: keys[0], offset: 3 });
        let short = TextSelection::new(TextPoint { key: keys[0], offset: 0 }, TextPoint { key: keys[0], offset: 2 });
        assert!(session.can_create(&wide, &texts, true, Some("note-1")));
        assert!(!session.can_create(&wide, &texts, false, Some("note-1")));
        assert!(!session.can_create(&wide, &texts, true, None));
        assert!(!session.can_create(&short, &texts, true, Some("note-1")));
        let anonymous = HighlightSession::new(Vec::new(), None, HighlightOptions::default());
        assert!(!anonymous.can_create(&wide, &texts, true, Some("note-1")));
    }

    #[tokio::test]
    async fn create_appends_locally() {
        let (texts, mut surface) = setup();
        let keys = texts.keys();
        let mut session = HighlightSession::new(Vec::new(), Some("me".into()), HighlightOptions::default());
        let sel = TextSelection::new(TextPoint { key: keys[1], offset: 0 }, TextPoint { key: keys[1], offset: 5 });
        let draft = session.draft(&sel, &texts, true, Some("note-1")).unwrap();
        let store = MemoryStore::default();
        let created = session.create(&store, draft).await.unwrap();
        assert_eq!(created.content, "brown");
        assert_eq!(created.source.as_deref(), Some("note-1"));
        session.paint(&texts, &mut surface);
        assert_eq!(surface.painted.len(), 1);
    }

    #[tokio::test]
    async fn delete_requires_authorship() {
        let (texts, mut surface) = setup();
        let store = MemoryStore::default();
        let mut session = HighlightSession::new(
            vec![record("mine", "quick", "me"), record("theirs", "fox", "them")],
            Some("me".into()),
            HighlightOptions::default(),
        );
        session.paint(&texts, &mut surface);
        assert_eq!(surface.painted.len(), 2);

        assert_eq!(
            session.delete(&store, "theirs", &texts, &mut surface).await,
            Err(HighlightError::NotAuthor("theirs".into()))
        );
        assert_eq!(
            session.delete(&store, "nope", &texts, &mut surface).await,
            Err(HighlightError::NotFound("nope".into()))
        );
        session.delete(&store, "mine", &texts, &mut surface).await.unwrap();
        assert_eq!(*store.deleted.borrow(), vec!["mine".to_string()]);
        assert_eq!(surface.painted.len(), 1);
        assert_eq!(session.records().len(), 1);
    }

    #[tokio::test]
    async fn store_failures_surface_as_errors() {
        let (texts, mut surface) = setup();
        let store = MemoryStore {
            fail: true,
            ..MemoryStore::default()
        };
        let mut session = HighlightSession::new(vec![record("mine", "quick", "me")], Some("me".into()), HighlightOptions::default());
        let err = session.delete(&store, "mine", &texts, &mut surface).await;
        assert!(matches!(err, Err(HighlightError::Store(StoreError::Unavailable(_)))));
        assert_eq!(session.records().len(), 1);
    }
}
