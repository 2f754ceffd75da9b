//! Editing session.
//!
//! [`Editor`] owns the committed [`Document`] and is the only way to change
//! it. Every change runs through [`Editor::update`] against a working copy
//! that keeps node keys; the copy either replaces the document as a whole or
//! is dropped. After each commit the editor diffs old against new, prunes
//! and refills its per-node side tables (collapse state, embed cache) and
//! tells registered listeners what happened to the node types they watch.

mod history;
mod input;
mod message;
mod mutation;
mod selection;
mod snapshot;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::bridge::{self, RAW_LANGUAGE};
use crate::embed::{EmbedOptions, EmbedState};
use crate::error::EngineError;
use crate::model::{Document, ExportOptions, Fragment, NodeKey, NodeType};
use crate::outline::{self, Outline, OutlineEntry};
use crate::transform::registry;

use history::{Entry, History};
use mutation::Listeners;

pub use message::{EditorHandle, EditorMessage};
pub use mutation::{ListenerId, Mutation, MutationKind, diff};
pub use selection::{Point, Selection};
pub use snapshot::{RenderBlock, Snapshot, TextSegment};

/// Rich shows the node tree; raw shows the whole document as one markdown
/// code block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Rich,
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorOptions {
    /// Undo depth. Zero disables undo.
    pub history_limit: usize,
    /// Spaces per list level on export.
    pub list_indent: usize,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            history_limit: 100,
            list_indent: 2,
        }
    }
}

pub struct Editor {
    pub(crate) doc: Document,
    mode: Mode,
    options: EditorOptions,
    pub(crate) embed_options: EmbedOptions,
    version: u64,
    selection: Option<Selection>,
    history: History,
    listeners: Listeners,
    outline: Outline,
    pub(crate) embeds: EmbedState,
    tx: mpsc::UnboundedSender<EditorMessage>,
    rx: mpsc::UnboundedReceiver<EditorMessage>,
}

impl Editor {
    pub fn new(options: EditorOptions) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            doc: Document::new(),
            mode: Mode::Rich,
            options,
            embed_options: EmbedOptions::default(),
            version: 0,
            selection: None,
            history: History::new(options.history_limit),
            listeners: Listeners::default(),
            outline: Outline::default(),
            embeds: EmbedState::default(),
            tx,
            rx,
        }
    }

    /// Loads a document. Loading is not an undoable step, but embeds in the
    /// loaded text are queued for lookup like any other new node.
    pub fn from_markdown(text: &str, options: EditorOptions) -> Self {
        let mut editor = Self::new(options);
        let empty = Document::new();
        editor.doc = bridge::from_markdown(text);
        let created = diff(&empty, &editor.doc);
        editor.reconcile(&created);
        editor
    }

    pub fn with_embed_options(mut self, options: EmbedOptions) -> Self {
        self.embed_options = options;
        self
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    /// Bumped by every commit, undo, redo and applied message.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            list_indent: self.options.list_indent,
        }
    }

    /// The document as markdown. In raw mode that is the raw text itself.
    pub fn to_markdown(&self) -> String {
        match self.mode {
            Mode::Raw => match bridge::raw_text(&self.doc) {
                Some(text) => text.to_string(),
                None => bridge::export_document(&self.doc, &self.export_options()),
            },
            Mode::Rich => bridge::export_document(&self.doc, &self.export_options()),
        }
    }

    /// Runs `f` against a working copy of the document and commits the copy
    /// when `f` succeeds. On error the committed document is untouched.
    pub fn update<T>(
        &mut self,
        f: impl FnOnce(&mut Document) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut working = self.doc.clone();
        let out = f(&mut working)?;
        self.commit(working, self.mode);
        Ok(out)
    }

    fn commit(&mut self, working: Document, mode: Mode) {
        let mutations = diff(&self.doc, &working);
        if mutations.is_empty() && mode == self.mode {
            return;
        }
        let previous = std::mem::replace(&mut self.doc, working);
        self.history.record(Entry {
            doc: previous,
            mode: self.mode,
        });
        self.mode = mode;
        self.reconcile(&mutations);
    }

    fn reconcile(&mut self, mutations: &[Mutation]) {
        self.version += 1;
        for m in mutations {
            match m.kind {
                MutationKind::Destroyed => self.embeds.forget(m.key),
                MutationKind::Created | MutationKind::Updated => self.embeds.request(&self.doc, m.key),
            }
        }
        self.outline.sync(&self.doc);
        if let Some(sel) = self.selection
            && !(self.doc.is_attached(sel.anchor.key) && self.doc.is_attached(sel.focus.key))
        {
            debug!("selection points at a removed node, clearing it");
            self.selection = None;
        }
        self.listeners.dispatch(mutations);
    }

    pub fn undo(&mut self) -> Result<(), EngineError> {
        let current = self.current_entry();
        let entry = self.history.undo(current).ok_or(EngineError::NothingToUndo)?;
        self.restore(entry);
        Ok(())
    }

    pub fn redo(&mut self) -> Result<(), EngineError> {
        let current = self.current_entry();
        let entry = self.history.redo(current).ok_or(EngineError::NothingToRedo)?;
        self.restore(entry);
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn current_entry(&self) -> Entry {
        Entry {
            doc: self.doc.clone(),
            mode: self.mode,
        }
    }

    fn restore(&mut self, entry: Entry) {
        let before = std::mem::replace(&mut self.doc, entry.doc);
        self.mode = entry.mode;
        let mutations = diff(&before, &self.doc);
        self.reconcile(&mutations);
    }

    pub fn register_mutation_listener(
        &mut self,
        node_type: NodeType,
        listener: impl FnMut(&[Mutation]) + 'static,
    ) -> ListenerId {
        self.listeners.register(node_type, Box::new(listener))
    }

    pub fn unregister_mutation_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.unregister(id)
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) -> Result<(), EngineError> {
        for key in [selection.anchor.key, selection.focus.key] {
            if !self.doc.is_attached(key) {
                return Err(EngineError::Detached(key));
            }
        }
        self.selection = Some(selection);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn insert_block(&mut self, index: usize, fragment: Fragment) -> Result<NodeKey, EngineError> {
        self.update(|doc| doc.insert_block(index, fragment))
    }

    pub fn remove_node(&mut self, key: NodeKey) -> Result<Fragment, EngineError> {
        self.update(|doc| doc.remove(key))
    }

    /// Switches between rich and raw mode, returning the new mode. The
    /// selection is always dropped.
    pub fn toggle_mode(&mut self) -> Result<Mode, EngineError> {
        self.selection = None;
        let opts = self.export_options();
        let (working, mode) = match self.mode {
            Mode::Rich => (
                Document::from_fragments(vec![bridge::to_raw(&self.doc, &opts)])?,
                Mode::Raw,
            ),
            Mode::Raw => {
                let text = match bridge::raw_text(&self.doc) {
                    Some(text) => text.to_string(),
                    None => {
                        warn!("raw document lost its {RAW_LANGUAGE} block, exporting it as is");
                        bridge::export_document(&self.doc, &opts)
                    }
                };
                (bridge::import_document(registry(), &text), Mode::Rich)
            }
        };
        info!("switching to {mode:?} mode");
        self.commit(working, mode);
        Ok(mode)
    }

    pub fn collapse(&mut self, heading: NodeKey) -> Result<(), EngineError> {
        self.update(|doc| outline::collapse(doc, heading))
    }

    pub fn expand(&mut self, heading: NodeKey) -> Result<(), EngineError> {
        self.update(|doc| outline::expand(doc, heading))
    }

    /// Returns whether the heading is collapsed afterwards.
    pub fn toggle_collapse(&mut self, heading: NodeKey) -> Result<bool, EngineError> {
        self.update(|doc| outline::toggle(doc, heading))
    }

    pub fn is_collapsed(&self, heading: NodeKey) -> bool {
        self.outline.is_collapsed(heading)
    }

    pub fn is_hidden(&self, block: NodeKey) -> bool {
        self.outline.is_hidden(block)
    }

    pub fn outline(&self) -> Vec<OutlineEntry> {
        self.outline.entries(&self.doc)
    }

    pub fn handle(&self) -> EditorHandle {
        EditorHandle::new(self.tx.clone())
    }

    /// Applies queued messages in arrival order. Returns how many were
    /// applied; stale ones are logged and dropped.
    pub fn drain_messages(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(message) = self.rx.try_recv() {
            match message {
                EditorMessage::Embed(completion) => {
                    let key = completion.key;
                    if self.embeds.complete(&self.doc, completion) {
                        self.version += 1;
                        applied += 1;
                    } else {
                        warn!("discarding embed result for {key}, node is gone or changed");
                    }
                }
            }
        }
        applied
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorOptions::default())
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("mode", &self.mode)
            .field("version", &self.version)
            .field("blocks", &self.doc.root_children().len())
            .field("selection", &self.selection)
            .finish()
    }
}
