use tokio::sync::mpsc;

use crate::embed::EmbedCompletion;

/// Results of async work, applied by the editor as new transactions.
#[derive(Debug, Clone)]
pub enum EditorMessage {
    Embed(EmbedCompletion),
}

/// Cloneable, `Send` sender for tasks that outlive a borrow of the editor.
///
/// Sending never blocks and never fails visibly: if the editor is gone the
/// message is dropped.
#[derive(Debug, Clone)]
pub struct EditorHandle {
    tx: mpsc::UnboundedSender<EditorMessage>,
}

impl EditorHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<EditorMessage>) -> Self {
        Self { tx }
    }

    pub fn send(&self, message: EditorMessage) {
        if self.tx.send(message).is_err() {
            log::debug!("editor closed, dropping message");
        }
    }

    pub fn embed_completed(&self, completion: EmbedCompletion) {
        self.send(EditorMessage::Embed(completion));
    }
}
