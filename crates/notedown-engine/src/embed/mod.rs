//! Enrichment of entity embeds.
//!
//! Entity nodes with `is_embed` set are looked up asynchronously through an
//! [`EntityLookup`] collaborator. The editor queues an [`EmbedRequest`] for
//! every such node a commit creates; whoever drives the session resolves them
//! with an [`EmbedResolver`] and feeds the [`EmbedCompletion`]s back through
//! an [`EditorHandle`](crate::editing::EditorHandle). A completion whose node
//! is gone by then is dropped.

mod edit;

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Document, EntityKind, NodeKey, NodeKind};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileInfo {
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteInfo {
    pub content: String,
    pub author_name: Option<String>,
    pub author_picture: Option<String>,
    pub created_at: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("lookup failed for {identifier}: {reason}")]
    Failed { identifier: String, reason: String },
    #[error("lookup timed out for {0}")]
    Timeout(String),
}

/// Fetches profile and note data for entity identifiers.
///
/// `Ok(None)` means the entity is unknown. Both outcomes and errors end in
/// the same truncated fallback display, so implementations need not retry.
pub trait EntityLookup {
    fn lookup_profile(
        &self,
        identifier: &str,
    ) -> impl std::future::Future<Output = Result<Option<ProfileInfo>, LookupError>>;

    fn lookup_note(
        &self,
        identifier: &str,
    ) -> impl std::future::Future<Output = Result<Option<NoteInfo>, LookupError>>;
}

/// Resolves nothing.
impl EntityLookup for () {
    async fn lookup_profile(&self, _identifier: &str) -> Result<Option<ProfileInfo>, LookupError> {
        Ok(None)
    }

    async fn lookup_note(&self, _identifier: &str) -> Result<Option<NoteInfo>, LookupError> {
        Ok(None)
    }
}

/// Lookup over data that is already in memory.
#[derive(Debug, Clone, Default)]
pub struct ResolvedEntities {
    profiles: HashMap<String, ProfileInfo>,
    notes: HashMap<String, NoteInfo>,
}

impl ResolvedEntities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_profile(&mut self, identifier: impl Into<String>, info: ProfileInfo) {
        self.profiles.insert(identifier.into(), info);
    }

    pub fn add_note(&mut self, identifier: impl Into<String>, info: NoteInfo) {
        self.notes.insert(identifier.into(), info);
    }
}

impl EntityLookup for ResolvedEntities {
    async fn lookup_profile(&self, identifier: &str) -> Result<Option<ProfileInfo>, LookupError> {
        Ok(self.profiles.get(identifier).cloned())
    }

    async fn lookup_note(&self, identifier: &str) -> Result<Option<NoteInfo>, LookupError> {
        Ok(self.notes.get(identifier).cloned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedRequest {
    pub key: NodeKey,
    pub kind: EntityKind,
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedOutcome {
    Profile(ProfileInfo),
    Note(NoteInfo),
    /// Not found or the lookup failed.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedCompletion {
    pub key: NodeKey,
    pub identifier: String,
    pub outcome: EmbedOutcome,
}

/// Turns requests into completions. Never fails.
#[derive(Debug, Clone, Default)]
pub struct EmbedResolver<L> {
    lookup: L,
}

impl<L: EntityLookup> EmbedResolver<L> {
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }

    pub async fn resolve(&self, request: EmbedRequest) -> EmbedCompletion {
        let outcome = if request.kind.is_profile() {
            match self.lookup.lookup_profile(&request.identifier).await {
                Ok(Some(info)) => EmbedOutcome::Profile(info),
                Ok(None) => EmbedOutcome::Unavailable,
                Err(e) => {
                    debug!("profile lookup: {e}");
                    EmbedOutcome::Unavailable
                }
            }
        } else {
            match self.lookup.lookup_note(&request.identifier).await {
                Ok(Some(info)) => EmbedOutcome::Note(info),
                Ok(None) => EmbedOutcome::Unavailable,
                Err(e) => {
                    debug!("note lookup: {e}");
                    EmbedOutcome::Unavailable
                }
            }
        };
        EmbedCompletion {
            key: request.key,
            identifier: request.identifier,
            outcome,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EmbedOptions {
    /// Leading characters kept by [`truncate_identifier`].
    pub truncate_head: usize,
    pub truncate_tail: usize,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            truncate_head: 12,
            truncate_tail: 4,
        }
    }
}

/// `head` leading characters, an ellipsis, `tail` trailing characters.
/// Identifiers too short to gain from it come back unchanged.
pub fn truncate_identifier(identifier: &str, opts: &EmbedOptions) -> String {
    let chars: Vec<char> = identifier.chars().collect();
    if chars.len() <= opts.truncate_head + opts.truncate_tail + 1 {
        return identifier.to_string();
    }
    let head: String = chars[..opts.truncate_head].iter().collect();
    let tail: String = chars[chars.len() - opts.truncate_tail..].iter().collect();
    format!("{head}…{tail}")
}

/// How an entity node should be presented right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedDisplay {
    /// A plain mention, never looked up.
    Mention { label: String },
    /// Lookup requested, no answer yet.
    Pending { label: String },
    Profile { label: String, info: ProfileInfo },
    Note { label: String, info: NoteInfo },
    Fallback { label: String },
}

impl EmbedDisplay {
    pub fn label(&self) -> &str {
        match self {
            EmbedDisplay::Mention { label }
            | EmbedDisplay::Pending { label }
            | EmbedDisplay::Profile { label, .. }
            | EmbedDisplay::Note { label, .. }
            | EmbedDisplay::Fallback { label } => label,
        }
    }
}

/// Per-node enrichment cache plus the queue of lookups not yet handed out.
#[derive(Debug, Clone, Default)]
pub(crate) struct EmbedState {
    cache: HashMap<NodeKey, EmbedOutcome>,
    queue: Vec<EmbedRequest>,
}

impl EmbedState {
    pub fn request(&mut self, doc: &Document, key: NodeKey) {
        if let Some(NodeKind::Entity {
            kind,
            identifier,
            is_embed: true,
        }) = doc.kind(key)
        {
            self.cache.remove(&key);
            self.queue.retain(|r| r.key != key);
            self.queue.push(EmbedRequest {
                key,
                kind: *kind,
                identifier: identifier.clone(),
            });
        }
    }

    pub fn forget(&mut self, key: NodeKey) {
        self.cache.remove(&key);
        self.queue.retain(|r| r.key != key);
    }

    pub fn take_requests(&mut self) -> Vec<EmbedRequest> {
        std::mem::take(&mut self.queue)
    }

    /// Stores a completion if its node still is the embed it was asked
    /// about. Returns whether it was accepted.
    pub fn complete(&mut self, doc: &Document, completion: EmbedCompletion) -> bool {
        match doc.kind(completion.key) {
            Some(NodeKind::Entity {
                identifier,
                is_embed: true,
                ..
            }) if *identifier == completion.identifier => {
                self.cache.insert(completion.key, completion.outcome);
                true
            }
            _ => false,
        }
    }

    pub fn display(&self, doc: &Document, key: NodeKey, opts: &EmbedOptions) -> Option<EmbedDisplay> {
        let NodeKind::Entity {
            identifier, is_embed, ..
        } = doc.kind(key)?
        else {
            return None;
        };
        let label = truncate_identifier(identifier, opts);
        if !is_embed {
            return Some(EmbedDisplay::Mention { label });
        }
        Some(match self.cache.get(&key) {
            None => EmbedDisplay::Pending { label },
            Some(EmbedOutcome::Unavailable) => EmbedDisplay::Fallback { label },
            Some(EmbedOutcome::Profile(info)) => EmbedDisplay::Profile {
                label: info.name.clone().unwrap_or(label),
                info: info.clone(),
            },
            Some(EmbedOutcome::Note(info)) => EmbedDisplay::Note {
                label,
                info: info.clone(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::from_markdown;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    struct Failing;

    impl EntityLookup for Failing {
        async fn lookup_profile(&self, identifier: &str) -> Result<Option<ProfileInfo>, LookupError> {
            Err(LookupError::Timeout(identifier.to_string()))
        }

        async fn lookup_note(&self, identifier: &str) -> Result<Option<NoteInfo>, LookupError> {
            Err(LookupError::Failed {
                identifier: identifier.to_string(),
                reason: "offline".into(),
            })
        }
    }

    #[rstest]
    #[case("npub1short", "npub1short")]
    #[case("npub1abcdefghijklmnopqrstuvwxyz", "npub1abcdefg…wxyz")]
    #[case("npub1abcdefghijkl", "npub1abcdefghijkl")]
    fn truncation(#[case] id: &str, #[case] expected: &str) {
        assert_eq!(truncate_identifier(id, &EmbedOptions::default()), expected);
    }

    #[tokio::test]
    async fn failures_resolve_to_unavailable() {
        let k = NodeKey::allocate();
        let resolver = EmbedResolver::new(Failing);
        for (kind, id) in [(EntityKind::Npub, "npub1x"), (EntityKind::Nevent, "nevent1x")] {
            let done = resolver
                .resolve(EmbedRequest {
                    key: k,
                    kind,
                    identifier: id.into(),
                })
                .await;
            assert_eq!(done.outcome, EmbedOutcome::Unavailable);
        }
    }

    #[tokio::test]
    async fn resolved_entities_answer_by_family() {
        let mut known = ResolvedEntities::new();
        known.add_profile(
            "npub1alice",
            ProfileInfo {
                name: Some("alice".into()),
                picture: None,
            },
        );
        let resolver = EmbedResolver::new(known);
        let k = NodeKey::allocate();
        let done = resolver
            .resolve(EmbedRequest {
                key: k,
                kind: EntityKind::Npub,
                identifier: "npub1alice".into(),
            })
            .await;
        assert!(matches!(done.outcome, EmbedOutcome::Profile(ref p) if p.name.as_deref() == Some("alice")));

        let done = resolver
            .resolve(EmbedRequest {
                key: k,
                kind: EntityKind::Nprofile,
                identifier: "nprofile1bob".into(),
            })
            .await;
        assert_eq!(done.outcome, EmbedOutcome::Unavailable);
    }

    #[test]
    fn display_follows_cache() {
        let doc = from_markdown("nostr:npub1abcdefghijklmnopqrstuvwxyz and npub1plain");
        let p = doc.root_children()[0];
        let embed = doc.children(p)[0];
        let mention = doc.children(p)[2];
        let opts = EmbedOptions::default();
        let mut state = EmbedState::default();

        state.request(&doc, embed);
        state.request(&doc, mention);
        assert_eq!(state.take_requests().len(), 1);

        assert!(matches!(
            state.display(&doc, mention, &opts),
            Some(EmbedDisplay::Mention { .. })
        ));
        assert!(matches!(
            state.display(&doc, embed, &opts),
            Some(EmbedDisplay::Pending { .. })
        ));

        let stale = EmbedCompletion {
            key: embed,
            identifier: "npub1other".into(),
            outcome: EmbedOutcome::Unavailable,
        };
        assert!(!state.complete(&doc, stale));

        let done = EmbedCompletion {
            key: embed,
            identifier: "npub1abcdefghijklmnopqrstuvwxyz".into(),
            outcome: EmbedOutcome::Unavailable,
        };
        assert!(state.complete(&doc, done));
        assert_eq!(
            state.display(&doc, embed, &opts),
            Some(EmbedDisplay::Fallback {
                label: "npub1abcdefg…wxyz".into()
            })
        );
    }
}
