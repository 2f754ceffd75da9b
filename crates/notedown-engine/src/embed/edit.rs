//! In-place editing of link, media and entity nodes.

use super::{EmbedDisplay, EmbedRequest, EmbedResolver, EntityLookup};
use crate::editing::Editor;
use crate::error::EngineError;
use crate::model::{Fragment, NodeKey, NodeKind, NodeType};
use crate::transform::inline::{is_audio_url, is_video_id, parse_entity, youtube_video_id};

fn valid_target(url: &str) -> bool {
    !url.is_empty() && !url.chars().any(char::is_whitespace)
}

impl Editor {
    fn kind_of(&self, key: NodeKey, expected: &'static str, accepts: fn(&NodeKind) -> bool) -> Result<NodeKind, EngineError> {
        let kind = self.doc.kind(key).ok_or(EngineError::Detached(key))?;
        if accepts(kind) {
            Ok(kind.clone())
        } else {
            Err(EngineError::WrongNodeType {
                expected,
                found: kind.node_type(),
            })
        }
    }

    fn swap_node(&mut self, key: NodeKey, kind: NodeKind) -> Result<NodeKey, EngineError> {
        self.update(|doc| doc.replace(key, Fragment::new(kind)))
    }

    /// Points an entity node at a new identifier. The family follows the
    /// identifier's prefix; a `nostr:` scheme in `identifier` is accepted and
    /// ignored in favor of `is_embed`.
    pub fn edit_entity(&mut self, key: NodeKey, identifier: &str, is_embed: bool) -> Result<NodeKey, EngineError> {
        self.kind_of(key, "entity", |k| matches!(k, NodeKind::Entity { .. }))?;
        let (kind, identifier, _) =
            parse_entity(identifier).ok_or_else(|| EngineError::InvalidIdentifier(identifier.to_string()))?;
        self.swap_node(
            key,
            NodeKind::Entity {
                kind,
                identifier,
                is_embed,
            },
        )
    }

    /// An empty `text` shows the url itself.
    pub fn edit_link(&mut self, key: NodeKey, url: &str, text: &str) -> Result<NodeKey, EngineError> {
        self.kind_of(key, "link", |k| matches!(k, NodeKind::Link { .. }))?;
        let url = url.trim();
        if !valid_target(url) {
            return Err(EngineError::InvalidUrl(url.to_string()));
        }
        let text = if text.is_empty() { url } else { text };
        self.swap_node(
            key,
            NodeKind::Link {
                url: url.to_string(),
                text: text.to_string(),
            },
        )
    }

    /// Retargets an image, audio or video node. Videos take any url the
    /// video transformer recognizes.
    pub fn edit_media(&mut self, key: NodeKey, url: &str) -> Result<NodeKey, EngineError> {
        let current = self.kind_of(key, "media", |k| {
            matches!(k, NodeKind::Image { .. } | NodeKind::Audio { .. } | NodeKind::YouTube { .. })
        })?;
        let url = url.trim();
        let invalid = || EngineError::InvalidUrl(url.to_string());
        let kind = match current {
            NodeKind::Image { alt, .. } if valid_target(url) => NodeKind::Image {
                url: url.to_string(),
                alt,
            },
            NodeKind::Audio { .. } if is_audio_url(url) => NodeKind::Audio { url: url.to_string() },
            NodeKind::YouTube { .. } => NodeKind::YouTube {
                video_id: youtube_video_id(url).ok_or_else(invalid)?,
            },
            _ => return Err(invalid()),
        };
        self.swap_node(key, kind)
    }

    pub fn edit_youtube(&mut self, key: NodeKey, video_id: &str) -> Result<NodeKey, EngineError> {
        self.kind_of(key, "youtube", |k| matches!(k, NodeKind::YouTube { .. }))?;
        let video_id = video_id.trim();
        if !is_video_id(video_id) {
            return Err(EngineError::InvalidIdentifier(video_id.to_string()));
        }
        self.swap_node(
            key,
            NodeKind::YouTube {
                video_id: video_id.to_string(),
            },
        )
    }

    /// Whether [`Editor::convert_link_to_embed`] would succeed.
    pub fn link_is_embeddable(&self, key: NodeKey) -> bool {
        matches!(self.doc.kind(key), Some(NodeKind::Link { url, .. }) if youtube_video_id(url).is_some())
    }

    /// Replaces a link to a recognized video with the video embed itself.
    pub fn convert_link_to_embed(&mut self, key: NodeKey) -> Result<NodeKey, EngineError> {
        let NodeKind::Link { url, .. } = self.kind_of(key, "link", |k| matches!(k, NodeKind::Link { .. }))? else {
            return Err(EngineError::WrongNodeType {
                expected: "link",
                found: NodeType::Link,
            });
        };
        let video_id = youtube_video_id(&url).ok_or(EngineError::InvalidUrl(url))?;
        self.swap_node(key, NodeKind::YouTube { video_id })
    }

    /// Lookups queued by commits since the last call.
    pub fn take_embed_requests(&mut self) -> Vec<EmbedRequest> {
        self.embeds.take_requests()
    }

    pub fn embed_display(&self, key: NodeKey) -> Option<EmbedDisplay> {
        self.embeds.display(&self.doc, key, &self.embed_options)
    }

    /// Resolves every queued lookup and applies the results. Returns how
    /// many were applied.
    pub async fn resolve_embeds<L: EntityLookup>(&mut self, resolver: &EmbedResolver<L>) -> usize {
        let handle = self.handle();
        for request in self.take_embed_requests() {
            handle.embed_completed(resolver.resolve(request).await);
        }
        self.drain_messages()
    }
}
