use serde::Serialize;

/// Inline formatting flags carried by a text run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct TextFormat {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub code: bool,
}

impl TextFormat {
    pub const PLAIN: TextFormat = TextFormat {
        bold: false,
        italic: false,
        strikethrough: false,
        code: false,
    };

    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Self::PLAIN
        }
    }

    pub fn italic() -> Self {
        Self {
            italic: true,
            ..Self::PLAIN
        }
    }

    pub fn strikethrough() -> Self {
        Self {
            strikethrough: true,
            ..Self::PLAIN
        }
    }

    pub fn code() -> Self {
        Self {
            code: true,
            ..Self::PLAIN
        }
    }

    pub fn is_plain(&self) -> bool {
        *self == Self::PLAIN
    }

    /// Flags set in either format.
    pub fn union(self, other: TextFormat) -> TextFormat {
        TextFormat {
            bold: self.bold || other.bold,
            italic: self.italic || other.italic,
            strikethrough: self.strikethrough || other.strikethrough,
            code: self.code || other.code,
        }
    }
}

/// The four decentralized-identity reference families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EntityKind {
    Npub,
    Nprofile,
    Nevent,
    Naddr,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Npub,
        EntityKind::Nprofile,
        EntityKind::Nevent,
        EntityKind::Naddr,
    ];

    /// Bech32 human-readable prefix including the `1` separator.
    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::Npub => "npub1",
            EntityKind::Nprofile => "nprofile1",
            EntityKind::Nevent => "nevent1",
            EntityKind::Naddr => "naddr1",
        }
    }

    /// Profiles resolve to a name and picture; everything else to a note.
    pub fn is_profile(self) -> bool {
        matches!(self, EntityKind::Npub | EntityKind::Nprofile)
    }

    pub fn node_type(self) -> NodeType {
        match self {
            EntityKind::Npub => NodeType::NpubRef,
            EntityKind::Nprofile => NodeType::NprofileRef,
            EntityKind::Nevent => NodeType::NeventRef,
            EntityKind::Naddr => NodeType::NaddrRef,
        }
    }

    /// Detects the family from an identifier, with or without `nostr:`.
    pub fn detect(identifier: &str) -> Option<EntityKind> {
        let bare = identifier.strip_prefix("nostr:").unwrap_or(identifier);
        Self::ALL.into_iter().find(|k| bare.starts_with(k.prefix()))
    }
}

/// Node type tag together with its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    Paragraph,
    Heading {
        level: u8,
    },
    List {
        ordered: bool,
    },
    ListItem {
        indent: u8,
    },
    Quote,
    HorizontalRule,
    CodeBlock {
        language: Option<String>,
        code: String,
    },
    Table,
    TableRow,
    TableCell {
        header: bool,
        col_span: u16,
        row_span: u16,
    },
    Text {
        text: String,
        format: TextFormat,
    },
    Link {
        url: String,
        text: String,
    },
    Image {
        url: String,
        alt: String,
    },
    Audio {
        url: String,
    },
    YouTube {
        video_id: String,
    },
    Entity {
        kind: EntityKind,
        identifier: String,
        is_embed: bool,
    },
    CollapseMarker,
}

/// Payload-free node tag, used to key mutation listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeType {
    Paragraph,
    Heading,
    List,
    ListItem,
    Quote,
    HorizontalRule,
    CodeBlock,
    Table,
    TableRow,
    TableCell,
    TextRun,
    Link,
    Image,
    Audio,
    YouTubeEmbed,
    NpubRef,
    NprofileRef,
    NeventRef,
    NaddrRef,
    CollapseMarker,
}

impl NodeKind {
    pub fn plain(text: impl Into<String>) -> Self {
        NodeKind::Text {
            text: text.into(),
            format: TextFormat::PLAIN,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Paragraph => NodeType::Paragraph,
            NodeKind::Heading { .. } => NodeType::Heading,
            NodeKind::List { .. } => NodeType::List,
            NodeKind::ListItem { .. } => NodeType::ListItem,
            NodeKind::Quote => NodeType::Quote,
            NodeKind::HorizontalRule => NodeType::HorizontalRule,
            NodeKind::CodeBlock { .. } => NodeType::CodeBlock,
            NodeKind::Table => NodeType::Table,
            NodeKind::TableRow => NodeType::TableRow,
            NodeKind::TableCell { .. } => NodeType::TableCell,
            NodeKind::Text { .. } => NodeType::TextRun,
            NodeKind::Link { .. } => NodeType::Link,
            NodeKind::Image { .. } => NodeType::Image,
            NodeKind::Audio { .. } => NodeType::Audio,
            NodeKind::YouTube { .. } => NodeType::YouTubeEmbed,
            NodeKind::Entity { kind, .. } => kind.node_type(),
            NodeKind::CollapseMarker => NodeType::CollapseMarker,
        }
    }

    /// Whether the node may sit directly in the document root.
    pub fn is_block(&self) -> bool {
        self.node_type().is_block()
    }

    pub fn is_inline(&self) -> bool {
        self.node_type().is_inline()
    }

    /// Block nodes whose children are inline content.
    pub fn holds_inline(&self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph
                | NodeKind::Heading { .. }
                | NodeKind::ListItem { .. }
                | NodeKind::Quote
                | NodeKind::TableCell { .. }
        )
    }

    pub fn accepts_child(&self, child: &NodeKind) -> bool {
        match self {
            NodeKind::List { .. } => matches!(child, NodeKind::ListItem { .. }),
            NodeKind::Table => matches!(child, NodeKind::TableRow),
            NodeKind::TableRow => matches!(child, NodeKind::TableCell { .. }),
            k if k.holds_inline() => child.is_inline(),
            _ => false,
        }
    }

    pub fn is_entity_embed(&self) -> bool {
        matches!(self, NodeKind::Entity { is_embed: true, .. })
    }
}

impl NodeType {
    pub fn is_block(self) -> bool {
        matches!(
            self,
            NodeType::Paragraph
                | NodeType::Heading
                | NodeType::List
                | NodeType::Quote
                | NodeType::HorizontalRule
                | NodeType::CodeBlock
                | NodeType::Table
        )
    }

    pub fn is_inline(self) -> bool {
        matches!(
            self,
            NodeType::TextRun
                | NodeType::Link
                | NodeType::Image
                | NodeType::Audio
                | NodeType::YouTubeEmbed
                | NodeType::NpubRef
                | NodeType::NprofileRef
                | NodeType::NeventRef
                | NodeType::NaddrRef
                | NodeType::CollapseMarker
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            NodeType::Paragraph => "paragraph",
            NodeType::Heading => "heading",
            NodeType::List => "list",
            NodeType::ListItem => "list-item",
            NodeType::Quote => "quote",
            NodeType::HorizontalRule => "horizontal-rule",
            NodeType::CodeBlock => "code-block",
            NodeType::Table => "table",
            NodeType::TableRow => "table-row",
            NodeType::TableCell => "table-cell",
            NodeType::TextRun => "text",
            NodeType::Link => "link",
            NodeType::Image => "image",
            NodeType::Audio => "audio",
            NodeType::YouTubeEmbed => "youtube",
            NodeType::NpubRef => "npub",
            NodeType::NprofileRef => "nprofile",
            NodeType::NeventRef => "nevent",
            NodeType::NaddrRef => "naddr",
            NodeType::CollapseMarker => "collapse-marker",
        }
    }
}
