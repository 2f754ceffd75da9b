use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::model::{EntityKind, Fragment, NodeKind, NodeType, TextFormat};

/// Stands in for an already built inline node while matching.
pub const NODE_PLACEHOLDER: char = '\u{FFFC}';
/// Stands in for a backslash-escaped character while matching.
pub const ESCAPE_PLACEHOLDER: char = '\u{E000}';

/// One unit of inline content while a block is being scanned.
#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    Text(String),
    Escaped(char),
    Node(Fragment),
}

/// What fires a text-match transformer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Char(char),
    /// Whitespace about to be typed, or the end of the text.
    Boundary,
}

/// Inline rule. `regex` is matched against the [`Shadow`] of everything
/// scanned so far, anchored at its end.
pub struct TextMatchTransformer {
    pub name: &'static str,
    pub trigger: Trigger,
    pub regex: &'static Regex,
    pub exports: &'static [NodeType],
    /// Allowed to fire inside an unclosed code span.
    pub raw: bool,
    pub replace: fn(&Captures<'_>, &Shadow<'_>) -> Option<Replacement>,
}

/// Swap the shadow byte range `range` for `with`.
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
    pub range: Range<usize>,
    pub with: Vec<Piece>,
}

/// Matching view over pieces: text stays as-is, escaped characters become
/// [`ESCAPE_PLACEHOLDER`] and built nodes [`NODE_PLACEHOLDER`], so no
/// pattern can see through either.
pub struct Shadow<'p> {
    pub text: String,
    pieces: &'p [Piece],
    ranges: Vec<Range<usize>>,
}

impl<'p> Shadow<'p> {
    pub fn build(pieces: &'p [Piece]) -> Self {
        let mut text = String::new();
        let mut ranges = Vec::with_capacity(pieces.len());
        for piece in pieces {
            let start = text.len();
            match piece {
                Piece::Text(t) => text.push_str(t),
                Piece::Escaped(_) => text.push(ESCAPE_PLACEHOLDER),
                Piece::Node(_) => text.push(NODE_PLACEHOLDER),
            }
            ranges.push(start..text.len());
        }
        Self {
            text,
            pieces,
            ranges,
        }
    }

    /// Pieces overlapping `range`, with text pieces cut to it.
    pub fn pieces(&self, range: Range<usize>) -> Vec<Piece> {
        let mut out = Vec::new();
        for (piece, r) in self.pieces.iter().zip(&self.ranges) {
            if r.end <= range.start || r.start >= range.end {
                continue;
            }
            match piece {
                Piece::Text(t) => {
                    let from = range.start.max(r.start) - r.start;
                    let to = range.end.min(r.end) - r.start;
                    if let Some(part) = t.get(from..to)
                        && !part.is_empty()
                    {
                        out.push(Piece::Text(part.to_string()));
                    }
                }
                other => out.push(other.clone()),
            }
        }
        out
    }

    /// Literal text of `range`, or `None` if it spans a built node.
    pub fn plain(&self, range: Range<usize>) -> Option<String> {
        let mut out = String::new();
        for piece in self.pieces(range) {
            match piece {
                Piece::Text(t) => out.push_str(&t),
                Piece::Escaped(c) => out.push(c),
                Piece::Node(_) => return None,
            }
        }
        Some(out)
    }

    /// Visible text of `range`, reading through built nodes.
    pub fn flatten(&self, range: Range<usize>) -> String {
        let mut out = String::new();
        for piece in self.pieces(range) {
            match piece {
                Piece::Text(t) => out.push_str(&t),
                Piece::Escaped(c) => out.push(c),
                Piece::Node(f) => out.push_str(&f.text_content()),
            }
        }
        out
    }

    /// Whether an unescaped inline code span is still open.
    pub fn in_code_span(&self) -> bool {
        self.pieces
            .iter()
            .filter_map(|p| match p {
                Piece::Text(t) => Some(t.matches('`').count()),
                _ => None,
            })
            .sum::<usize>()
            % 2
            == 1
    }
}

static IMAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(!\[([^\[\]]*)\]\(([^()\s]+)\))$").unwrap());
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^!])(\[([^\[\]]*)\]\(([^()\s]+)\))$").unwrap());
static YOUTUBE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|\s)((?:https?://)?(?:www\.|m\.)?(?:youtube\.com/(?:watch\?(?:\S*?&)?v=|shorts/|embed/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[?&#]\S*)?)$",
    )
    .unwrap()
});
static AUDIO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|\s)(https?://\S+\.(?:mp3|wav|ogg|oga|m4a|flac|aac|opus)(?:\?\S*)?)$").unwrap()
});
static AUTOLINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:^|\s)(https?://[^\s<>\[\]]+)$").unwrap());
static ANGLE_AUTOLINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<((?:https?://|nostr:|n(?:pub|profile|event|addr)1)[^\s<>]*)>$").unwrap()
});
static NPUB: LazyLock<Regex> = LazyLock::new(|| entity_regex(EntityKind::Npub));
static NPROFILE: LazyLock<Regex> = LazyLock::new(|| entity_regex(EntityKind::Nprofile));
static NEVENT: LazyLock<Regex> = LazyLock::new(|| entity_regex(EntityKind::Nevent));
static NADDR: LazyLock<Regex> = LazyLock::new(|| entity_regex(EntityKind::Naddr));
static CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:^|[^`])(`([^`]+)`)$").unwrap());
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^*])(\*\*([^*\s](?:[^*]*[^*\s])?)\*\*)$").unwrap());
static BOLD_UNDERSCORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|[\s(\[{"'*~\x{FFFC}\x{E000}])(__([^_\s](?:[^_]*[^_\s])?)__)$"#).unwrap()
});
static ITALIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|[\s(\[{"'*~\x{FFFC}\x{E000}])(_([^_\s](?:[^_]*[^_\s])?)_)$"#).unwrap()
});
static ITALIC_STAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^*])(\*([^*\s](?:[^*]*[^*\s])?)\*)$").unwrap());
static STRIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^~])(~~([^~\s](?:[^~]*[^~\s])?)~~)$").unwrap());
static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap());

fn entity_regex(kind: EntityKind) -> Regex {
    let pattern = format!(r"(?:^|\s)((nostr:)?({}[a-z0-9]+))$", kind.prefix());
    Regex::new(&pattern).unwrap()
}

pub(crate) fn standard() -> Vec<TextMatchTransformer> {
    vec![
        TextMatchTransformer {
            name: "image",
            trigger: Trigger::Char(')'),
            regex: &IMAGE,
            exports: &[NodeType::Image],
            raw: false,
            replace: replace_image,
        },
        TextMatchTransformer {
            name: "link",
            trigger: Trigger::Char(')'),
            regex: &LINK,
            exports: &[NodeType::Link],
            raw: false,
            replace: replace_link,
        },
        TextMatchTransformer {
            name: "youtube",
            trigger: Trigger::Boundary,
            regex: &YOUTUBE,
            exports: &[NodeType::YouTubeEmbed],
            raw: false,
            replace: replace_youtube,
        },
        TextMatchTransformer {
            name: "audio",
            trigger: Trigger::Boundary,
            regex: &AUDIO,
            exports: &[NodeType::Audio],
            raw: false,
            replace: replace_audio,
        },
        TextMatchTransformer {
            name: "autolink",
            trigger: Trigger::Boundary,
            regex: &AUTOLINK,
            exports: &[NodeType::Link],
            raw: false,
            replace: replace_autolink,
        },
        TextMatchTransformer {
            name: "angle_autolink",
            trigger: Trigger::Char('>'),
            regex: &ANGLE_AUTOLINK,
            exports: &[
                NodeType::Link,
                NodeType::Audio,
                NodeType::YouTubeEmbed,
                NodeType::NpubRef,
                NodeType::NprofileRef,
                NodeType::NeventRef,
                NodeType::NaddrRef,
            ],
            raw: false,
            replace: replace_angle_autolink,
        },
        entity_transformer("npub", &NPUB, EntityKind::Npub),
        entity_transformer("nprofile", &NPROFILE, EntityKind::Nprofile),
        entity_transformer("nevent", &NEVENT, EntityKind::Nevent),
        entity_transformer("naddr", &NADDR, EntityKind::Naddr),
        TextMatchTransformer {
            name: "inline_code",
            trigger: Trigger::Char('`'),
            regex: &CODE,
            exports: &[NodeType::TextRun],
            raw: true,
            replace: |caps, shadow| {
                let code = shadow.plain(caps.get(2)?.range())?;
                Some(Replacement {
                    range: caps.get(1)?.range(),
                    with: vec![Piece::Node(Fragment::new(NodeKind::Text {
                        text: code,
                        format: TextFormat::code(),
                    }))],
                })
            },
        },
        format_transformer("bold", '*', &BOLD, TextFormat::bold()),
        format_transformer("bold_underscore", '_', &BOLD_UNDERSCORE, TextFormat::bold()),
        format_transformer("italic", '_', &ITALIC, TextFormat::italic()),
        format_transformer("italic_star", '*', &ITALIC_STAR, TextFormat::italic()),
        format_transformer("strikethrough", '~', &STRIKE, TextFormat::strikethrough()),
    ]
}

fn entity_transformer(name: &'static str, regex: &'static Regex, kind: EntityKind) -> TextMatchTransformer {
    let replace: fn(&Captures<'_>, &Shadow<'_>) -> Option<Replacement> = match kind {
        EntityKind::Npub => |c, s| replace_entity(c, s, EntityKind::Npub),
        EntityKind::Nprofile => |c, s| replace_entity(c, s, EntityKind::Nprofile),
        EntityKind::Nevent => |c, s| replace_entity(c, s, EntityKind::Nevent),
        EntityKind::Naddr => |c, s| replace_entity(c, s, EntityKind::Naddr),
    };
    TextMatchTransformer {
        name,
        trigger: Trigger::Boundary,
        regex,
        exports: match kind {
            EntityKind::Npub => &[NodeType::NpubRef],
            EntityKind::Nprofile => &[NodeType::NprofileRef],
            EntityKind::Nevent => &[NodeType::NeventRef],
            EntityKind::Naddr => &[NodeType::NaddrRef],
        },
        raw: false,
        replace,
    }
}

fn format_transformer(name: &'static str, closer: char, regex: &'static Regex, format: TextFormat) -> TextMatchTransformer {
    let replace: fn(&Captures<'_>, &Shadow<'_>) -> Option<Replacement> = if format.bold {
        |c, s| replace_format(c, s, TextFormat::bold())
    } else if format.italic {
        |c, s| replace_format(c, s, TextFormat::italic())
    } else {
        |c, s| replace_format(c, s, TextFormat::strikethrough())
    };
    TextMatchTransformer {
        name,
        trigger: Trigger::Char(closer),
        regex,
        exports: &[NodeType::TextRun],
        raw: false,
        replace,
    }
}

fn node(kind: NodeKind) -> Vec<Piece> {
    vec![Piece::Node(Fragment::new(kind))]
}

fn replace_image(caps: &Captures<'_>, shadow: &Shadow<'_>) -> Option<Replacement> {
    let url = shadow.plain(caps.get(3)?.range())?;
    let alt = shadow.flatten(caps.get(2)?.range());
    Some(Replacement {
        range: caps.get(1)?.range(),
        with: node(NodeKind::Image { url, alt }),
    })
}

fn replace_link(caps: &Captures<'_>, shadow: &Shadow<'_>) -> Option<Replacement> {
    let url = shadow.plain(caps.get(3)?.range())?;
    let text = shadow.flatten(caps.get(2)?.range());
    Some(Replacement {
        range: caps.get(1)?.range(),
        with: node(NodeKind::Link { url, text }),
    })
}

fn replace_youtube(caps: &Captures<'_>, shadow: &Shadow<'_>) -> Option<Replacement> {
    shadow.plain(caps.get(1)?.range())?;
    let video_id = caps.get(2)?.as_str().to_string();
    Some(Replacement {
        range: caps.get(1)?.range(),
        with: node(NodeKind::YouTube { video_id }),
    })
}

fn replace_audio(caps: &Captures<'_>, shadow: &Shadow<'_>) -> Option<Replacement> {
    let url = shadow.plain(caps.get(1)?.range())?;
    Some(Replacement {
        range: caps.get(1)?.range(),
        with: node(NodeKind::Audio { url }),
    })
}

fn replace_autolink(caps: &Captures<'_>, shadow: &Shadow<'_>) -> Option<Replacement> {
    let m = caps.get(1)?;
    // Sentence punctuation after a bare url is not part of it.
    let trimmed = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?', '\'', '"']);
    let range = m.start()..m.start() + trimmed.len();
    let url = shadow.plain(range.clone())?;
    if url.len() <= "https://".len() {
        return None;
    }
    Some(Replacement {
        range,
        with: node(NodeKind::Link {
            url: url.clone(),
            text: url,
        }),
    })
}

/// `<target>`: whichever embed the bare target would become, else a plain
/// link. Lets a target sit flush against neighboring text.
fn replace_angle_autolink(caps: &Captures<'_>, shadow: &Shadow<'_>) -> Option<Replacement> {
    let target = shadow.plain(caps.get(1)?.range())?;
    let kind = if let Some((kind, identifier, is_embed)) = parse_entity(&target) {
        NodeKind::Entity {
            kind,
            identifier,
            is_embed,
        }
    } else if let Some(video_id) = youtube_video_id(&target) {
        NodeKind::YouTube { video_id }
    } else if is_audio_url(&target) {
        NodeKind::Audio { url: target }
    } else if is_web_url(&target) {
        NodeKind::Link {
            url: target.clone(),
            text: target,
        }
    } else {
        return None;
    };
    Some(Replacement {
        range: caps.get(0)?.range(),
        with: node(kind),
    })
}

fn replace_entity(caps: &Captures<'_>, shadow: &Shadow<'_>, kind: EntityKind) -> Option<Replacement> {
    let identifier = shadow.plain(caps.get(3)?.range())?;
    Some(Replacement {
        range: caps.get(1)?.range(),
        with: node(NodeKind::Entity {
            kind,
            identifier,
            is_embed: caps.get(2).is_some(),
        }),
    })
}

fn replace_format(caps: &Captures<'_>, shadow: &Shadow<'_>, format: TextFormat) -> Option<Replacement> {
    let inner = shadow.pieces(caps.get(2)?.range());
    Some(Replacement {
        range: caps.get(1)?.range(),
        with: apply_format(inner, format),
    })
}

/// Adds `format` to every run in `pieces`. Embeds keep their own kind.
pub fn apply_format(pieces: Vec<Piece>, format: TextFormat) -> Vec<Piece> {
    pieces
        .into_iter()
        .map(|p| match p {
            Piece::Text(text) => Piece::Node(Fragment::new(NodeKind::Text { text, format })),
            Piece::Escaped(c) => Piece::Node(Fragment::new(NodeKind::Text {
                text: c.to_string(),
                format,
            })),
            Piece::Node(mut f) => {
                if let NodeKind::Text { format: existing, .. } = &mut f.kind {
                    *existing = existing.union(format);
                }
                Piece::Node(f)
            }
        })
        .collect()
}

/// Final inline children: literal pieces become plain runs and adjacent
/// runs with equal format merge.
pub fn into_fragments(pieces: Vec<Piece>) -> Vec<Fragment> {
    let mut out: Vec<Fragment> = Vec::new();
    for piece in pieces {
        let fragment = match piece {
            Piece::Text(t) => Fragment::text(t),
            Piece::Escaped(c) => Fragment::text(c.to_string()),
            Piece::Node(f) => f,
        };
        if let NodeKind::Text { text, format } = &fragment.kind {
            if text.is_empty() {
                continue;
            }
            if let Some(NodeKind::Text {
                text: prev,
                format: prev_format,
            }) = out.last_mut().map(|f| &mut f.kind)
                && prev_format == format
            {
                prev.push_str(text);
                continue;
            }
        }
        out.push(fragment);
    }
    out
}

fn whole<'t>(regex: &Regex, s: &'t str) -> Option<Captures<'t>> {
    regex.captures(s).filter(|c| c.get(1).is_some_and(|m| m.start() == 0))
}

/// Parses an entity reference the way the inline scan would, returning
/// the family, the bare identifier and whether it carried `nostr:`.
pub fn parse_entity(input: &str) -> Option<(EntityKind, String, bool)> {
    let input = input.trim();
    let kind = EntityKind::detect(input)?;
    let regex: &Regex = match kind {
        EntityKind::Npub => &NPUB,
        EntityKind::Nprofile => &NPROFILE,
        EntityKind::Nevent => &NEVENT,
        EntityKind::Naddr => &NADDR,
    };
    let caps = whole(regex, input)?;
    Some((kind, caps.get(3)?.as_str().to_string(), caps.get(2).is_some()))
}

/// Extracts the video id from a recognized video url.
pub fn youtube_video_id(url: &str) -> Option<String> {
    let caps = whole(&YOUTUBE, url.trim())?;
    Some(caps.get(2)?.as_str().to_string())
}

pub fn is_video_id(id: &str) -> bool {
    VIDEO_ID.is_match(id)
}

pub fn is_audio_url(url: &str) -> bool {
    whole(&AUDIO, url.trim()).is_some()
}

pub fn is_web_url(url: &str) -> bool {
    whole(&AUTOLINK, url.trim()).is_some()
}
