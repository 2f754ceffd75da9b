use notedown_engine::model::normalize::format_tree;
use notedown_engine::model::{EntityKind, TextFormat};
use notedown_engine::{Document, Fragment, NodeKind, NodeType, from_markdown, to_markdown};
use pretty_assertions::assert_eq;
use pulldown_cmark::{Event, Options, Parser, Tag};
use rstest::rstest;

#[rstest]
#[case::formatting("# Title\n\nPara with **bold** and _it_ text.")]
#[case::nested_list("- a\n  - b\n    - c\n- d")]
#[case::ordered_list("1. one\n2. two\n   1. nested")]
#[case::table("| a | b |\n| --- | --- |\n| 1 | **2** |")]
#[case::quote("> quote *x*\n> more")]
#[case::code_fence("```js\nlet a = `x`;\n```")]
#[case::escapes(r"Escaped \*stars\* and a\_b and https\://x.io")]
#[case::media("![img](https://x.io/a.png) then [link](https://x.io)")]
#[case::entities("nostr:npub1abc npub1def nevent1xyz")]
#[case::bare_urls("https://youtu.be/dQw4w9WgXcQ and https://x.io/a.mp3 and https://x.io")]
#[case::empty_paragraphs("a\n\n\n\nb")]
#[case::nested_formats("~~strike~~ `code` **_both_**")]
#[case::block_lookalikes(r"\# not a heading")]
fn export_is_stable_after_one_pass(#[case] input: &str) {
    let once = to_markdown(&from_markdown(input));
    let twice = to_markdown(&from_markdown(&once));
    assert_eq!(twice, once);
}

fn run(text: &str, format: TextFormat) -> Fragment {
    Fragment::new(NodeKind::Text {
        text: text.into(),
        format,
    })
}

fn audio() -> Fragment {
    Fragment::new(NodeKind::Audio {
        url: "https://x.io/s.mp3".into(),
    })
}

fn video() -> Fragment {
    Fragment::new(NodeKind::YouTube {
        video_id: "dQw4w9WgXcQ".into(),
    })
}

fn npub(identifier: &str, is_embed: bool) -> Fragment {
    Fragment::new(NodeKind::Entity {
        kind: EntityKind::Npub,
        identifier: identifier.into(),
        is_embed,
    })
}

fn code_block(code: &str) -> Fragment {
    Fragment::new(NodeKind::CodeBlock {
        language: None,
        code: code.into(),
    })
}

fn between(open: &str, inner: Fragment, close: &str) -> Vec<Fragment> {
    vec![Fragment::paragraph(vec![
        Fragment::text(open),
        inner,
        Fragment::text(close),
    ])]
}

#[rstest]
#[case::audio_then_word(vec![Fragment::paragraph(vec![audio(), Fragment::text("x")])])]
#[case::word_then_audio(vec![Fragment::paragraph(vec![Fragment::text("x"), audio()])])]
#[case::video_then_period(vec![Fragment::paragraph(vec![video(), Fragment::text(".")])])]
#[case::embed_then_word(vec![Fragment::paragraph(vec![npub("npub1abc", true), Fragment::text("def")])])]
#[case::mention_then_comma(vec![Fragment::paragraph(vec![npub("npub1abc", false), Fragment::text(", hi")])])]
#[case::two_mentions(vec![Fragment::paragraph(vec![npub("npub1abc", false), npub("npub1def", true)])])]
#[case::code_with_fence(vec![code_block("a\n```\nb")])]
#[case::code_with_long_fence(vec![code_block("````"), Fragment::paragraph(vec![Fragment::text("after")])])]
#[case::code_with_backticks(vec![code_block("let s = `x`;\n  ```inner")])]
#[case::bold_in_parens(between("(", run("x", TextFormat::bold()), ")."))]
#[case::italic_in_parens(between("(", run("x", TextFormat::italic()), ")."))]
#[case::strike_in_parens(between("(", run("x", TextFormat::strikethrough()), ")."))]
#[case::code_in_parens(between("(", run("x", TextFormat::code()), ")."))]
#[case::italic_after_word(between("a", run("b", TextFormat::italic()), ","))]
#[case::bold_before_bang(between("\"", run("x", TextFormat::bold()), "\"!"))]
fn built_documents_export_stably(#[case] blocks: Vec<Fragment>) {
    let doc = Document::from_fragments(blocks).unwrap();
    let once = to_markdown(&doc);
    let twice = to_markdown(&from_markdown(&once));
    assert_eq!(twice, once);
}

fn inline_types(md: &str) -> Vec<NodeType> {
    let doc = from_markdown(md);
    let block = doc.root_children()[0];
    doc.children(block)
        .iter()
        .filter_map(|k| doc.node_type(*k))
        .collect()
}

#[test]
fn leaves_touching_text_survive_reimport() {
    let doc = Document::from_fragments(vec![Fragment::paragraph(vec![
        audio(),
        Fragment::text("x "),
        npub("npub1abc", true),
        Fragment::text("def"),
    ])])
    .unwrap();
    assert_eq!(
        inline_types(&to_markdown(&doc)),
        vec![NodeType::Audio, NodeType::TextRun, NodeType::NpubRef, NodeType::TextRun]
    );
}

#[test]
fn code_containing_a_fence_stays_one_block() {
    let doc = Document::from_fragments(vec![code_block("a\n```\nb")]).unwrap();
    let again = from_markdown(&to_markdown(&doc));
    assert_eq!(format_tree(&again), format_tree(&doc));
}

#[test]
fn reimport_has_the_same_tree() {
    let input = "# T\n\n- **a** b\n  - [c](https://x.io)\n\n> q _r_\n\n| h |\n| --- |\n| `v` |";
    let doc = from_markdown(input);
    let again = from_markdown(&to_markdown(&doc));
    assert_eq!(format_tree(&again), format_tree(&doc));
}

fn cmark_blocks(md: &str) -> Vec<&'static str> {
    let mut depth = 0usize;
    let mut out = Vec::new();
    for event in Parser::new_ext(md, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH) {
        match event {
            Event::Start(tag) => {
                if depth == 0 {
                    out.push(match tag {
                        Tag::Paragraph => "paragraph",
                        Tag::Heading { .. } => "heading",
                        Tag::List(_) => "list",
                        Tag::BlockQuote(_) => "quote",
                        Tag::CodeBlock(_) => "code-block",
                        Tag::Table(_) => "table",
                        _ => "other",
                    });
                }
                depth += 1;
            }
            Event::End(_) => depth -= 1,
            Event::Rule if depth == 0 => out.push("horizontal-rule"),
            _ => {}
        }
    }
    out
}

#[test]
fn commonmark_reads_the_same_blocks() {
    let input = "# T\n\npara\n\n- a\n  - b\n\n1. x\n\n> q\n\n---\n\n```\ncode\n```\n\n| a | b |\n| --- | --- |\n| 1 | 2 |";
    let doc = from_markdown(input);
    let ours: Vec<&str> = doc
        .root_children()
        .iter()
        .filter_map(|k| doc.node_type(*k))
        .map(|t| t.label())
        .collect();
    assert_eq!(cmark_blocks(&to_markdown(&doc)), ours);
}
