//! Key-free text rendering of a document tree, for snapshot tests and
//! debugging output.

use super::{Document, Fragment, NodeKind, TextFormat};

/// One node per line, children indented two spaces, text payloads quoted.
pub fn format_tree(doc: &Document) -> String {
    let mut out = String::new();
    for block in doc.to_fragments() {
        write_node(&block, 0, &mut out);
    }
    out
}

fn write_node(f: &Fragment, indent: usize, out: &mut String) {
    out.push_str(&"  ".repeat(indent));
    out.push_str(&label(&f.kind));
    if let Some(text) = super::rendered_text(&f.kind) {
        out.push_str(&format!(" {text:?}"));
    }
    out.push('\n');
    for child in &f.children {
        write_node(child, indent + 1, out);
    }
}

fn label(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Paragraph => "Paragraph".into(),
        NodeKind::Heading { level } => format!("Heading({level})"),
        NodeKind::List { ordered: true } => "List(ordered)".into(),
        NodeKind::List { ordered: false } => "List(bullet)".into(),
        NodeKind::ListItem { indent } => format!("Item({indent})"),
        NodeKind::Quote => "Quote".into(),
        NodeKind::HorizontalRule => "Rule".into(),
        NodeKind::CodeBlock { language, .. } => {
            format!("Code({})", language.as_deref().unwrap_or(""))
        }
        NodeKind::Table => "Table".into(),
        NodeKind::TableRow => "Row".into(),
        NodeKind::TableCell { header: true, .. } => "HeaderCell".into(),
        NodeKind::TableCell { header: false, .. } => "Cell".into(),
        NodeKind::Text { format, .. } => text_label(*format),
        NodeKind::Link { url, .. } => format!("Link({url})"),
        NodeKind::Image { url, alt } => format!("Image({url}, {alt:?})"),
        NodeKind::Audio { url } => format!("Audio({url})"),
        NodeKind::YouTube { video_id } => format!("YouTube({video_id})"),
        NodeKind::Entity {
            kind,
            identifier,
            is_embed,
        } => format!(
            "{kind:?}({identifier}{})",
            if *is_embed { ", embed" } else { "" }
        ),
        NodeKind::CollapseMarker => "Marker".into(),
    }
}

fn text_label(format: TextFormat) -> String {
    let mut flags = Vec::new();
    if format.bold {
        flags.push("bold");
    }
    if format.italic {
        flags.push("italic");
    }
    if format.strikethrough {
        flags.push("strike");
    }
    if format.code {
        flags.push("code");
    }
    if flags.is_empty() {
        "Text".into()
    } else {
        format!("Text({})", flags.join("+"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Fragment;
    use insta::assert_snapshot;

    #[test]
    fn renders_nested_blocks() {
        let doc = Document::from_fragments(vec![
            Fragment::heading(2, vec![Fragment::text("Hi"), Fragment::new(NodeKind::CollapseMarker)]),
            Fragment::paragraph(vec![Fragment::new(NodeKind::Text {
                text: "a\nb".into(),
                format: TextFormat::bold().union(TextFormat::code()),
            })]),
        ])
        .unwrap();
        assert_snapshot!(format_tree(&doc), @r#"
        Heading(2)
          Text "Hi"
          Marker
        Paragraph
          Text(bold+code) "a\nb"
        "#);
    }
}
