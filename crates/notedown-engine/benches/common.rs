pub fn generate_markdown_content(size: usize) -> String {
    let base = "# Title\n\n## Section\n\nParagraph with **bold**, _italic_ and a [link](https://example.com).\n\n- Bullet point\n  - Nested item with `code`\n- Another item\n\n| a | b |\n| --- | --- |\n| 1 | 2 |\n\nSee nostr:npub1qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqq and https://youtu.be/dQw4w9WgXcQ\n\n```rust\nfn example() {\n    println!(\"Hello\");\n}\n```\n\n";
    base.repeat(size)
}

pub fn generate_sections(sections: usize, depth: usize) -> String {
    let mut content = String::new();
    for section in 0..sections {
        content.push_str(&format!("# Section {section}\n\n"));
        for level in 2..(2 + depth).min(7) {
            content.push_str(&format!("{} Level {level}\n\n", "#".repeat(level)));
            content.push_str("Some paragraph content with ~~several~~ sentences.\n\n");
        }
    }
    content
}
