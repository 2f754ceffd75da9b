//! Escaping for plain text so it re-imports as plain text.

use std::sync::LazyLock;

use regex::Regex;

use super::registry;

/// Characters that are inline syntax anywhere in a line.
const INLINE_SYNTAX: &[char] = &['\\', '*', '_', '~', '`', '[', ']', '|', '<'];

/// Bare url shapes that the url transformers would pick up.
static URL_SHAPES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)https?:|youtu\.be|youtube\.com").unwrap());

pub fn escape_text(text: &str, before_link: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if INLINE_SYNTAX.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    if URL_SHAPES.is_match(&out) {
        out = URL_SHAPES
            .replace_all(&out, |caps: &regex::Captures<'_>| {
                let m = &caps[0];
                match m.find([':', '.']) {
                    Some(i) => format!("{}\\{}", &m[..i], &m[i..]),
                    None => m.to_string(),
                }
            })
            .into_owned();
    }
    if before_link && out.ends_with('!') {
        out.insert(out.len() - 1, '\\');
    }
    out
}

/// Escapes every line that would otherwise start a block, by putting a
/// backslash before its first ASCII punctuation character.
pub fn escape_block_starts(text: &str) -> String {
    let registry = registry();
    text.split('\n')
        .map(|line| {
            if !registry.line_starts_block(line) {
                return line.to_string();
            }
            match line.char_indices().find(|(_, c)| c.is_ascii_punctuation()) {
                Some((i, _)) => format!("{}\\{}", &line[..i], &line[i..]),
                None => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Percent-encodes the characters that cannot appear in a link
/// destination or would be read as inline syntax inside one.
pub fn encode_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for c in url.chars() {
        match c {
            ' ' => out.push_str("%20"),
            '(' => out.push_str("%28"),
            ')' => out.push_str("%29"),
            '*' => out.push_str("%2A"),
            '~' => out.push_str("%7E"),
            '`' => out.push_str("%60"),
            '[' => out.push_str("%5B"),
            ']' => out.push_str("%5D"),
            '<' => out.push_str("%3C"),
            '>' => out.push_str("%3E"),
            '\\' => out.push_str("%5C"),
            c if c.is_ascii_whitespace() => out.push_str(&format!("%{:02X}", u32::from(c))),
            c => out.push(c),
        }
    }
    out
}

/// Whether an `_` delimiter placed after `prev` would be read as opening
/// emphasis. Otherwise `*` is used.
pub fn underscore_may_open_after(prev: Option<char>) -> bool {
    match prev {
        None => true,
        Some(c) => c.is_whitespace() || "([{\"'*~".contains(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("plain", "plain")]
    #[case("a_b", r"a\_b")]
    #[case("x|y", r"x\|y")]
    #[case(r"back\slash", r"back\\slash")]
    #[case("see https://x.io", r"see https\://x.io")]
    #[case("youtu.be/abc", r"youtu\.be/abc")]
    #[case("<https://x.io>", r"\<https\://x.io>")]
    fn escapes_inline_syntax(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_text(input, false), expected);
    }

    #[test]
    fn trailing_bang_only_before_links() {
        assert_eq!(escape_text("hey!", false), "hey!");
        assert_eq!(escape_text("hey!", true), r"hey\!");
    }

    #[rstest]
    #[case("# x", r"\# x")]
    #[case("  - item", r"  \- item")]
    #[case("3. third", r"3\. third")]
    #[case("> said", r"\> said")]
    #[case("ordinary", "ordinary")]
    #[case("a\n---", "a\n\\---")]
    fn escapes_block_starts(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_block_starts(input), expected);
    }

    #[test]
    fn encode_url_keeps_ordinary_urls() {
        assert_eq!(encode_url("https://x.io/a_b?c=d"), "https://x.io/a_b?c=d");
        assert_eq!(encode_url("https://x.io/a (1)"), "https://x.io/a%20%281%29");
    }

    #[test]
    fn underscore_after_word_is_refused() {
        assert!(underscore_may_open_after(None));
        assert!(underscore_may_open_after(Some(' ')));
        assert!(underscore_may_open_after(Some('*')));
        assert!(!underscore_may_open_after(Some('a')));
        assert!(!underscore_may_open_after(Some('.')));
    }
}
