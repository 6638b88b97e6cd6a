//! HTML and text normalization
//!
//! [`clean`] is applied to every extracted fragment before it is stored or
//! scored. It is idempotent: cleaning an already clean fragment is a no-op.

use regex::Regex;
use std::sync::OnceLock;

fn script_style_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
            .expect("script/style regex is valid")
    })
}

fn comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("comment regex is valid"))
}

fn inline_whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]+").expect("whitespace regex is valid"))
}

fn blank_lines_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n(?:[ \t]*\n)+").expect("blank line regex is valid"))
}

fn line_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<br\b[^>]*>").expect("br regex is valid"))
}

fn paragraph_end_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</p\s*>").expect("paragraph regex is valid"))
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag regex is valid"))
}

/// Normalizes a raw HTML fragment
///
/// Steps, in order:
/// 1. drop non-printable characters except newline and tab
/// 2. remove `<script>`/`<style>` blocks (with content) and HTML comments,
///    repeating until none remain
/// 3. collapse runs of spaces/tabs to one space and runs of blank lines to
///    a single blank line, then trim
pub fn clean(html: &str) -> String {
    let mut current = strip_non_printable(html);

    // Removing one block can splice the halves of another together
    loop {
        let stripped = strip_blocks(&current);
        if stripped == current {
            break;
        }
        current = stripped;
    }

    normalize_whitespace(&current)
}

/// Converts an HTML fragment to plain text
///
/// Line breaks become newlines, closing paragraphs become blank lines, all other
/// tags are dropped and the common character entities are decoded.
pub fn html_to_text(html: &str) -> String {
    let cleaned = clean(html);

    let text = line_break_re().replace_all(&cleaned, "\n");
    let text = paragraph_end_re().replace_all(&text, "\n\n");
    let text = tag_re().replace_all(&text, "");
    let text = decode_entities(&text);

    normalize_whitespace(&strip_non_printable(&text))
}

fn strip_non_printable(input: &str) -> String {
    input.chars().filter(|c| is_printable(*c)).collect()
}

/// Plain space, newline and tab are the only whitespace kept
fn is_printable(c: char) -> bool {
    match c {
        ' ' | '\n' | '\t' => true,
        c if c.is_control() || c.is_whitespace() => false,
        _ => !is_format_char(c),
    }
}

/// Invisible formatting characters (Unicode category Cf)
fn is_format_char(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{0600}'..='\u{0605}'
            | '\u{061C}'
            | '\u{06DD}'
            | '\u{070F}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206F}'
            | '\u{FEFF}'
            | '\u{FFF9}'..='\u{FFFB}'
    )
}

fn strip_blocks(input: &str) -> String {
    let without_code = script_style_re().replace_all(input, "");
    comment_re().replace_all(&without_code, "").into_owned()
}

fn normalize_whitespace(input: &str) -> String {
    let collapsed = inline_whitespace_re().replace_all(input, " ");
    let collapsed = blank_lines_re().replace_all(&collapsed, "\n\n");
    collapsed.trim().to_string()
}

fn decode_entities(input: &str) -> String {
    // &amp; last so that "&amp;lt;" decodes to "&lt;", not "<"
    input
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
