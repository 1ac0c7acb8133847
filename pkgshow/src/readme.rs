//! Readme to plain text
//!
//! Only markdown gets any treatment; other readme formats are already close
//! enough to plain text for snippet selection.

use once_cell::sync::Lazy;
use regex::Regex;

static FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*(```|~~~).*$").unwrap());
static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]{0,3}#{1,6}[ \t]*").unwrap());
static SETEXT_RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*(=+|-{3,}|\*{3,})[ \t]*$").unwrap());
static IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\](\([^)]*\)|\[[^\]]*\])").unwrap());
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap());
// `[text][ref]` and the collapsed `[text][]`
static REF_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\[[^\]]*\]").unwrap());
static REF_DEF: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*\[[^\]]+\]:[ \t]*\S+.*$").unwrap());
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[A-Za-z][^>]*>").unwrap());
static CODE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"`+([^`\n]+)`+").unwrap());
static STRONG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*|__(.+?)__").unwrap());
static EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*\n]+)\*|\b_([^_\n]+)_\b").unwrap());
static LIST_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*([-*+]|\d+\.)[ \t]+").unwrap());
static QUOTE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*>[ \t]?").unwrap());
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Whether a readme file name denotes markdown.
pub fn is_markdown(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    [".md", ".markdown", ".mdown", ".mkd"].iter().any(|ext| lower.ends_with(ext))
}

/// Plain-text rendering of a readme.
pub fn readme_to_text(file_name: &str, raw: &str) -> String {
    if !is_markdown(file_name) {
        return raw.to_string();
    }
    markdown_to_text(raw)
}

/// Drop markdown syntax while keeping the readable words.
pub fn markdown_to_text(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n");
    let text = FENCE.replace_all(&text, "");
    let text = REF_DEF.replace_all(&text, "");
    let text = SETEXT_RULE.replace_all(&text, "");
    let text = HEADING.replace_all(&text, "");
    let text = IMAGE.replace_all(&text, "$1");
    let text = LINK.replace_all(&text, "$1");
    let text = REF_LINK.replace_all(&text, "$1");
    let text = HTML_TAG.replace_all(&text, "");
    let text = LIST_MARKER.replace_all(&text, "");
    let text = CODE_SPAN.replace_all(&text, "$1");
    // Strong before emphasis so `***x***` and `**a *b* c**` unwrap fully
    let text = STRONG.replace_all(&text, "$1$2");
    let text = EMPHASIS.replace_all(&text, "$1$2");
    let text = QUOTE_MARKER.replace_all(&text, "");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Keep at most `max_chars` characters of `text`, cutting on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
