//! Query-term highlighting into escaped HTML.

use crate::interface::{Markup, TokenSet};
use crate::tokenizer::{normalize, tokenize};

/// Append `text` to `out` with HTML metacharacters escaped.
///
/// NUL is replaced with U+FFFD since it can't be represented in HTML text.
pub fn escape_html(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            '\0' => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
}

/// Wrap an escaped word in `<b>` tags.
pub fn mark_word(out: &mut String, word: &str) {
    out.push_str("<b>");
    escape_html(out, word);
    out.push_str("</b>");
}

/// Highlight every token of `text` whose normalized form is in `tokens`.
pub fn mark_text(text: &str, tokens: &TokenSet) -> Markup {
    mark_text_with(text, tokens, mark_word)
}

/// Like `mark_text` but with a caller-supplied marker for matched tokens.
///
/// Output order mirrors the input exactly; the marker receives the raw token
/// and is responsible for escaping it.
pub fn mark_text_with<F>(text: &str, tokens: &TokenSet, mut mark: F) -> Markup
where
    F: FnMut(&mut String, &str),
{
    if text.is_empty() {
        return Markup::default();
    }

    let mut out = String::with_capacity(text.len() + text.len() / 4);
    for span in tokenize(text) {
        let piece = span.text(text);
        if span.is_token() && tokens.contains(&normalize(piece)) {
            mark(&mut out, piece);
        } else {
            escape_html(&mut out, piece);
        }
    }
    Markup::from_escaped(out)
}
