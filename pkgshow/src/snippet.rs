//! Snippet selection around query matches.
//!
//! Picks the densest cluster of matched tokens, takes a window of at most
//! `max_len` characters around it, collapses whitespace and marks truncated
//! sides with an ellipsis. Highlighting happens afterwards on the result.

use crate::interface::{SnippetSelector, TokenSet};
use crate::tokenizer::{normalize, tokenize};

/// Width of the sliding window used to find the densest cluster, and the cap
/// on context kept before a match.
pub const SNIPPET_CONTEXT_CHARS: usize = 200;

/// How far past a snippet start we look for a word boundary.
const WORD_BOUNDARY_LOOKAHEAD: usize = 10;

const ELLIPSIS: char = '\u{2026}';

/// Default `SnippetSelector`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DensestSnippets;

impl SnippetSelector for DensestSnippets {
    fn select_snippet(&self, text: &str, tokens: &TokenSet, max_len: usize) -> String {
        select_snippet(text, tokens, max_len)
    }
}

/// Excerpt of `text` no longer than `max_len` characters, biased toward `tokens`.
pub fn select_snippet(text: &str, tokens: &TokenSet, max_len: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let matches = match_ranges(text, tokens);
    generate_snippet(text, &matches, max_len)
}

/// Char ranges of tokens in `text` whose normalized form is in `tokens`.
pub(crate) fn match_ranges(text: &str, tokens: &TokenSet) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut char_pos = 0;
    for span in tokenize(text) {
        let piece = span.text(text);
        let char_len = piece.chars().count();
        if span.is_token() && tokens.contains(&normalize(piece)) {
            ranges.push((char_pos, char_pos + char_len));
        }
        char_pos += char_len;
    }
    ranges
}

/// Index of the match that starts the densest cluster, by matched chars per window.
pub(crate) fn find_densest_match(matches: &[(usize, usize)], window_size: usize) -> Option<usize> {
    if matches.is_empty() {
        return None;
    }
    if matches.len() == 1 {
        return Some(0);
    }

    let mut left = 0;
    let mut best_left = 0;
    let mut best_coverage = 0;
    let mut current_coverage = 0;

    for right in 0..matches.len() {
        while matches[left].0 + window_size <= matches[right].0 {
            current_coverage -= matches[left].1 - matches[left].0;
            left += 1;
        }
        current_coverage += matches[right].1 - matches[right].0;

        if current_coverage > best_coverage {
            best_coverage = current_coverage;
            best_left = left;
        }
    }

    Some(best_left)
}

/// Cut a snippet of at most `max_len` chars from `content` around the densest matches.
pub(crate) fn generate_snippet(content: &str, matches: &[(usize, usize)], max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }
    let chars: Vec<char> = content.chars().collect();
    let content_len = chars.len();

    let (start, end) = match find_densest_match(matches, SNIPPET_CONTEXT_CHARS) {
        None => (0, content_len),
        Some(idx) => {
            let (match_start, match_end) = matches[idx];
            let remaining = max_len.saturating_sub(match_end - match_start);
            let context_before = (remaining / 2).min(SNIPPET_CONTEXT_CHARS).min(match_start);
            let context_after = (remaining - context_before).min(content_len - match_end);

            let mut start = match_start - context_before;
            if start > 0 && !chars[start - 1].is_whitespace() {
                // Skip the partial word we landed in, without passing the match
                let limit = (start + WORD_BOUNDARY_LOOKAHEAD).min(match_start);
                if let Some(pos) = chars[start..limit].iter().position(|c| c.is_whitespace()) {
                    start += pos + 1;
                }
            }
            (start, (match_end + context_after).min(content_len))
        }
    };

    // A one-char budget has no room for both ellipses
    let prefix = usize::from(start > 0 && max_len > 1);
    let (mut body, cut) = normalize_snippet(&chars[start..end], max_len.saturating_sub(prefix));
    let suffix = cut || end < content_len;
    if suffix && body.chars().count() + prefix + 1 > max_len {
        body.pop();
        let trimmed_len = body.trim_end().len();
        body.truncate(trimmed_len);
    }

    let mut snippet = String::with_capacity(body.len() + 6);
    if prefix > 0 {
        snippet.push(ELLIPSIS);
    }
    snippet.push_str(&body);
    if suffix {
        snippet.push(ELLIPSIS);
    }
    snippet
}

/// Collapse whitespace runs to single spaces and cap at `max_chars`.
///
/// Returns the text and whether anything was cut off.
fn normalize_snippet(chars: &[char], max_chars: usize) -> (String, bool) {
    let mut result = String::with_capacity(max_chars.min(chars.len()));
    let mut count = 0;
    let mut last_was_space = true;
    let mut cut = false;

    for &c in chars {
        let c = if c.is_whitespace() { ' ' } else { c };
        if c == ' ' {
            if last_was_space {
                continue;
            }
            last_was_space = true;
        } else {
            last_was_space = false;
        }
        if count >= max_chars {
            cut = true;
            break;
        }
        result.push(c);
        count += 1;
    }

    if result.ends_with(' ') {
        result.pop();
    }
    (result, cut)
}
