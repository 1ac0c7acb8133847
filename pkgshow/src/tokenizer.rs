//! Rune classification shared by indexing and display.
//!
//! The tantivy index and the highlighter both split text with `tokenize`, so a
//! term that was indexed is always a term that can be highlighted.

use crate::interface::TokenSet;

/// How a rune relates to the token being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuneType {
    /// Not part of any token
    Separator,
    /// Begins a new token
    Start,
    /// Continues the current token
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Separator,
    Token,
}

/// A byte range of the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub kind: SpanKind,
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    pub fn is_token(&self) -> bool {
        self.kind == SpanKind::Token
    }
}

/// Classify `current` given the rune before it.
///
/// Non-ASCII letters and ideographs are single-rune tokens; ASCII letters and
/// digits form runs of their own class, so `utf8` splits into `utf` and `8`.
pub fn classify_rune(last: char, current: char) -> RuneType {
    if !current.is_alphanumeric() {
        return RuneType::Separator;
    }
    if !current.is_ascii() {
        return RuneType::Start;
    }
    if current.is_alphabetic() {
        if last.is_alphabetic() {
            return RuneType::Body;
        }
        return RuneType::Start;
    }
    if current.is_numeric() && last.is_numeric() {
        return RuneType::Body;
    }
    RuneType::Start
}

/// Split `text` into separator and token spans.
///
/// The spans cover the input contiguously with no gaps or overlaps.
/// Consecutive separator runes share one span; two tokens can be adjacent
/// when the classification starts a new token mid-word.
pub fn tokenize(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut current: Option<Span> = None;
    let mut last = '\0';

    for (i, c) in text.char_indices() {
        let end = i + c.len_utf8();
        let rune_type = classify_rune(last, c);
        last = c;

        if let Some(span) = current.as_mut() {
            let extends = match rune_type {
                RuneType::Separator => span.kind == SpanKind::Separator,
                RuneType::Body => span.kind == SpanKind::Token,
                RuneType::Start => false,
            };
            if extends {
                span.end = end;
                continue;
            }
        }

        let kind = if rune_type == RuneType::Separator {
            SpanKind::Separator
        } else {
            SpanKind::Token
        };
        if let Some(done) = current.replace(Span { kind, start: i, end }) {
            spans.push(done);
        }
    }

    if let Some(done) = current {
        spans.push(done);
    }
    spans
}

/// Token spans only, with their text.
pub fn token_words(text: &str) -> impl Iterator<Item = (Span, &str)> + '_ {
    tokenize(text)
        .into_iter()
        .filter(Span::is_token)
        .map(move |span| (span, span.text(text)))
}

/// Canonical form used for set membership.
pub fn normalize(token: &str) -> String {
    token.to_lowercase()
}

/// Build the normalized token set of a query string.
pub fn tokens_of(text: &str) -> TokenSet {
    token_words(text).map(|(_, word)| normalize(word)).collect()
}
