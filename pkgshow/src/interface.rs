//! pkgshow Interface Definition
//!
//! Request-scoped types shared by the folding, highlighting and pagination
//! code, plus the collaborator traits the engine consumes. Everything here is
//! built fresh per search request and dropped once the page is rendered.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::FullPackage;

// ═══════════════════════════════════════════════════════════════════════════════
// INPUT RECORDS
// ═══════════════════════════════════════════════════════════════════════════════

/// One ranked hit as returned by the search index.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Hit {
    /// Import-path-like identifier, unique per package
    pub package: String,
    /// Display name; may be empty or the sentinel `"main"`
    pub name: String,
    pub synopsis: String,
    pub description: String,
    pub important_sentences: Vec<String>,
    pub readme_fn: String,
    pub readme_data: String,
    /// Negative means "not yet known"
    pub star_count: i64,
    /// Zero-based static rank
    pub static_rank: i64,
}

/// Ranked hits plus the index's own estimate of how many documents matched.
///
/// `hits` is in authoritative rank order and is never reordered downstream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SearchResult {
    pub total_results: usize,
    pub hits: Vec<Hit>,
}

/// Normalized query terms, used only for membership checks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenSet(HashSet<String>);

impl TokenSet {
    pub fn new() -> Self {
        Self(HashSet::new())
    }

    /// Insert an already-normalized token
    pub fn insert(&mut self, token: impl Into<String>) -> bool {
        self.0.insert(token.into())
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for TokenSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Half-open window `[start, start + count)` over top-level entry indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Range {
    pub start: usize,
    pub count: usize,
}

impl Range {
    pub fn new(start: usize, count: usize) -> Self {
        Self { start, count }
    }

    pub fn contains(&self, idx: usize) -> bool {
        idx >= self.start && idx - self.start < self.count
    }

    /// Exclusive upper bound, saturating instead of overflowing
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.count)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT RECORDS
// ═══════════════════════════════════════════════════════════════════════════════

/// HTML that has already been escaped and may be emitted verbatim.
///
/// Only the highlighter constructs values of this type, so anything carried in
/// a `Markup` has gone through `escape_html`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Markup(String);

impl Markup {
    pub(crate) fn from_escaped(html: String) -> Self {
        Self(html)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A hit folded under an earlier top-level entry of the same project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubProjectInfo {
    pub marked_name: Markup,
    pub package: String,
    /// Path of the folded package relative to its parent, starting with `/`
    pub sub_path: String,
    pub info: String,
}

/// One rendered top-level row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShowDocInfo {
    #[serde(flatten)]
    pub hit: Hit,
    /// 1-based position among top-level entries
    pub index: usize,
    pub summary: Markup,
    pub marked_name: Markup,
    pub marked_package: Markup,
    pub subs: Vec<SubProjectInfo>,
}

/// Folded, windowed view over one `SearchResult`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ShowResults {
    /// Passed through from the index estimate
    pub total_results: usize,
    /// Top-level entries across the whole hit list, not only the window
    pub total_entries: usize,
    pub folded: usize,
    pub docs: Vec<ShowDocInfo>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Error type for pkgshow operations
#[derive(Debug, Error)]
pub enum PkgShowError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Index error: {0}")]
    IndexError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Search timed out after {0} ms")]
    Timeout(u64),
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<crate::database::DatabaseError> for PkgShowError {
    fn from(e: crate::database::DatabaseError) -> Self {
        PkgShowError::DatabaseError(e.to_string())
    }
}

impl From<crate::indexer::IndexerError> for PkgShowError {
    fn from(e: crate::indexer::IndexerError) -> Self {
        PkgShowError::IndexError(e.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLABORATORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Produces ranked hits for a query. Ranking is entirely the source's business.
pub trait HitSource: Send + Sync {
    /// Returns the ranked hits and the normalized query token set.
    fn search(&self, query: &str) -> Result<(SearchResult, TokenSet), PkgShowError>;
}

/// Point lookup of the heavyweight package record.
pub trait PackageLookup: Send + Sync {
    fn find_full_package(&self, package: &str) -> Result<Option<FullPackage>, PkgShowError>;
}

/// Chooses a short excerpt of `text`, biased toward `tokens`.
pub trait SnippetSelector: Send + Sync {
    fn select_snippet(&self, text: &str, tokens: &TokenSet, max_len: usize) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_contains_is_half_open() {
        let r = Range::new(10, 10);
        assert!(!r.contains(9));
        assert!(r.contains(10));
        assert!(r.contains(19));
        assert!(!r.contains(20));
    }

    #[test]
    fn test_range_does_not_overflow() {
        let r = Range::new(usize::MAX - 1, 10);
        assert!(r.contains(usize::MAX));
        assert_eq!(r.end(), usize::MAX);
    }

    #[test]
    fn test_empty_range_contains_nothing() {
        let r = Range::new(0, 0);
        assert!(!r.contains(0));
    }

    #[test]
    fn test_token_set_collects() {
        let tokens: TokenSet = ["go", "json"].into_iter().collect();
        assert!(tokens.contains("go"));
        assert!(!tokens.contains("xml"));
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_markup_serializes_as_plain_string() {
        let m = Markup::from_escaped("<b>go</b>".to_string());
        assert_eq!(serde_json::to_string(&m).unwrap(), "\"<b>go</b>\"");
    }
}
