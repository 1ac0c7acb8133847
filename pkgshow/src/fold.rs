//! Folding aggregator
//!
//! Walks the ranked hits once. A hit whose package path extends an earlier
//! top-level entry (by at least three leading segments) is folded under it;
//! everything else becomes a top-level entry. Only top-level entries inside
//! the requested window are enriched, which bounds the number of full-record
//! lookups and snippet selections per request by the page size.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::highlight::mark_text;
use crate::interface::{
    Hit, PackageLookup, Range, SearchResult, ShowDocInfo, ShowResults, SnippetSelector,
    SubProjectInfo, TokenSet,
};
use crate::models::clamp_star_count;
use crate::package::package_show_name;
use crate::readme::{readme_to_text, truncate_chars};

/// Character budget for the summary excerpt.
pub const DEFAULT_SNIPPET_LEN: usize = 300;

/// Readme text beyond this many characters is ignored for snippets.
pub const README_MAX_CHARS: usize = 20 * 1024;

/// Shortest path prefix (in segments) a hit can fold under.
const MIN_FOLD_SEGMENTS: usize = 3;

/// Tunables for the enrichment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldLimits {
    pub snippet_len: usize,
    pub readme_max_chars: usize,
}

impl Default for FoldLimits {
    fn default() -> Self {
        Self {
            snippet_len: DEFAULT_SNIPPET_LEN,
            readme_max_chars: README_MAX_CHARS,
        }
    }
}

/// A windowed top-level entry waiting for enrichment.
struct PendingDoc<'r> {
    hit: &'r Hit,
    index: usize,
    show_name: String,
    subs: Vec<SubProjectInfo>,
}

/// Byte length of the first `segments` `/`-separated parts of `package`.
fn prefix_len(parts: &[&str], segments: usize) -> usize {
    parts[..segments].iter().map(|p| p.len()).sum::<usize>() + segments - 1
}

/// Turns ranked hits into folded, highlighted rows for one page.
///
/// Holds no state between calls; `fold` builds its prefix map from scratch
/// every time, so one aggregator can serve concurrent requests.
pub struct FoldingAggregator<'a, L: ?Sized, S: ?Sized> {
    lookup: &'a L,
    snippets: &'a S,
    limits: FoldLimits,
}

impl<'a, L, S> FoldingAggregator<'a, L, S>
where
    L: PackageLookup + ?Sized,
    S: SnippetSelector + ?Sized,
{
    pub fn new(lookup: &'a L, snippets: &'a S) -> Self {
        Self {
            lookup,
            snippets,
            limits: FoldLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: FoldLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Fold `results` and materialize the entries inside `window`.
    pub fn fold(&self, results: &SearchResult, tokens: &TokenSet, window: Range) -> ShowResults {
        let mut prefix_to_idx: HashMap<&str, usize> = HashMap::new();
        let mut pending: Vec<PendingDoc<'_>> =
            Vec::with_capacity(window.count.min(results.hits.len()));
        let mut folded = 0;
        let mut cnt = 0;

        'hits: for hit in &results.hits {
            let show_name = package_show_name(&hit.name, &hit.package);

            let parts: Vec<&str> = hit.package.split('/').collect();
            if parts.len() >= MIN_FOLD_SEGMENTS {
                for segments in (MIN_FOLD_SEGMENTS..=parts.len()).rev() {
                    let split_at = prefix_len(&parts, segments);
                    let Some(&idx) = prefix_to_idx.get(&hit.package[..split_at]) else {
                        continue;
                    };
                    if window.contains(idx) {
                        pending[idx - window.start].subs.push(SubProjectInfo {
                            marked_name: mark_text(&show_name, tokens),
                            package: hit.package.clone(),
                            sub_path: format!("/{}", parts[segments..].join("/")),
                            info: hit.synopsis.clone(),
                        });
                    }
                    folded += 1;
                    continue 'hits;
                }
            }

            prefix_to_idx.insert(hit.package.as_str(), cnt);
            if window.contains(cnt) {
                pending.push(PendingDoc {
                    hit,
                    index: cnt,
                    show_name,
                    subs: Vec::new(),
                });
            }
            cnt += 1;
        }

        // Indexed parallel map keeps rank order in the collected Vec
        let docs: Vec<ShowDocInfo> = pending
            .into_par_iter()
            .map(|doc| self.enrich(doc, tokens))
            .collect();

        debug!(
            hits = results.hits.len(),
            total_entries = cnt,
            folded,
            docs = docs.len(),
            window_start = window.start,
            "folded search hits"
        );

        ShowResults {
            total_results: results.total_results,
            total_entries: cnt,
            folded,
            docs,
        }
    }

    /// Full-record lookup, snippet selection and highlighting for one entry.
    fn enrich(&self, doc: PendingDoc<'_>, tokens: &TokenSet) -> ShowDocInfo {
        let PendingDoc { hit, index, show_name, subs } = doc;

        let (mut description, readme) = match self.lookup.find_full_package(&hit.package) {
            Ok(Some(full)) => {
                let readme = readme_to_text(&full.readme_fn, &full.readme_data);
                let readme = truncate_chars(&readme, self.limits.readme_max_chars).to_string();
                (full.description, readme)
            }
            Ok(None) => (hit.description.clone(), String::new()),
            Err(e) => {
                warn!(package = %hit.package, error = %e, "full package lookup failed, using hit description");
                (hit.description.clone(), String::new())
            }
        };

        for sentence in &hit.important_sentences {
            description.push('\n');
            description.push_str(sentence);
        }
        description.push('\n');
        description.push_str(&readme);

        let raw = self
            .snippets
            .select_snippet(&description, tokens, self.limits.snippet_len);

        let mut shown = hit.clone();
        shown.star_count = clamp_star_count(shown.star_count);
        shown.name = show_name;

        ShowDocInfo {
            marked_name: mark_text(&shown.name, tokens),
            marked_package: mark_text(&shown.package, tokens),
            summary: mark_text(&raw, tokens),
            index: index + 1,
            hit: shown,
            subs,
        }
    }
}
