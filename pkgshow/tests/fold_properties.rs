//! Folding, highlighting and pagination properties over generated hit lists

use std::collections::HashSet;

use pkgshow::highlight::mark_text;
use pkgshow::snippet::DensestSnippets;
use pkgshow::{
    paginate, FoldingAggregator, FullPackage, Hit, PackageLookup, PkgShowError, Range,
    SearchResult, TokenSet,
};

/// Lookup with no records: every entry falls back to its hit description.
struct NoRecords;

impl PackageLookup for NoRecords {
    fn find_full_package(&self, _package: &str) -> Result<Option<FullPackage>, PkgShowError> {
        Ok(None)
    }
}

fn hit(package: &str) -> Hit {
    Hit {
        package: package.to_string(),
        name: package.rsplit('/').next().unwrap_or_default().to_string(),
        synopsis: format!("about {}", package),
        description: format!("The {} package.", package),
        star_count: -1,
        ..Default::default()
    }
}

/// Deterministic pseudo-random hit list mixing projects and their sub-packages.
///
/// Package ids are unique, as an index returns each package once; at most `n` hits.
fn generated_hits(n: usize) -> Vec<Hit> {
    let mut seen = HashSet::new();
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    (0..n)
        .map(|_| {
            let owner = next() % 4;
            let project = next() % 6;
            match next() % 4 {
                0 => format!("github.com/o{}", owner),
                1 => format!("github.com/o{}/p{}", owner, project),
                2 => format!("github.com/o{}/p{}/sub{}", owner, project, next() % 3),
                _ => format!("github.com/o{}/p{}/sub{}/deep", owner, project, next() % 3),
            }
        })
        .filter(|package| seen.insert(package.clone()))
        .map(|package| hit(&package))
        .collect()
}

fn fold(hits: &[Hit], window: Range) -> pkgshow::ShowResults {
    let results = SearchResult {
        total_results: hits.len(),
        hits: hits.to_vec(),
    };
    let tokens: TokenSet = ["package"].into_iter().collect();
    FoldingAggregator::new(&NoRecords, &DensestSnippets).fold(&results, &tokens, window)
}

#[test]
fn test_partition_and_window_bounds_hold_for_generated_lists() {
    for n in [0, 1, 7, 40, 200] {
        let hits = generated_hits(n);
        let n = hits.len();
        for window in [Range::new(0, 10), Range::new(5, 3), Range::new(30, 10), Range::new(0, 0)] {
            let shown = fold(&hits, window);
            assert_eq!(shown.total_entries + shown.folded, n);
            assert!(shown.docs.len() <= window.count);
            for doc in &shown.docs {
                assert!(window.contains(doc.index - 1), "index {} outside {:?}", doc.index, window);
            }
        }
    }
}

#[test]
fn test_window_slices_agree_with_full_view() {
    let hits = generated_hits(200);
    let full = fold(&hits, Range::new(0, usize::MAX));
    assert_eq!(full.docs.len(), full.total_entries);

    let slice = fold(&hits, Range::new(10, 10));
    assert_eq!(slice.total_entries, full.total_entries);
    assert_eq!(slice.folded, full.folded);
    assert_eq!(slice.docs, full.docs[10..20.min(full.docs.len())].to_vec());
}

#[test]
fn test_top_level_entries_keep_first_appearance_order() {
    let hits = generated_hits(120);
    let full = fold(&hits, Range::new(0, usize::MAX));

    // Shown entries must be a subsequence of the ranked hits
    let mut cursor = 0;
    for doc in &full.docs {
        let offset = hits[cursor..]
            .iter()
            .position(|h| h.package == doc.hit.package)
            .expect("entry shown out of rank order");
        cursor += offset + 1;
    }
}

#[test]
fn test_subs_extend_their_parent_path() {
    let hits = generated_hits(150);
    let full = fold(&hits, Range::new(0, usize::MAX));
    let mut seen_subs = HashSet::new();
    for doc in &full.docs {
        for sub in &doc.subs {
            assert_eq!(sub.package, format!("{}{}", doc.hit.package, sub.sub_path));
            assert!(sub.sub_path.starts_with('/'));
            assert!(doc.hit.package.split('/').count() >= 3);
            seen_subs.insert(sub.package.clone());
        }
    }
    assert!(!seen_subs.is_empty());
}

#[test]
fn test_every_shown_star_count_is_clamped() {
    let full = fold(&generated_hits(60), Range::new(0, 100));
    assert!(full.docs.iter().all(|d| d.hit.star_count == 0));
}

#[test]
fn test_highlight_without_matches_is_plain_escape() {
    let text = "a < b && c > \"d\" 'e'";
    let marked = mark_text(text, &TokenSet::new());
    assert_eq!(marked.as_str(), "a &lt; b &amp;&amp; c &gt; &#34;d&#34; &#39;e&#39;");
}

#[test]
fn test_pagination_follows_folded_entry_count() {
    let hits = generated_hits(200);
    let full = fold(&hits, Range::new(0, usize::MAX));
    let nav = paginate(full.total_entries, 1, 10);
    assert_eq!(nav.total_pages, full.total_entries.div_ceil(10));
    assert!(nav.after_pages.len() <= 9);
}
