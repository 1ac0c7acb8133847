//! PackageStore - search requests end to end
//!
//! Owns the SQLite record store and the tantivy index, and turns a query plus
//! a page number into one rendered results page.
//!
//! Concurrency Model:
//! - Database uses an r2d2 connection pool (concurrent reads, no mutex blocking)
//! - Index reads go through a shared tantivy searcher
//! - Each request folds with its own local state, so requests never contend
//! - The async entry point runs the blocking work on tokio's blocking pool and
//!   gives up after the configured timeout

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Once};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use rayon::prelude::*;
use serde::{Serialize, Serializer};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::database::{Database, DatabaseError};
use crate::fold::FoldingAggregator;
use crate::indexer::Indexer;
use crate::interface::{HitSource, PackageLookup, PkgShowError, ShowResults, SnippetSelector};
use crate::models::{clamp_star_count, FullPackage};
use crate::pagination::{page_window, paginate, parse_page, Pagination};
use crate::snippet::DensestSnippets;

const DATABASE_FILE: &str = "packages.sqlite";
const INDEX_DIR: &str = "tantivy_index_v1";

/// Queries producing at least this many hits get a second search box at the bottom.
const BOTTOM_QUERY_MIN_HITS: usize = 5;

/// Descriptions shorter than this (in bytes) are supplemented by the readme on a package view.
const SHOW_README_MAX_DESCRIPTION: usize = 10;

static RAYON_INIT: Once = Once::new();

/// Initialize the global Rayon pool, leaving headroom for Tokio workers
fn init_rayon() {
    RAYON_INIT.call_once(|| {
        let num_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let rayon_threads = num_threads.saturating_sub(2).max(1);

        let _ = rayon::ThreadPoolBuilder::new()
            .num_threads(rayon_threads)
            .thread_name(|i| format!("pkgshow-rayon-{}", i))
            .build_global();
    });
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESPONSE
// ═══════════════════════════════════════════════════════════════════════════════

/// Elapsed time rendered at a human scale: `3 days`, `12 ms`, `850 us`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct SimpleDuration(pub Duration);

impl fmt::Display for SimpleDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const MINUTE: Duration = Duration::from_secs(60);
        const HOUR: Duration = Duration::from_secs(60 * 60);
        const DAY: Duration = Duration::from_secs(24 * 60 * 60);

        let d = self.0;
        let secs = d.as_secs_f64();
        if d > DAY {
            write!(f, "{:.0} days", secs / 86_400.0)
        } else if d >= HOUR {
            write!(f, "{:.0} hours", secs / 3_600.0)
        } else if d >= MINUTE {
            write!(f, "{:.0} mins", secs / 60.0)
        } else if d >= Duration::from_secs(1) {
            write!(f, "{:.0} sec", secs)
        } else if d >= Duration::from_millis(1) {
            write!(f, "{} ms", d.as_millis())
        } else if d >= Duration::from_micros(1) {
            write!(f, "{} us", d.as_micros())
        } else {
            write!(f, "{} ns", d.as_nanos())
        }
    }
}

impl Serialize for SimpleDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Everything a results page needs.
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub query: String,
    pub results: ShowResults,
    pub pagination: Pagination,
    pub search_time: SimpleDuration,
    pub bottom_query: bool,
}

/// One package as shown on its own page.
#[derive(Debug, Clone, Serialize)]
pub struct PackageView {
    /// The stored record, star count clamped for display
    pub package: FullPackage,
    /// 1-based position in the static ranking
    pub rank: i64,
    pub total_packages: u64,
    pub show_readme: bool,
}

impl PackageView {
    fn new(mut package: FullPackage, total_packages: u64) -> Self {
        package.star_count = clamp_star_count(package.star_count);
        let show_readme = package.description.len() < SHOW_README_MAX_DESCRIPTION
            && !package.readme_data.is_empty();
        Self {
            rank: package.static_rank + 1,
            package,
            total_packages,
            show_readme,
        }
    }
}

/// Store-wide counters for the landing page.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub total_packages: u64,
    pub indexed_docs: u64,
    /// Unix milliseconds of the last index commit
    pub last_updated_ms: Option<u64>,
    pub index_age: Option<SimpleDuration>,
}

/// Search, fold and paginate one page with explicit collaborators.
///
/// Search failures are returned as errors; enrichment failures only degrade
/// the affected entry.
pub fn render_search_page<L>(
    source: &dyn HitSource,
    lookup: &L,
    snippets: &dyn SnippetSelector,
    config: &EngineConfig,
    query: &str,
    page: Option<&str>,
) -> Result<SearchPage, PkgShowError>
where
    L: PackageLookup + ?Sized,
{
    let start = Instant::now();
    let query = query.trim();
    let page = parse_page(page);

    let (results, tokens) = source.search(query)?;

    let shown = FoldingAggregator::new(lookup, snippets)
        .with_limits(config.fold_limits())
        .fold(&results, &tokens, page_window(page, config.page_size));
    let pagination = paginate(shown.total_entries, page, config.page_size);
    let search_time = SimpleDuration(start.elapsed());

    info!(
        query,
        page,
        hits = results.hits.len(),
        total_entries = shown.total_entries,
        total_pages = pagination.total_pages,
        search_time = %search_time,
        "search page ready"
    );

    Ok(SearchPage {
        query: query.to_string(),
        bottom_query: results.hits.len() >= BOTTOM_QUERY_MIN_HITS,
        results: shown,
        pagination,
        search_time,
    })
}

/// Run blocking work on tokio's blocking pool, abandoning it after `timeout_ms`.
///
/// A late result is dropped when the blocking task eventually finishes.
pub(crate) async fn blocking_with_timeout<T, F>(timeout_ms: u64, work: F) -> Result<T, PkgShowError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PkgShowError> + Send + 'static,
{
    let handle = tokio::task::spawn_blocking(work);
    match tokio::time::timeout(Duration::from_millis(timeout_ms), handle).await {
        Ok(Ok(result)) => result,
        // JoinError means the task panicked or was aborted
        Ok(Err(_join_error)) => Err(PkgShowError::Cancelled),
        Err(_elapsed) => {
            warn!(timeout_ms, "request timed out, discarding late result");
            Err(PkgShowError::Timeout(timeout_ms))
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Thread-safe package store with SQLite + Tantivy
pub struct PackageStore {
    db: Arc<Database>,
    indexer: Arc<Indexer>,
    config: EngineConfig,
}

impl PackageStore {
    /// Open or create a store under `data_dir`, rebuilding the index if it drifted
    pub fn open(data_dir: &Path, config: EngineConfig) -> Result<Self, PkgShowError> {
        config.validate()?;
        init_rayon();
        std::fs::create_dir_all(data_dir).map_err(DatabaseError::from)?;

        let db = Database::open(data_dir.join(DATABASE_FILE))?;
        let indexer = Indexer::new(&data_dir.join(INDEX_DIR))?.with_hit_limit(config.hit_limit);

        let store = Self {
            db: Arc::new(db),
            indexer: Arc::new(indexer),
            config,
        };
        store.rebuild_index_if_needed()?;
        Ok(store)
    }

    /// Create a store with an in-memory database and index
    pub fn new_in_memory(config: EngineConfig) -> Result<Self, PkgShowError> {
        config.validate()?;
        init_rayon();
        let db = Database::open_in_memory()?;
        let indexer = Indexer::new_in_memory()?.with_hit_limit(config.hit_limit);

        Ok(Self {
            db: Arc::new(db),
            indexer: Arc::new(indexer),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    /// Store and index one package. Call `commit` to make it searchable.
    pub fn add_package(&self, pkg: &FullPackage) -> Result<(), PkgShowError> {
        pkg.validate().map_err(PkgShowError::InvalidInput)?;
        self.db.upsert_package(pkg)?;
        self.indexer.add_package(pkg)?;
        Ok(())
    }

    /// Store, index and commit a batch of packages
    pub fn add_packages(&self, pkgs: &[FullPackage]) -> Result<usize, PkgShowError> {
        for pkg in pkgs {
            self.add_package(pkg)?;
        }
        self.commit()?;
        info!(count = pkgs.len(), "indexed packages");
        Ok(pkgs.len())
    }

    /// Make indexed changes searchable and stamp the index update time
    pub fn commit(&self) -> Result<(), PkgShowError> {
        self.indexer.commit()?;
        self.db.set_index_updated(SystemTime::now())?;
        Ok(())
    }

    /// Remove a package from both stores. Returns whether it existed.
    pub fn delete_package(&self, package: &str) -> Result<bool, PkgShowError> {
        let existed = self.db.delete_package(package)?;
        self.indexer.delete_package(package)?;
        self.commit()?;
        Ok(existed)
    }

    /// Rebuild the index from the database when their document counts disagree.
    ///
    /// Returns whether a rebuild happened.
    pub fn rebuild_index_if_needed(&self) -> Result<bool, PkgShowError> {
        let db_count = self.db.count_packages()?;
        let index_count = self.indexer.num_docs();
        if db_count == index_count {
            return Ok(false);
        }

        info!(db_count, index_count, "rebuilding package index");
        self.indexer.clear()?;
        let packages = self.db.fetch_all_packages()?;
        packages
            .par_iter()
            .try_for_each(|pkg| self.indexer.add_package(pkg))?;
        self.commit()?;
        Ok(true)
    }

    /// The full record behind `id` ready for display, or `None` if it is unknown.
    pub fn view_package(&self, id: &str) -> Result<Option<PackageView>, PkgShowError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(PkgShowError::InvalidInput("package id is empty".into()));
        }
        let Some(package) = self.db.fetch_package(id)? else {
            return Ok(None);
        };
        let total = self.db.count_packages()?;
        Ok(Some(PackageView::new(package, total)))
    }

    pub fn stats(&self) -> Result<StoreStats, PkgShowError> {
        let updated = self.db.index_updated()?;
        Ok(StoreStats {
            total_packages: self.db.count_packages()?,
            indexed_docs: self.indexer.num_docs(),
            last_updated_ms: updated
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as u64),
            index_age: updated.map(|t| SimpleDuration(t.elapsed().unwrap_or_default())),
        })
    }

    /// One results page for `query`. `page` is the raw caller-supplied page number.
    pub fn search_page(&self, query: &str, page: Option<&str>) -> Result<SearchPage, PkgShowError> {
        render_search_page(
            self.indexer.as_ref(),
            self.db.as_ref(),
            &DensestSnippets,
            &self.config,
            query,
            page,
        )
    }

    /// Like `search_page`, off the async executor and bounded by the request timeout.
    pub async fn search_page_async(
        &self,
        query: String,
        page: Option<String>,
    ) -> Result<SearchPage, PkgShowError> {
        let db = Arc::clone(&self.db);
        let indexer = Arc::clone(&self.indexer);
        let config = self.config.clone();

        blocking_with_timeout(self.config.request_timeout_ms, move || {
            render_search_page(
                indexer.as_ref(),
                db.as_ref(),
                &DensestSnippets,
                &config,
                &query,
                page.as_deref(),
            )
        })
        .await
    }
}
