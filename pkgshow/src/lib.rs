//! pkgshow - presentation engine for package search results
//!
//! Takes ranked hits from a tantivy index, folds sub-packages under their
//! project's top-level entry, highlights query terms into escaped HTML and
//! computes page navigation. Full package records live in SQLite.

pub mod config;
pub mod database;
pub mod fold;
pub mod highlight;
pub mod indexer;
pub mod interface;
pub mod models;
pub mod package;
pub mod pagination;
pub mod readme;
pub mod snippet;
mod store;
pub mod tokenizer;

pub use config::EngineConfig;
pub use fold::{FoldLimits, FoldingAggregator};
pub use interface::*;
pub use models::FullPackage;
pub use pagination::{paginate, parse_page, Pagination};
pub use store::{render_search_page, PackageStore, PackageView, SearchPage, SimpleDuration, StoreStats};
