//! SQLite database layer for full package records
//!
//! One `packages` table keyed by import path. Uses r2d2 connection pooling so
//! concurrent search requests can look records up without a shared lock.

use crate::interface::{PackageLookup, PkgShowError};
use crate::models::FullPackage;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Corrupt row for {package}: {source}")]
    Corrupt {
        package: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

const INDEX_UPDATED_KEY: &str = "indexUpdated";

const SELECT_COLUMNS: &str = "package, name, synopsis, description, importantSentences, readmeFn, readmeData, starCount, staticRank";

/// Thread-safe database wrapper using connection pooling
///
/// WAL mode lets readers proceed without blocking each other or the indexer.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open or create a database at the given path with connection pooling
    pub fn open<P: AsRef<Path>>(path: P) -> DatabaseResult<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode=WAL;
                PRAGMA synchronous=NORMAL;
                PRAGMA mmap_size=67108864;
                PRAGMA cache_size=-32000;
            ",
            )?;
            Ok(())
        });

        let pool = Pool::builder().max_size(8).build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> DatabaseResult<Self> {
        let manager = SqliteConnectionManager::memory();

        // In-memory needs single connection to maintain state
        let pool = Pool::builder().max_size(1).build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    fn get_conn(&self) -> DatabaseResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    fn setup_schema(&self) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS packages (
                package TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL DEFAULT '',
                synopsis TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                importantSentences TEXT NOT NULL DEFAULT '[]',
                readmeFn TEXT NOT NULL DEFAULT '',
                readmeData TEXT NOT NULL DEFAULT '',
                starCount INTEGER NOT NULL DEFAULT -1,
                staticRank INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_packages_rank ON packages(staticRank);

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY NOT NULL,
                value INTEGER NOT NULL
            );
        "#,
        )?;
        Ok(())
    }

    /// Get total number of packages in the database
    pub fn count_packages(&self) -> DatabaseResult<u64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM packages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Insert a package, replacing any existing record with the same id
    pub fn upsert_package(&self, pkg: &FullPackage) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        let sentences = serde_json::to_string(&pkg.important_sentences).map_err(|source| {
            DatabaseError::Corrupt {
                package: pkg.package.clone(),
                source,
            }
        })?;

        conn.execute(
            r#"INSERT INTO packages (package, name, synopsis, description, importantSentences, readmeFn, readmeData, starCount, staticRank)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
               ON CONFLICT(package) DO UPDATE SET
                   name = excluded.name,
                   synopsis = excluded.synopsis,
                   description = excluded.description,
                   importantSentences = excluded.importantSentences,
                   readmeFn = excluded.readmeFn,
                   readmeData = excluded.readmeData,
                   starCount = excluded.starCount,
                   staticRank = excluded.staticRank"#,
            params![
                pkg.package,
                pkg.name,
                pkg.synopsis,
                pkg.description,
                sentences,
                pkg.readme_fn,
                pkg.readme_data,
                pkg.star_count,
                pkg.static_rank,
            ],
        )?;
        Ok(())
    }

    /// Find a package by its identifier
    pub fn fetch_package(&self, package: &str) -> DatabaseResult<Option<FullPackage>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM packages WHERE package = ?1", SELECT_COLUMNS),
                [package],
                Self::row_to_raw,
            )
            .optional()?;
        row.map(RawPackage::into_package).transpose()
    }

    /// Fetch all packages in static rank order (for index rebuilding)
    pub fn fetch_all_packages(&self) -> DatabaseResult<Vec<FullPackage>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM packages ORDER BY staticRank ASC, package ASC",
            SELECT_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], Self::row_to_raw)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawPackage::into_package).collect()
    }

    /// Delete a package by its identifier. Returns whether a row was removed.
    pub fn delete_package(&self, package: &str) -> DatabaseResult<bool> {
        let conn = self.get_conn()?;
        let changed = conn.execute("DELETE FROM packages WHERE package = ?1", [package])?;
        Ok(changed > 0)
    }

    /// Record when the search index was last committed
    pub fn set_index_updated(&self, at: SystemTime) -> DatabaseResult<()> {
        let millis = at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![INDEX_UPDATED_KEY, millis],
        )?;
        Ok(())
    }

    /// When the search index was last committed, if ever
    pub fn index_updated(&self) -> DatabaseResult<Option<SystemTime>> {
        let conn = self.get_conn()?;
        let millis: Option<i64> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                [INDEX_UPDATED_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(millis.map(|ms| UNIX_EPOCH + Duration::from_millis(ms.max(0) as u64)))
    }

    fn row_to_raw(row: &rusqlite::Row) -> rusqlite::Result<RawPackage> {
        Ok(RawPackage {
            package: FullPackage {
                package: row.get(0)?,
                name: row.get(1)?,
                synopsis: row.get(2)?,
                description: row.get(3)?,
                important_sentences: Vec::new(),
                readme_fn: row.get(5)?,
                readme_data: row.get(6)?,
                star_count: row.get(7)?,
                static_rank: row.get(8)?,
            },
            sentences_json: row.get(4)?,
        })
    }
}

/// A row whose JSON column has not been decoded yet.
struct RawPackage {
    package: FullPackage,
    sentences_json: String,
}

impl RawPackage {
    fn into_package(self) -> DatabaseResult<FullPackage> {
        let RawPackage { mut package, sentences_json } = self;
        package.important_sentences =
            serde_json::from_str(&sentences_json).map_err(|source| DatabaseError::Corrupt {
                package: package.package.clone(),
                source,
            })?;
        Ok(package)
    }
}

impl PackageLookup for Database {
    fn find_full_package(&self, package: &str) -> Result<Option<FullPackage>, PkgShowError> {
        Ok(self.fetch_package(package)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(package: &str, rank: i64) -> FullPackage {
        let mut p = FullPackage::new(package);
        p.name = package.rsplit('/').next().unwrap().to_string();
        p.synopsis = format!("Package {}", p.name);
        p.important_sentences = vec!["One.".to_string(), "Two.".to_string()];
        p.readme_fn = "README.md".to_string();
        p.readme_data = "# Hello".to_string();
        p.static_rank = rank;
        p
    }

    #[test]
    fn test_upsert_and_fetch() {
        let db = Database::open_in_memory().unwrap();
        let pkg = sample("github.com/a/b", 3);
        db.upsert_package(&pkg).unwrap();
        assert_eq!(db.fetch_package("github.com/a/b").unwrap(), Some(pkg));
        assert_eq!(db.fetch_package("github.com/a/missing").unwrap(), None);
    }

    #[test]
    fn test_upsert_replaces_existing() {
        let db = Database::open_in_memory().unwrap();
        let mut pkg = sample("github.com/a/b", 3);
        db.upsert_package(&pkg).unwrap();
        pkg.description = "updated".to_string();
        pkg.star_count = 12;
        db.upsert_package(&pkg).unwrap();
        assert_eq!(db.count_packages().unwrap(), 1);
        let fetched = db.fetch_package("github.com/a/b").unwrap().unwrap();
        assert_eq!(fetched.description, "updated");
        assert_eq!(fetched.star_count, 12);
    }

    #[test]
    fn test_fetch_all_is_rank_ordered() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_package(&sample("github.com/z/z", 2)).unwrap();
        db.upsert_package(&sample("github.com/a/a", 5)).unwrap();
        db.upsert_package(&sample("github.com/m/m", 0)).unwrap();
        let all: Vec<String> = db.fetch_all_packages().unwrap().into_iter().map(|p| p.package).collect();
        assert_eq!(all, vec!["github.com/m/m", "github.com/z/z", "github.com/a/a"]);
    }

    #[test]
    fn test_delete_package() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_package(&sample("github.com/a/b", 0)).unwrap();
        assert!(db.delete_package("github.com/a/b").unwrap());
        assert!(!db.delete_package("github.com/a/b").unwrap());
        assert_eq!(db.count_packages().unwrap(), 0);
    }

    #[test]
    fn test_lookup_trait() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_package(&sample("github.com/a/b", 0)).unwrap();
        let lookup: &dyn PackageLookup = &db;
        let found = lookup.find_full_package("github.com/a/b").unwrap().unwrap();
        assert_eq!(found.readme_data, "# Hello");
        assert!(lookup.find_full_package("nope").unwrap().is_none());
    }

    #[test]
    fn test_index_updated_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.index_updated().unwrap(), None);

        let first = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        db.set_index_updated(first).unwrap();
        assert_eq!(db.index_updated().unwrap(), Some(first));

        let second = first + Duration::from_secs(60);
        db.set_index_updated(second).unwrap();
        assert_eq!(db.index_updated().unwrap(), Some(second));
    }

    #[test]
    fn test_on_disk_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packages.sqlite");
        {
            let db = Database::open(&path).unwrap();
            db.upsert_package(&sample("github.com/a/b", 1)).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.count_packages().unwrap(), 1);
    }
}
