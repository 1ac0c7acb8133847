//! Stored package records
//!
//! `FullPackage` is the heavyweight record kept in SQLite. The search index
//! only carries the lighter `Hit` view of it.

use serde::{Deserialize, Serialize};

use crate::interface::Hit;

// ─────────────────────────────────────────────────────────────────────────────
// FULL RECORD (database row)
// ─────────────────────────────────────────────────────────────────────────────

/// Package record as stored in the database, readme included.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FullPackage {
    pub package: String,
    pub name: String,
    pub synopsis: String,
    pub description: String,
    pub important_sentences: Vec<String>,
    pub readme_fn: String,
    pub readme_data: String,
    pub star_count: i64,
    pub static_rank: i64,
}

impl FullPackage {
    /// Create a record with only the identifier set and an unknown star count
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            star_count: -1,
            ..Default::default()
        }
    }

    /// The lightweight view served by the index. Readme data is left out.
    pub fn to_hit(&self) -> Hit {
        Hit {
            package: self.package.clone(),
            name: self.name.clone(),
            synopsis: self.synopsis.clone(),
            description: self.description.clone(),
            important_sentences: self.important_sentences.clone(),
            readme_fn: self.readme_fn.clone(),
            readme_data: String::new(),
            star_count: self.star_count,
            static_rank: self.static_rank,
        }
    }

    /// Basic sanity checks before a record is stored
    pub fn validate(&self) -> Result<(), String> {
        if self.package.trim().is_empty() {
            return Err("package identifier is empty".to_string());
        }
        if self.package.starts_with('/') || self.package.ends_with('/') || self.package.contains("//") {
            return Err(format!("malformed package identifier: {}", self.package));
        }
        Ok(())
    }
}

/// Stars for display: the unknown sentinel (any negative) shows as zero.
pub fn clamp_star_count(star_count: i64) -> i64 {
    star_count.max(0)
}
