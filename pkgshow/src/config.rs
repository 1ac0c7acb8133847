//! Engine configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::fold::{FoldLimits, DEFAULT_SNIPPET_LEN, README_MAX_CHARS};
use crate::indexer::DEFAULT_HIT_LIMIT;
use crate::interface::PkgShowError;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Top-level entries per results page
    pub page_size: usize,
    /// Character budget of each summary excerpt
    pub snippet_len: usize,
    /// Readme characters considered for the excerpt
    pub readme_max_chars: usize,
    /// Ranked hits requested from the index per query
    pub hit_limit: usize,
    /// Overall budget for one async search request
    pub request_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            snippet_len: DEFAULT_SNIPPET_LEN,
            readme_max_chars: README_MAX_CHARS,
            hit_limit: DEFAULT_HIT_LIMIT,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, PkgShowError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PkgShowError::InvalidInput(format!("cannot read config {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            PkgShowError::InvalidInput(format!("cannot parse config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PkgShowError> {
        if self.page_size == 0 {
            return Err(PkgShowError::InvalidInput("page_size must be positive".into()));
        }
        if self.hit_limit == 0 {
            return Err(PkgShowError::InvalidInput("hit_limit must be positive".into()));
        }
        Ok(())
    }

    pub fn fold_limits(&self) -> FoldLimits {
        FoldLimits {
            snippet_len: self.snippet_len,
            readme_max_chars: self.readme_max_chars,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.snippet_len, 300);
        assert_eq!(config.readme_max_chars, 20480);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkgshow.json");
        std::fs::write(&path, r#"{"page_size": 25}"#).unwrap();
        let config = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.hit_limit, DEFAULT_HIT_LIMIT);
    }

    #[test]
    fn test_rejects_zero_page_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkgshow.json");
        std::fs::write(&path, r#"{"page_size": 0}"#).unwrap();
        assert!(matches!(
            EngineConfig::from_json_file(&path),
            Err(PkgShowError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_missing_file_is_invalid_input() {
        let err = EngineConfig::from_json_file(Path::new("/nonexistent/pkgshow.json")).unwrap_err();
        assert!(err.to_string().contains("cannot read config"));
    }
}
