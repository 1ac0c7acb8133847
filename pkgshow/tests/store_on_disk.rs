//! End-to-end store behaviour against an on-disk data directory

use pkgshow::{EngineConfig, FullPackage, PackageStore, PkgShowError};
use tempfile::TempDir;

fn pkg(package: &str, name: &str, synopsis: &str, rank: i64) -> FullPackage {
    let mut p = FullPackage::new(package);
    p.name = name.to_string();
    p.synopsis = synopsis.to_string();
    p.description = synopsis.to_string();
    p.static_rank = rank;
    p
}

fn corpus() -> Vec<FullPackage> {
    let mut mux = pkg("github.com/gorilla/mux", "mux", "Router: a powerful URL router and dispatcher", 0);
    mux.star_count = 1200;
    mux.readme_fn = "README.md".to_string();
    mux.readme_data = "# gorilla/mux\n\nPackage `mux` implements a request **router** and dispatcher.".to_string();

    let mut cmd = pkg("github.com/gorilla/mux/cmd", "main", "Command line demo of the router package in action", 1);
    cmd.star_count = -1;

    let mut chi = pkg("github.com/go-chi/chi", "chi", "Lightweight router for HTTP services", 2);
    chi.important_sentences = vec!["Composable router middleware.".to_string()];

    vec![
        mux,
        cmd,
        chi,
        pkg("gopkg.in/yaml.v2", "yaml", "YAML support", 3),
    ]
}

fn open(dir: &TempDir) -> PackageStore {
    PackageStore::open(dir.path(), EngineConfig::default()).unwrap()
}

#[test]
fn test_search_page_end_to_end() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.add_packages(&corpus()).unwrap();

    let page = store.search_page("router", None).unwrap();
    assert_eq!(page.results.total_results, 3);
    assert_eq!(page.results.total_entries, 2);
    assert_eq!(page.results.folded, 1);

    let mux = page
        .results
        .docs
        .iter()
        .find(|d| d.hit.package == "github.com/gorilla/mux")
        .expect("mux is shown");
    assert_eq!(mux.hit.star_count, 1200);
    assert_eq!(mux.subs.len(), 1);
    assert_eq!(mux.subs[0].sub_path, "/cmd");
    assert_eq!(mux.subs[0].marked_name.as_str(), "main - mux");
    // Readme text from the stored record feeds the summary
    assert!(mux.summary.as_str().contains("request <b>router</b> and dispatcher"));

    let chi = page
        .results
        .docs
        .iter()
        .find(|d| d.hit.package == "github.com/go-chi/chi")
        .expect("chi is shown");
    assert!(chi.summary.as_str().contains("Composable <b>router</b> middleware."));
}

#[test]
fn test_reopen_keeps_data_searchable() {
    let dir = TempDir::new().unwrap();
    {
        let store = open(&dir);
        store.add_packages(&corpus()).unwrap();
    }
    let store = open(&dir);
    let page = store.search_page("yaml", None).unwrap();
    assert_eq!(page.results.docs.len(), 1);
    assert_eq!(page.results.docs[0].hit.name, "yaml");
}

#[test]
fn test_stats_and_view_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let updated = {
        let store = open(&dir);
        store.add_packages(&corpus()).unwrap();
        store.stats().unwrap().last_updated_ms.expect("stamped on commit")
    };

    let store = open(&dir);
    let stats = store.stats().unwrap();
    assert_eq!(stats.total_packages, 4);
    assert_eq!(stats.indexed_docs, 4);
    assert_eq!(stats.last_updated_ms, Some(updated));

    let view = store.view_package("github.com/gorilla/mux").unwrap().unwrap();
    assert_eq!(view.rank, 1);
    assert_eq!(view.package.star_count, 1200);
    assert_eq!(view.total_packages, 4);
    assert!(!view.show_readme);

    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["package"]["package"], "github.com/gorilla/mux");
    assert_eq!(json["rank"], 1);
}

#[test]
fn test_index_rebuilt_when_missing() {
    let dir = TempDir::new().unwrap();
    {
        let store = open(&dir);
        store.add_packages(&corpus()).unwrap();
    }
    std::fs::remove_dir_all(dir.path().join("tantivy_index_v1")).unwrap();

    let store = open(&dir);
    assert_eq!(store.indexer().num_docs(), 4);
    let page = store.search_page("router", None).unwrap();
    assert_eq!(page.results.total_results, 3);
}

#[test]
fn test_json_output_shape() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.add_packages(&corpus()).unwrap();

    let page = store.search_page("yaml", None).unwrap();
    let json = serde_json::to_value(&page).unwrap();
    assert_eq!(json["query"], "yaml");
    assert_eq!(json["pagination"]["total_pages"], 1);
    assert_eq!(json["results"]["docs"][0]["package"], "gopkg.in/yaml.v2");
    assert_eq!(json["results"]["docs"][0]["marked_name"], "<b>yaml</b>");
    assert!(json["search_time"].is_string());
}

#[tokio::test]
async fn test_async_search_on_disk() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    store.add_packages(&corpus()).unwrap();

    let page = store
        .search_page_async("router dispatcher".to_string(), Some("1".to_string()))
        .await
        .unwrap();
    assert_eq!(page.results.total_entries, 1);
    assert_eq!(page.results.docs[0].hit.package, "github.com/gorilla/mux");
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        EngineConfig::from_json_file(&path),
        Err(PkgShowError::InvalidInput(_))
    ));
}
