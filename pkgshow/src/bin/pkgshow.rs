//! Command-line front end: index package records and render search pages as JSON.
//!
//! Usage:
//!     pkgshow --data ./data index packages.jsonl
//!     pkgshow --data ./data search "json parser" --page 2
//!     pkgshow --data ./data view github.com/gorilla/mux
//!     pkgshow --data ./data stats

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pkgshow::{EngineConfig, FullPackage, PackageStore};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the SQLite database and the search index
    #[arg(short, long, default_value = "pkgshow-data")]
    data: PathBuf,

    /// JSON engine configuration (missing keys use defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load package records, one JSON object per line
    Index {
        /// Path to the JSON-lines file
        input: PathBuf,
    },
    /// Search and print one results page
    Search {
        query: String,

        /// 1-based page number
        #[arg(short, long)]
        page: Option<String>,
    },
    /// Print one package record
    View {
        /// Package import path
        id: String,
    },
    /// Print package and index counters
    Stats,
}

fn read_packages(path: &Path) -> Result<Vec<FullPackage>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut packages = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let pkg: FullPackage = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid package record", path.display(), lineno + 1))?;
        packages.push(pkg);
    }
    Ok(packages)
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path).context("Failed to load config")?,
        None => EngineConfig::default(),
    };
    let store = PackageStore::open(&args.data, config).context("Failed to open package store")?;

    match args.command {
        Command::Index { input } => {
            let packages = read_packages(&input)?;
            let count = store.add_packages(&packages)?;
            info!(count, data = %args.data.display(), "index updated");
        }
        Command::Search { query, page } => {
            let page = store.search_page_async(query, page).await?;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        Command::View { id } => match store.view_package(&id)? {
            Some(view) => println!("{}", serde_json::to_string_pretty(&view)?),
            None => bail!("Package {} not found", id),
        },
        Command::Stats => {
            println!("{}", serde_json::to_string_pretty(&store.stats()?)?);
        }
    }

    Ok(())
}
