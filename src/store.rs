use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

use crate::environment::get_env_var_or;
use crate::types::{Article, MoverSummary, ProcessedArticle};
use crate::TARGET_PIPELINE;

const DATA_DIR_ENV: &str = "WHYMOVES_DATA_DIR";
const DEFAULT_DATA_DIR: &str = "stock_db";

/// Per-symbol JSON documents under one data root:
/// `news/{symbol}_news.json`, `nlp_data/{symbol}_nlp_data.json`,
/// `movers/{symbol}_summary.json`, plus the read-only collaborators
/// `prices/{symbol}_price.json` and `issuers.json`.
///
/// State is partitioned per symbol; concurrent runs for the same symbol
/// must be serialized by the caller.
#[derive(Clone, Debug)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_environment() -> Self {
        Self::new(get_env_var_or(DATA_DIR_ENV, DEFAULT_DATA_DIR))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn news_path(&self, symbol: &str) -> PathBuf {
        self.root.join("news").join(format!("{symbol}_news.json"))
    }

    pub fn has_news(&self, symbol: &str) -> bool {
        self.news_path(symbol).exists()
    }

    /// Loads the cached news snapshot for a symbol. A missing or corrupt
    /// file reads as "no articles"; corruption is logged, not raised.
    pub fn load_news(&self, symbol: &str) -> Vec<Article> {
        self.load_json(&self.news_path(symbol)).unwrap_or_default()
    }

    pub fn save_news(&self, symbol: &str, articles: &[Article]) -> Result<()> {
        self.save_json(&self.news_path(symbol), &articles)
    }

    pub fn save_nlp_data(&self, symbol: &str, processed: &[ProcessedArticle]) -> Result<()> {
        let path = self
            .root
            .join("nlp_data")
            .join(format!("{symbol}_nlp_data.json"));
        self.save_json(&path, &processed)
    }

    pub fn save_summary(&self, summary: &MoverSummary) -> Result<()> {
        let path = self
            .root
            .join("movers")
            .join(format!("{}_summary.json", summary.symbol));
        self.save_json(&path, summary)
    }

    /// All symbols with a cached news snapshot, for batch processing.
    pub fn news_symbols(&self) -> Vec<String> {
        let news_dir = self.root.join("news");
        let entries = match fs::read_dir(&news_dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };
        let mut symbols: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|name| name.strip_suffix("_news.json").map(str::to_string))
            })
            .collect();
        symbols.sort();
        symbols
    }

    /// Daily change percentage from the price-store collaborator, when
    /// the price fetcher has run for this symbol.
    pub fn daily_change(&self, symbol: &str) -> Option<f64> {
        let path = self
            .root
            .join("prices")
            .join(format!("{symbol}_price.json"));
        let value: serde_json::Value = self.load_json(&path)?;
        value.get("change_pct").and_then(serde_json::Value::as_f64)
    }

    /// Issuer id for the Nasdaq Nordic/Baltic news API. Symbols without
    /// an entry in `issuers.json` cannot use that source.
    pub fn issuer_id(&self, symbol: &str) -> Option<String> {
        let value: serde_json::Value = self.load_json(&self.root.join("issuers.json"))?;
        value
            .get(symbol)
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
    }

    fn load_json<T: DeserializeOwned>(&self, path: &Path) -> Option<T> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) => {
                if path.exists() {
                    warn!(target: TARGET_PIPELINE, "Failed to read {}: {}", path.display(), err);
                }
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(value) => {
                debug!(target: TARGET_PIPELINE, "Loaded {}", path.display());
                Some(value)
            }
            Err(err) => {
                error!(target: TARGET_PIPELINE, "Invalid JSON in {}: {}", path.display(), err);
                None
            }
        }
    }

    fn save_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(value)?;
        fs::write(path, data).with_context(|| format!("writing {}", path.display()))?;
        debug!(target: TARGET_PIPELINE, "Saved {}", path.display());
        Ok(())
    }
}
