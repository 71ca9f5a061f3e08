use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::info;

use crate::TARGET_PIPELINE;

const DEFAULT_PORTFOLIO: &str = "default_portfolio.json";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Portfolio {
    #[serde(default)]
    stocks: Vec<Holding>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Holding {
    symbol: String,
}

/// Keyed-JSON portfolio persistence. A collaborator of the pipeline, not
/// part of it: the orchestrator only ever asks for symbol lists.
#[derive(Clone, Debug)]
pub struct PortfolioStore {
    dir: PathBuf,
}

impl PortfolioStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn load(&self, name: &str) -> Portfolio {
        let path = self.dir.join(name);
        fs::read_to_string(&path)
            .ok()
            .and_then(|data| serde_json::from_str(&data).ok())
            .unwrap_or_default()
    }

    fn save(&self, portfolio: &Portfolio, name: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.dir.join(name);
        let data = serde_json::to_string_pretty(portfolio)?;
        fs::write(&path, data).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn get_symbols(&self, name: Option<&str>) -> Vec<String> {
        self.load(name.unwrap_or(DEFAULT_PORTFOLIO))
            .stocks
            .iter()
            .map(|holding| holding.symbol.clone())
            .collect()
    }

    /// Returns false when the symbol was already present.
    pub fn add_symbol(&self, symbol: &str, name: Option<&str>) -> Result<bool> {
        let name = name.unwrap_or(DEFAULT_PORTFOLIO);
        let mut portfolio = self.load(name);
        if portfolio.stocks.iter().any(|h| h.symbol == symbol) {
            info!(target: TARGET_PIPELINE, "{} already in portfolio {}", symbol, name);
            return Ok(false);
        }
        portfolio.stocks.push(Holding {
            symbol: symbol.to_string(),
        });
        self.save(&portfolio, name)?;
        Ok(true)
    }

    /// Returns false when the symbol was not present.
    pub fn remove_symbol(&self, symbol: &str, name: Option<&str>) -> Result<bool> {
        let name = name.unwrap_or(DEFAULT_PORTFOLIO);
        let mut portfolio = self.load(name);
        let before = portfolio.stocks.len();
        portfolio.stocks.retain(|h| h.symbol != symbol);
        if portfolio.stocks.len() == before {
            info!(target: TARGET_PIPELINE, "{} not found in portfolio {}", symbol, name);
            return Ok(false);
        }
        self.save(&portfolio, name)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn add_remove_round_trip() {
        let dir = tempdir().unwrap();
        let store = PortfolioStore::new(dir.path());

        assert!(store.add_symbol("AAPL", None).unwrap());
        assert!(store.add_symbol("MSFT", None).unwrap());
        assert!(!store.add_symbol("AAPL", None).unwrap());
        assert_eq!(store.get_symbols(None), vec!["AAPL", "MSFT"]);

        assert!(store.remove_symbol("AAPL", None).unwrap());
        assert!(!store.remove_symbol("AAPL", None).unwrap());
        assert_eq!(store.get_symbols(None), vec!["MSFT"]);
    }
}
