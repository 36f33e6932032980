use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::StoreError;
use crate::models::{validate_purchase_price, Position};

/// The tracked positions and the JSON file that backs them.
///
/// Tickers are unique. Every mutating call persists before returning; a
/// failed persist leaves the in-memory change in place and reports the
/// error.
#[derive(Debug)]
pub struct PortfolioStore {
    path: PathBuf,
    positions: Vec<Position>,
}

impl PortfolioStore {
    /// An empty store that will persist to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            positions: Vec::new(),
        }
    }

    /// Load from disk. A missing, unreadable or malformed file yields an
    /// empty store. Tickers are trimmed and upper-cased. Entries that are
    /// malformed, have an empty ticker or a purchase price outside the
    /// accepted range are dropped; a repeated ticker keeps its last
    /// occurrence.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No portfolio file found, starting empty");
                return Self::empty(path);
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "Failed to read portfolio file");
                return Self::empty(path);
            }
        };

        let entries = match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Array(entries)) => entries,
            Ok(_) => {
                tracing::warn!(path = %path.display(), "Portfolio file is not a list, ignoring it");
                return Self::empty(path);
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "Portfolio file is corrupt, ignoring it");
                return Self::empty(path);
            }
        };

        let mut store = Self::empty(path);
        for entry in entries {
            let mut pos = match serde_json::from_value::<Position>(entry) {
                Ok(pos) => pos,
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping malformed portfolio entry");
                    continue;
                }
            };
            pos.ticker = pos.ticker.trim().to_uppercase();
            if pos.ticker.is_empty() {
                tracing::warn!(name = %pos.name, "Dropping position with empty ticker");
                continue;
            }
            if let Err(e) = validate_purchase_price(pos.purchase_price) {
                tracing::warn!(error = %e, ticker = %pos.ticker, "Dropping position with invalid purchase price");
                continue;
            }
            store.insert_replacing(pos);
        }

        tracing::info!(
            positions = store.positions.len(),
            path = %store.path.display(),
            "Loaded portfolio"
        );
        store
    }

    /// Write the whole list atomically: temp file in the same directory,
    /// then rename over the target.
    pub fn save(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.positions)?;

        let dir = match self.path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let tmp = dir.join(format!(".tmp_{}.json", uuid::Uuid::new_v4()));

        if let Err(e) = fs::write(&tmp, json).and_then(|_| fs::rename(&tmp, &self.path)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        tracing::debug!(positions = self.positions.len(), "Portfolio saved");
        Ok(())
    }

    /// Replace any position with the same ticker, append, persist.
    /// The replaced position's alert flags are not carried over.
    pub fn upsert_by_ticker(&mut self, position: Position) -> Result<(), StoreError> {
        self.insert_replacing(position);
        self.save()
    }

    /// Remove by ticker, persisting only when something was removed.
    pub fn remove(&mut self, ticker: &str) -> Result<Option<Position>, StoreError> {
        let Some(idx) = self.positions.iter().position(|p| p.ticker == ticker) else {
            return Ok(None);
        };
        let removed = self.positions.remove(idx);
        self.save()?;
        Ok(Some(removed))
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut [Position] {
        &mut self.positions
    }

    pub fn get(&self, ticker: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.ticker == ticker)
    }

    pub fn get_mut(&mut self, ticker: &str) -> Option<&mut Position> {
        self.positions.iter_mut().find(|p| p.ticker == ticker)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn insert_replacing(&mut self, position: Position) {
        self.positions.retain(|p| p.ticker != position.ticker);
        self.positions.push(position);
    }
}
