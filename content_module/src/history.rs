//! Rotating, deduplicated, date-keyed history of generated items.
//!
//! The history lives in a single JSON file that is loaded fresh on every
//! operation and rewritten wholesale on save (write-temp-then-rename).
//! Saving for a day replaces that day's entries, so regenerating a run is
//! safe, and entries older than the retention window are dropped on every
//! save. There is no protection against concurrent writers; two overlapping
//! saves are last-writer-wins.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Date key format used in the history file.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const RETENTION_DAYS: i64 = 90;
const REVIEW_WINDOW: usize = 30;

/// One dated record of previously generated content.
///
/// `item` is the primary text of the record (its dedup identity); any
/// content-specific payload fields are flattened alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: String,
    pub item: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl HistoryEntry {
    pub fn new(item: impl Into<String>, fields: BTreeMap<String, String>) -> Self {
        Self {
            date: String::new(),
            item: item.into(),
            fields,
        }
    }

    /// Case-insensitive identity used for dedup and exclusion lists.
    pub fn dedup_key(&self) -> String {
        self.item.trim().to_lowercase()
    }
}

#[derive(Debug, Error)]
pub enum HistoryStoreError {
    #[error("failed to read history file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("history file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write history file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Flat-file history store. Owns the persisted list exclusively; callers
/// read and replace only through `load`/`save`.
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all persisted entries. A missing file is an empty history; an
    /// unreadable or corrupt file is a recoverable error, not a fatal one.
    pub fn load(&self) -> Result<Vec<HistoryEntry>, HistoryStoreError> {
        if !self.path.exists() {
            debug!("history file {} not found, starting empty", self.path.display());
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|source| HistoryStoreError::Read {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| HistoryStoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// `load`, degrading to an empty history on failure. A generation run
    /// must not crash because history is unavailable.
    pub fn load_or_empty(&self) -> Vec<HistoryEntry> {
        match self.load() {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    "{}; treating history as empty",
                    crate::errors::ContentError::PersistenceIo(err.to_string())
                );
                Vec::new()
            }
        }
    }

    /// Replace today's entries with `new_items`, apply the retention
    /// window, and persist.
    ///
    /// Every entry in `new_items` is tagged with `today`; duplicate dedup
    /// keys within the batch keep the first occurrence. After a successful
    /// save no two entries share both a date and a dedup key, and nothing
    /// older than the retention window remains.
    pub fn save(
        &self,
        new_items: Vec<HistoryEntry>,
        today: NaiveDate,
    ) -> Result<(), HistoryStoreError> {
        let today_key = today.format(DATE_FORMAT).to_string();
        let cutoff_key = (today - chrono::Duration::days(RETENTION_DAYS))
            .format(DATE_FORMAT)
            .to_string();

        let mut history = self.load_or_empty();
        history.retain(|entry| entry.date != today_key);

        let mut seen: HashSet<String> = HashSet::new();
        for mut entry in new_items {
            if !seen.insert(entry.dedup_key()) {
                continue;
            }
            entry.date = today_key.clone();
            history.push(entry);
        }

        // Date keys are yyyy-MM-dd, so lexicographic order is date order.
        history.retain(|entry| entry.date.as_str() >= cutoff_key.as_str());

        self.write_atomic(&history)?;
        info!(
            "saved history: {} entries total after retention ({})",
            history.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Sample up to `count` past entries for review: everything but today,
    /// most recent 30 first (ties keep list order), shuffled uniformly.
    /// Never returns an entry dated `today`; returns fewer than `count`
    /// when fewer are eligible.
    pub fn select_for_review(&self, count: usize, today: NaiveDate) -> Vec<HistoryEntry> {
        let today_key = today.format(DATE_FORMAT).to_string();
        let mut candidates: Vec<HistoryEntry> = self
            .load_or_empty()
            .into_iter()
            .filter(|entry| entry.date != today_key)
            .collect();
        // Stable sort keeps list order among same-dated entries.
        candidates.sort_by(|a, b| b.date.cmp(&a.date));
        candidates.truncate(REVIEW_WINDOW);
        candidates.shuffle(&mut thread_rng());
        candidates.truncate(count);
        candidates
    }

    /// Dedup keys of every entry ever stored, for building generation
    /// exclusion lists.
    pub fn exclusion_keys(&self) -> HashSet<String> {
        self.load_or_empty()
            .iter()
            .map(HistoryEntry::dedup_key)
            .collect()
    }

    fn write_atomic(&self, history: &[HistoryEntry]) -> Result<(), HistoryStoreError> {
        let content = serde_json::to_string_pretty(history).map_err(|source| {
            HistoryStoreError::Write {
                path: self.path.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, source),
            }
        })?;

        let dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|source| {
            HistoryStoreError::Write {
                path: self.path.clone(),
                source,
            }
        })?;
        temp.write_all(content.as_bytes())
            .map_err(|source| HistoryStoreError::Write {
                path: self.path.clone(),
                source,
            })?;
        temp.persist(&self.path)
            .map_err(|err| HistoryStoreError::Write {
                path: self.path.clone(),
                source: err.error,
            })?;
        Ok(())
    }
}
