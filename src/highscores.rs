//! Persist high scores to disk (XDG config or ~/.config/blockfall) as JSON.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const FILENAME: &str = "highscores.json";

/// Entries kept in the ranked list.
pub const MAX_ENTRIES: usize = 10;

pub const ANONYMOUS: &str = "Anonymous";

#[derive(Debug, Error)]
pub enum HighScoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed high score file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub score: u32,
    pub player: String,
}

impl Default for HighScoreEntry {
    fn default() -> Self {
        Self {
            score: 0,
            player: "None".to_string(),
        }
    }
}

/// On-disk layout: the single best record plus the ranked list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct ScoreFile {
    #[serde(default)]
    best: HighScoreEntry,
    #[serde(default)]
    top: Vec<HighScoreEntry>,
}

/// Returns the default path of the high scores file (config dir / blockfall / highscores.json).
pub fn default_path() -> PathBuf {
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from(".")),
    };
    base.join("blockfall").join(FILENAME)
}

/// Best score and top-ten list, backed by a JSON file.
#[derive(Debug, Clone)]
pub struct HighScoreStore {
    path: PathBuf,
    data: ScoreFile,
}

impl HighScoreStore {
    /// Load from `path`. A missing or unreadable file yields an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match read_file(&path) {
            Ok(Some(data)) => data,
            Ok(None) => ScoreFile::default(),
            Err(e) => {
                warn!("ignoring high scores at {}: {}", path.display(), e);
                ScoreFile::default()
            }
        };
        let mut store = Self { path, data };
        store.normalize();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn best(&self) -> &HighScoreEntry {
        &self.data.best
    }

    /// Ranked entries, best first.
    pub fn entries(&self) -> &[HighScoreEntry] {
        &self.data.top
    }

    /// True if `score` would beat the stored best.
    pub fn is_new_best(&self, score: u32) -> bool {
        score > self.data.best.score
    }

    /// Add a finished game, keep the list sorted and trimmed, and persist.
    /// Write failures are logged; the in-memory list is still updated.
    pub fn record(&mut self, score: u32, player: &str) -> &[HighScoreEntry] {
        let player = match player.trim() {
            "" => ANONYMOUS.to_string(),
            name => name.to_string(),
        };
        if self.is_new_best(score) {
            info!("new best score {} by {}", score, player);
            self.data.best = HighScoreEntry {
                score,
                player: player.clone(),
            };
        }
        self.data.top.push(HighScoreEntry { score, player });
        self.normalize();
        if let Err(e) = self.save() {
            warn!("could not save high scores to {}: {}", self.path.display(), e);
        }
        &self.data.top
    }

    /// Write to disk. Creates the parent directory if needed.
    pub fn save(&self) -> Result<(), HighScoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    fn normalize(&mut self) {
        // Stable: equal scores keep arrival order.
        self.data.top.sort_by(|a, b| b.score.cmp(&a.score));
        self.data.top.truncate(MAX_ENTRIES);
    }
}

fn read_file(path: &Path) -> Result<Option<ScoreFile>, HighScoreError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&content)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, HighScoreStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = HighScoreStore::load(dir.path().join("scores").join(FILENAME));
        (dir, store)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (_dir, store) = temp_store();
        assert!(store.entries().is_empty());
        assert_eq!(store.best().score, 0);
    }

    #[test]
    fn test_record_sorts_and_truncates() {
        let (_dir, mut store) = temp_store();
        for score in [40, 1200, 100, 300, 0, 2000, 80, 500, 40, 160, 760, 20] {
            store.record(score, "p");
        }
        let scores: Vec<u32> = store.entries().iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![2000, 1200, 760, 500, 300, 160, 100, 80, 40, 40]);
        assert_eq!(store.best().score, 2000);
    }

    #[test]
    fn test_blank_name_is_anonymous() {
        let (_dir, mut store) = temp_store();
        store.record(100, "   ");
        assert_eq!(store.entries()[0].player, ANONYMOUS);
        assert_eq!(store.best().player, ANONYMOUS);
    }

    #[test]
    fn test_best_only_replaced_by_higher_score() {
        let (_dir, mut store) = temp_store();
        store.record(300, "ana");
        store.record(300, "bo");
        store.record(100, "cy");
        assert_eq!(store.best().player, "ana");
        assert!(store.is_new_best(301));
        assert!(!store.is_new_best(300));
    }

    #[test]
    fn test_round_trip_through_file() {
        let (_dir, mut store) = temp_store();
        store.record(1200, "ana");
        store.record(40, "bo");
        let reloaded = HighScoreStore::load(store.path().to_path_buf());
        assert_eq!(reloaded.entries(), store.entries());
        assert_eq!(reloaded.best(), store.best());
    }

    #[test]
    fn test_malformed_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILENAME);
        fs::write(&path, "{ not json").unwrap();
        let store = HighScoreStore::load(&path);
        assert!(store.entries().is_empty());
    }

    #[test]
    fn test_unwritable_path_keeps_scores_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let mut store = HighScoreStore::load(blocker.join(FILENAME));
        store.record(40, "ana");
        assert_eq!(store.entries().len(), 1);
        assert!(store.save().is_err());
    }
}
