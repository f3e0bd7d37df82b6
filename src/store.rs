use crate::history::HistoryEntry;
use crate::scoring;
use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk visit history, one JSON file under the data directory.
pub struct HistoryStore {
    history_path: PathBuf,
    max_entries: usize,
}

impl HistoryStore {
    pub fn open(data_dir: &Path, max_entries: usize) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("create data directory {}", data_dir.display()))?;
        Ok(Self {
            history_path: data_dir.join("history.json"),
            max_entries,
        })
    }

    /// Loads the whole history; a missing file is an empty history.
    pub fn load(&self) -> Result<Vec<HistoryEntry>> {
        if !self.history_path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&self.history_path)
            .with_context(|| format!("open {}", self.history_path.display()))?;
        let entries: Vec<HistoryEntry> = serde_json::from_reader(file)
            .with_context(|| format!("parse {}", self.history_path.display()))?;
        Ok(entries)
    }

    pub fn save(&self, entries: &[HistoryEntry]) -> Result<()> {
        let file = fs::File::create(&self.history_path)
            .with_context(|| format!("write {}", self.history_path.display()))?;
        serde_json::to_writer_pretty(file, entries).context("serialize history")?;
        Ok(())
    }

    /// Records one visit: bumps the entry for `path` (creating it if new),
    /// stamps the current time, and enforces the size cap.
    pub fn record_visit(&self, path: &Path) -> Result<()> {
        let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let path_str = canonical
            .to_str()
            .with_context(|| format!("path is not valid UTF-8: {}", canonical.display()))?
            .to_string();

        let now = Utc::now().timestamp();
        let mut entries = self.load()?;
        match entries.iter_mut().find(|e| e.path == path_str) {
            Some(entry) => {
                entry.visit_count += 1;
                entry.last_visit = now;
            }
            None => entries.push(HistoryEntry::new(path_str, 1, now)),
        }
        self.enforce_cap(&mut entries, now);
        entries.sort_by(|a, b| b.last_visit.cmp(&a.last_visit));
        self.save(&entries)
    }

    /// Merges imported entries into the history: counts add up, the newest
    /// timestamp wins. Returns how many entries were new.
    pub fn merge(&self, imported: Vec<HistoryEntry>) -> Result<usize> {
        let mut entries = self.load()?;
        let mut added = 0;
        for incoming in imported {
            match entries.iter_mut().find(|e| e.path == incoming.path) {
                Some(existing) => {
                    existing.visit_count += incoming.visit_count;
                    existing.last_visit = existing.last_visit.max(incoming.last_visit);
                }
                None => {
                    entries.push(incoming);
                    added += 1;
                }
            }
        }
        self.enforce_cap(&mut entries, Utc::now().timestamp());
        entries.sort_by(|a, b| b.last_visit.cmp(&a.last_visit));
        self.save(&entries)?;
        Ok(added)
    }

    /// Drops entries whose directory no longer exists. Returns the removed
    /// entries so the caller can report them.
    pub fn prune_missing(&self) -> Result<Vec<HistoryEntry>> {
        let entries = self.load()?;
        let (kept, removed): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|e| Path::new(&e.path).is_dir());
        if !removed.is_empty() {
            self.save(&kept)?;
        }
        Ok(removed)
    }

    pub fn clear(&self) -> Result<()> {
        if self.history_path.exists() {
            fs::remove_file(&self.history_path)
                .with_context(|| format!("remove {}", self.history_path.display()))?;
        }
        Ok(())
    }

    // When the history outgrows the cap, the lowest-frecency entries go first.
    fn enforce_cap(&self, entries: &mut Vec<HistoryEntry>, now: i64) {
        if entries.len() <= self.max_entries {
            return;
        }
        entries.sort_by(|a, b| {
            let fa = scoring::frecency(a.visit_count, a.last_visit, now);
            let fb = scoring::frecency(b.visit_count, b.last_visit, now);
            fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal)
        });
        entries.truncate(self.max_entries);
    }
}
