use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HistoryEntry {
    pub path: String,     // Absolute directory path (UTF-8)
    pub visit_count: u64, // How many times the directory was entered
    #[serde(default)]
    pub last_visit: i64, // Unix seconds of the last visit, 0 = unknown
}

impl HistoryEntry {
    pub fn new(path: String, visit_count: u64, last_visit: i64) -> Self {
        Self {
            path,
            visit_count,
            last_visit,
        }
    }
}
