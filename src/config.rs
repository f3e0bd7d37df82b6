use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub history: HistoryConfig,
    pub display: DisplayConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_entries: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayConfig {
    // Total height of the inline completion widget, including the input,
    // separator and status lines.
    pub inline_rows: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub auto_select: bool,
    // Fixed heuristics carried over from the original tool; tune here
    // rather than in code.
    pub auto_select_threshold: i64,
    pub auto_select_margin: i64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_entries: 1000 }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { inline_rows: 13 }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            auto_select: true,
            auto_select_threshold: 100,
            auto_select_margin: 50,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history: HistoryConfig::default(),
            display: DisplayConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(config_dir) = config_path.parent() {
            fs::create_dir_all(config_dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".dj")
    }

    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_heuristics() {
        let config = Config::default();
        assert_eq!(config.history.max_entries, 1000);
        assert_eq!(config.search.auto_select_threshold, 100);
        assert_eq!(config.search.auto_select_margin, 50);
        assert!(config.search.auto_select);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: Config = toml::from_str("[search]\nauto_select = false\n").unwrap();
        assert!(!config.search.auto_select);
        assert_eq!(config.search.auto_select_threshold, 100);
        assert_eq!(config.history.max_entries, 1000);
        assert_eq!(config.display.inline_rows, 13);
    }
}
