use crate::history::HistoryEntry;
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser};

/// Extracts `cd` targets from shell history files. Commands are parsed with
/// the bash grammar rather than split on whitespace, so quoting, `&&` chains
/// and `;` lists are handled for free.
pub struct HistoryImporter {
    parser: Parser,
    // zsh extended history: `: <timestamp>:<duration>;<command>`
    zsh_line: Regex,
    home: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ImportStats {
    pub commands_scanned: usize,
    pub directories_found: usize,
}

impl HistoryImporter {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let lang = tree_sitter_bash::language();
        parser
            .set_language(&lang)
            .context("load bash grammar")?;
        Ok(Self {
            parser,
            zsh_line: Regex::new(r"^:\s*(\d+):\d+;(.*)$").context("compile zsh history pattern")?,
            home: dirs::home_dir(),
        })
    }

    /// Reads one history file and aggregates visits per directory. Only
    /// absolute (or `~`-expanded) targets that still exist as directories
    /// are kept; relative targets depend on a working directory the history
    /// does not record.
    pub fn import_file(&mut self, path: &Path) -> Result<(Vec<HistoryEntry>, ImportStats)> {
        let raw = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        let content = String::from_utf8_lossy(&raw);

        let mut stats = ImportStats::default();
        let mut visits: BTreeMap<String, (u64, i64)> = BTreeMap::new();

        for line in content.lines() {
            let (timestamp, command) = match self.zsh_line.captures(line) {
                Some(caps) => {
                    let ts = caps[1].parse::<i64>().unwrap_or(0);
                    let cmd = caps.get(2).map(|m| m.as_str()).unwrap_or("");
                    (ts, cmd.to_string())
                }
                None => (0, line.to_string()),
            };
            if command.trim().is_empty() {
                continue;
            }
            stats.commands_scanned += 1;

            for target in self.cd_targets(&command) {
                if let Some(dir) = self.resolve_target(&target) {
                    let slot = visits.entry(dir).or_insert((0, 0));
                    slot.0 += 1;
                    slot.1 = slot.1.max(timestamp);
                }
            }
        }

        let entries: Vec<HistoryEntry> = visits
            .into_iter()
            .map(|(path, (count, ts))| HistoryEntry::new(path, count, ts))
            .collect();
        stats.directories_found = entries.len();
        Ok((entries, stats))
    }

    fn cd_targets(&mut self, command: &str) -> Vec<String> {
        let mut targets = Vec::new();
        if let Some(tree) = self.parser.parse(command, None) {
            collect_cd_targets(tree.root_node(), command, &mut targets);
        }
        targets
    }

    fn resolve_target(&self, raw: &str) -> Option<String> {
        let unquoted = strip_quotes(raw);
        if unquoted.is_empty() || unquoted.starts_with('-') {
            return None;
        }

        let expanded = if unquoted == "~" {
            self.home.clone()?
        } else if let Some(rest) = unquoted.strip_prefix("~/") {
            self.home.clone()?.join(rest)
        } else {
            PathBuf::from(unquoted)
        };

        if !expanded.is_absolute() || !expanded.is_dir() {
            return None;
        }
        let canonical = fs::canonicalize(&expanded).unwrap_or(expanded);
        canonical.to_str().map(str::to_string)
    }
}

// First argument of every `cd` command node in the tree.
fn collect_cd_targets(node: Node, source: &str, out: &mut Vec<String>) {
    if node.kind() == "command" {
        let mut cursor = node.walk();
        let mut is_cd = false;
        let mut target: Option<String> = None;
        for child in node.children(&mut cursor) {
            match child.kind() {
                "command_name" => {
                    is_cd = child.utf8_text(source.as_bytes()) == Ok("cd");
                }
                "word" | "string" | "raw_string" | "concatenation" => {
                    if target.is_none() {
                        if let Ok(text) = child.utf8_text(source.as_bytes()) {
                            target = Some(text.to_string());
                        }
                    }
                }
                _ => {}
            }
        }
        if is_cd {
            if let Some(t) = target {
                out.push(t);
            }
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_cd_targets(child, source, out);
    }
}

fn strip_quotes(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 {
        let quoted = (trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\''));
        if quoted {
            return &trimmed[1..trimmed.len() - 1];
        }
    }
    trimmed
}

/// History files checked by `dj import` when no file is given.
pub fn default_history_files() -> Vec<PathBuf> {
    let Some(home) = dirs::home_dir() else {
        return Vec::new();
    };
    [".bash_history", ".zsh_history"]
        .iter()
        .map(|name| home.join(name))
        .filter(|p| p.exists())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_history(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("history");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn imports_absolute_cd_targets() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("proj");
        fs::create_dir(&target).unwrap();
        let target_str = target.to_str().unwrap();

        let history = write_history(
            &dir,
            &format!("ls -la\ncd {target_str}\necho hi\ncd {target_str}\n"),
        );
        let mut importer = HistoryImporter::new().unwrap();
        let (entries, stats) = importer.import_file(&history).unwrap();

        assert_eq!(stats.commands_scanned, 4);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].visit_count, 2);
        assert_eq!(entries[0].last_visit, 0);
    }

    #[test]
    fn zsh_extended_history_carries_timestamps() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("proj");
        fs::create_dir(&target).unwrap();
        let target_str = target.to_str().unwrap();

        let history = write_history(
            &dir,
            &format!(": 1700000000:0;cd {target_str}\n: 1700000500:2;cd {target_str}\n"),
        );
        let mut importer = HistoryImporter::new().unwrap();
        let (entries, _) = importer.import_file(&history).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].visit_count, 2);
        assert_eq!(entries[0].last_visit, 1_700_000_500);
    }

    #[test]
    fn finds_cd_inside_command_chains() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("proj");
        fs::create_dir(&target).unwrap();
        let target_str = target.to_str().unwrap();

        let history = write_history(&dir, &format!("make && cd {target_str} && ls\n"));
        let mut importer = HistoryImporter::new().unwrap();
        let (entries, _) = importer.import_file(&history).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn skips_relative_missing_and_flag_targets() {
        let dir = TempDir::new().unwrap();
        let history = write_history(&dir, "cd ..\ncd projects\ncd -\ncd /definitely/not/here\n");
        let mut importer = HistoryImporter::new().unwrap();
        let (entries, stats) = importer.import_file(&history).unwrap();
        assert!(entries.is_empty());
        assert_eq!(stats.commands_scanned, 4);
    }

    #[test]
    fn quoted_targets_are_unquoted() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("my proj");
        fs::create_dir(&target).unwrap();
        let target_str = target.to_str().unwrap();

        let history = write_history(&dir, &format!("cd \"{target_str}\"\n"));
        let mut importer = HistoryImporter::new().unwrap();
        let (entries, _) = importer.import_file(&history).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].path.ends_with("my proj"));
    }
}
