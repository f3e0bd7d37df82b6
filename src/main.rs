mod config;
mod history;
mod import;
mod keys;
mod render;
mod scoring;
mod selector;
mod store;
mod term;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use config::Config;
use history::HistoryEntry;
use import::{default_history_files, HistoryImporter};
use render::{Mode, Renderer};
use selector::{Outcome, Session};
use store::HistoryStore;

#[derive(Parser)]
#[command(name = "dj")]
#[command(version)]
#[command(about = "Jump to previously visited directories by frecency and fuzzy match")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    query: QueryArgs,
}

#[derive(Args)]
struct QueryArgs {
    /// Fragment of the directory name to jump to
    query: Option<String>,

    /// Render the selector in place below the prompt (shell completion)
    #[arg(long)]
    inline: bool,

    /// Print the ranked matches instead of selecting interactively
    #[arg(long)]
    list: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick a directory and print it to stdout (the default)
    Query(QueryArgs),
    /// Record a visit to a directory (called by the shell hook)
    Add {
        /// Directory that was entered
        path: PathBuf,
    },
    /// Import visited directories from shell history files
    Import {
        /// History file to import (default: ~/.bash_history and ~/.zsh_history)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Remove history entries
    Clean {
        /// Wipe the whole history instead of pruning dead directories
        #[arg(long)]
        all: bool,
    },
    /// Print the shell integration script
    Init {
        /// Shell to emit the integration for
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Shell {
    Bash,
    Zsh,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::new()?;
    // The data directory is resolved once here and passed down; nothing else
    // reads the environment.
    let data_dir = std::env::var_os("DJ_DATA")
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_data_dir);
    let store = HistoryStore::open(&data_dir, config.history.max_entries)?;

    match cli.command.unwrap_or(Commands::Query(cli.query)) {
        Commands::Query(args) => run_query(&config, &store, args),
        Commands::Add { path } => run_add(&store, path),
        Commands::Import { file } => run_import(&store, file),
        Commands::Clean { all } => run_clean(&store, all),
        Commands::Init { shell } => {
            print!(
                "{}",
                match shell {
                    Shell::Bash => BASH_INIT,
                    Shell::Zsh => ZSH_INIT,
                }
            );
            Ok(())
        }
    }
}

fn run_query(config: &Config, store: &HistoryStore, args: QueryArgs) -> Result<()> {
    // With piped stdin the candidates come from the pipe (no frecency data)
    // and keys are read from a self-opened /dev/tty.
    let entries = if term::stdin_is_tty() {
        store.load()?
    } else {
        read_candidate_lines()?
    };
    if entries.is_empty() {
        eprintln!("{}", "no directory history yet".yellow());
        eprintln!("{}", "hint: run `dj import` or `eval \"$(dj init bash)\"`".dimmed());
        std::process::exit(1);
    }

    let query = args.query.as_deref().unwrap_or("");
    let now = chrono::Utc::now().timestamp();
    let mode = if args.inline {
        Mode::Inline
    } else {
        Mode::Fullscreen
    };
    let (cols, rows) = term::size();
    let visible_rows = match mode {
        Mode::Fullscreen => (rows as usize).saturating_sub(1),
        Mode::Inline => config.display.inline_rows.min(rows as usize),
    };
    let max_visible = visible_rows.saturating_sub(mode.reserved_rows()).max(1);

    let session = Session::new(&entries, query, now, max_visible);

    if args.list {
        for entry in &session.filtered {
            println!("{}", entry.path);
        }
        return Ok(());
    }

    if config.search.auto_select && !query.is_empty() {
        if let Some(path) = session.auto_select(
            config.search.auto_select_threshold,
            config.search.auto_select_margin,
        ) {
            println!("{}", path);
            return Ok(());
        }
    }

    term::install_sigint_restore();
    let mut key_source = term::open_key_source()?;
    let guard = term::RawModeGuard::new().context("start selection session")?;
    let mut renderer = Renderer::new(mode, cols as usize);
    let outcome = session.run(&mut key_source, &mut renderer);
    drop(guard);

    match outcome? {
        Outcome::Selected(path) => {
            println!("{}", path);
            Ok(())
        }
        Outcome::Cancelled => std::process::exit(1),
    }
}

fn read_candidate_lines() -> Result<Vec<HistoryEntry>> {
    let stdin = io::stdin();
    let mut entries = Vec::new();
    for line in stdin.lock().lines() {
        let line = line.context("read candidate lines from stdin")?;
        if !line.trim().is_empty() {
            entries.push(HistoryEntry::new(line, 0, 0));
        }
    }
    Ok(entries)
}

fn run_add(store: &HistoryStore, path: PathBuf) -> Result<()> {
    // The hook fires on every prompt; stay quiet and skip anything that is
    // not a directory anymore.
    if path.is_dir() {
        store.record_visit(&path)?;
    }
    Ok(())
}

fn run_import(store: &HistoryStore, file: Option<PathBuf>) -> Result<()> {
    let files = match file {
        Some(f) => vec![f],
        None => default_history_files(),
    };
    if files.is_empty() {
        println!("{}", "no shell history files found".yellow());
        return Ok(());
    }

    let mut importer = HistoryImporter::new()?;
    for file in files {
        let (entries, stats) = importer.import_file(&file)?;
        let added = store.merge(entries)?;
        println!(
            "{}",
            format!(
                "{}: scanned {} commands, found {} directories, {} new",
                file.display(),
                stats.commands_scanned,
                stats.directories_found,
                added
            )
            .green()
        );
    }
    Ok(())
}

fn run_clean(store: &HistoryStore, all: bool) -> Result<()> {
    if all {
        let count = store.load()?.len();
        println!(
            "{}",
            format!("This removes all {} history entries.", count).red().bold()
        );
        if !confirm("Type yes to continue:")? {
            println!("{}", "aborted".yellow());
            return Ok(());
        }
        store.clear()?;
        println!("{}", "history cleared".green());
        return Ok(());
    }

    let removed = store.prune_missing()?;
    for entry in &removed {
        println!(
            "  - {} (last visit: {})",
            entry.path,
            format_last_visit(entry.last_visit)
        );
    }
    println!(
        "{}",
        format!("removed {} dead entries", removed.len()).green()
    );
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} ", prompt.yellow());
    io::stdout().flush().ok();
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return Ok(false);
    }
    Ok(input.trim().eq_ignore_ascii_case("yes"))
}

fn format_last_visit(timestamp: i64) -> String {
    if timestamp == 0 {
        return "unknown".to_string();
    }
    match chrono::DateTime::from_timestamp(timestamp, 0) {
        Some(utc) => utc
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "unknown".to_string(),
    }
}

const BASH_INIT: &str = r#"# dj shell integration. Add to ~/.bashrc:
#   eval "$(dj init bash)"
j() {
    local target
    target="$(dj query "$@")" && builtin cd "$target"
}

__dj_track() {
    \dj add "$PWD" 2>/dev/null
}

case ";$PROMPT_COMMAND;" in
    *";__dj_track;"*) ;;
    *) PROMPT_COMMAND="__dj_track${PROMPT_COMMAND:+;$PROMPT_COMMAND}" ;;
esac
"#;

const ZSH_INIT: &str = r#"# dj shell integration. Add to ~/.zshrc:
#   eval "$(dj init zsh)"
j() {
    local target
    target="$(dj query "$@")" && builtin cd "$target"
}

__dj_track() {
    \dj add "$PWD" 2>/dev/null
}

autoload -Uz add-zsh-hook
add-zsh-hook chpwd __dj_track
"#;
