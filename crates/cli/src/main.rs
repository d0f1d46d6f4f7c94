// renum CLI - scan and repair post numbering in a threaded SQLite store

mod config;
mod exit_codes;
mod links;
mod progress;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use renum_engine::report::{NoProgress, Progress};
use renum_engine::{EngineError, RepairPolicy, RunReport, Store};
use renum_store::SqliteStore;

use config::FileConfig;
use exit_codes::{EXIT_ERROR, EXIT_PARTIAL_FAILURE, EXIT_STORE, EXIT_SUCCESS, EXIT_USAGE};
use links::UrlLinks;
use progress::StderrProgress;

const DEFAULT_BASE_URL: &str = "http://localhost";

#[derive(Parser)]
#[command(name = "renum")]
#[command(about = "Reconcile post numbering inside every thread of a forum database")]
#[command(version)]
#[command(after_help = "\
Without repair flags the pass only scans and reports.

Examples:
  renum --db forum.db
  renum --db forum.db --enumerate --base-url https://forum.example
  renum --db forum.db --missing
  renum --db forum.db --partial --fix-duplicates
  renum --db forum.db --all --json
  renum --config renum.toml --all")]
struct Cli {
    /// SQLite database to reconcile
    #[arg(long, env = "RENUM_DB")]
    db: Option<PathBuf>,

    /// TOML config file (db, base_url); flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Re-number every thread, even if the numbers were ok.
    /// --fix-duplicates and --fix-disorder become redundant
    #[arg(long)]
    all: bool,

    /// Add missing numbers to partially numbered threads
    #[arg(long)]
    partial: bool,

    /// Add numbers to threads without numbers
    #[arg(long)]
    missing: bool,

    /// Completely re-number threads that have duplicate numbers.
    /// Affects all threads unless --partial is used, in which case only
    /// partially numbered threads are fixed
    #[arg(long)]
    fix_duplicates: bool,

    /// Completely re-number threads that have out-of-order numbers.
    /// Scoped by --partial like --fix-duplicates
    #[arg(long)]
    fix_disorder: bool,

    /// Output links to threads with anomalies
    #[arg(long)]
    enumerate: bool,

    /// Link prefix for --enumerate output
    #[arg(long)]
    base_url: Option<String>,

    /// Emit the full report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Suppress the progress line
    #[arg(long, short = 'q')]
    quiet: bool,
}

fn main() -> ExitCode {
    match real_main() {
        Ok(code) => ExitCode::from(code),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {message}");
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {hint}");
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
struct CliError {
    code: u8,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn usage(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_USAGE,
            message: msg.into(),
            hint: None,
        }
    }

    fn store(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_STORE,
            message: msg.into(),
            hint: None,
        }
    }

    fn fatal(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_ERROR,
            message: msg.into(),
            hint: None,
        }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn real_main() -> Result<u8, CliError> {
    let cli = Cli::parse();

    let file = match &cli.config {
        Some(path) => FileConfig::load(path).map_err(CliError::usage)?,
        None => FileConfig::default(),
    };

    let db = cli
        .db
        .or(file.db)
        .ok_or_else(|| {
            CliError::usage("no database given")
                .with_hint("pass --db <path> or set db in a --config file")
        })?;

    let base_url = cli
        .base_url
        .or(file.base_url)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let policy = RepairPolicy {
        all: cli.all,
        missing: cli.missing,
        partial: cli.partial,
        fix_duplicates: cli.fix_duplicates,
        fix_disorder: cli.fix_disorder,
        enumerate: cli.enumerate,
    };

    let store = SqliteStore::open(&db).map_err(|e| CliError::store(e.to_string()))?;
    let total = store
        .count_threads()
        .map_err(|e| CliError::store(e.to_string()))?;

    let mut progress: Box<dyn Progress> = if cli.quiet {
        Box::new(NoProgress)
    } else {
        Box::new(StderrProgress::new(total))
    };
    let mut links = UrlLinks::new(&base_url);

    let report =
        renum_engine::run(&store, &policy, &mut *progress, &mut links).map_err(|e| match e {
            EngineError::Store(err) => CliError::store(err.to_string()),
            EngineError::Invariant(_) => CliError::fatal(e.to_string()),
        })?;

    print_report(&report, cli.json)?;

    if report.failures.is_empty() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_PARTIAL_FAILURE)
    }
}

/// Human summary on stderr; machine report on stdout when asked.
fn print_report(report: &RunReport, json: bool) -> Result<(), CliError> {
    for line in report.summary_lines() {
        eprintln!("{line}");
    }

    if json {
        let raw = serde_json::to_string_pretty(report)
            .map_err(|e| CliError::fatal(format!("JSON serialization error: {e}")))?;
        println!("{raw}");
    }

    Ok(())
}
