//! # dirkeep CLI
//!
//! Command-line front end for the dirkeep library.
//!
//! ## Usage
//! ```bash
//! # Take the one and only snapshot of the current directory
//! dirkeep snapshot
//!
//! # Throw away local changes and go back to it
//! dirkeep rewind
//!
//! # Refresh the mirror and zip it
//! dirkeep sync
//! dirkeep package
//!
//! # Checksum every file
//! dirkeep macro --list
//! ```
//!
//! ## Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | success, including "snapshot already exists" and "no snapshot" |
//! | 2 | usage error |
//! | 3 | something required was not found |
//! | 4 | I/O, copy, delete or archive failure |
//! | 5 | state conflict (`snapshot --strict` with an existing snapshot) |
//! | 6 | invalid configuration |
//! | 1 | anything else |

use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use dirkeep::browse::OpenResult;
use dirkeep::{
    format_bytes, Dirkeep, DirkeepBuilder, ReplaceStrategy, Result, RewindOutcome,
    SnapshotOutcome,
};
use humantime::format_duration;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// dirkeep - snapshot, rewind, mirror and package one directory
#[derive(Parser)]
#[command(name = "dirkeep")]
#[command(version)]
#[command(about = "Single-slot snapshot, rewind, mirror and package for one directory")]
#[command(long_about = None)]
struct Cli {
    /// Managed root (defaults to current directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Snapshot directory (defaults to ../.backup_rewind01)
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Mirror directory (defaults to ../bot_local_master)
    #[arg(long, global = true)]
    mirror: Option<PathBuf>,

    /// Archive file (defaults to ../local_master.zip)
    #[arg(long, global = true)]
    archive: Option<PathBuf>,

    /// How rewind and sync replace trees
    #[arg(long, value_enum, default_value = "staged", global = true)]
    strategy: StrategyMode,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every directory and file under the root
    Map,

    /// List a directory or print a file inside the root
    Open {
        /// Path relative to the root
        #[arg(id = "target", value_name = "PATH")]
        target: Option<PathBuf>,
    },

    /// Take the snapshot, unless one already exists
    Snapshot {
        /// Fail instead of skipping when a snapshot exists
        #[arg(long)]
        strict: bool,
    },

    /// Replace the root with the snapshot (destructive)
    Rewind,

    /// Compute a checksum for every file under the root
    #[command(alias = "verify")]
    Macro {
        /// Print each file's digest
        #[arg(short, long)]
        list: bool,
    },

    /// Replace the mirror with a fresh copy of the root
    Sync,

    /// Zip the mirror into the archive
    Package,

    /// Show where every path lives and whether it exists
    Debug {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the root and mirror as a JSON tree
    Tree,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum StrategyMode {
    Staged,
    InPlace,
}

impl From<StrategyMode> for ReplaceStrategy {
    fn from(mode: StrategyMode) -> Self {
        match mode {
            StrategyMode::Staged => ReplaceStrategy::Staged,
            StrategyMode::InPlace => ReplaceStrategy::InPlace,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the status lines.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e.user_message());
        std::process::exit(e.exit_code());
    }
}

/// Main command runner
fn run(cli: Cli) -> Result<()> {
    let root = match cli.path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };

    let mut builder = DirkeepBuilder::new().replace_strategy(cli.strategy.into());
    if let Some(path) = cli.snapshot {
        builder = builder.snapshot_path(path);
    }
    if let Some(path) = cli.mirror {
        builder = builder.mirror_path(path);
    }
    if let Some(path) = cli.archive {
        builder = builder.archive_path(path);
    }
    let keeper = builder.build(root)?;

    match cli.command {
        Commands::Map => cmd_map(&keeper),
        Commands::Open { target } => cmd_open(&keeper, target.unwrap_or_default()),
        Commands::Snapshot { strict } => cmd_snapshot(&keeper, strict),
        Commands::Rewind => cmd_rewind(&keeper),
        Commands::Macro { list } => cmd_macro(&keeper, list),
        Commands::Sync => cmd_sync(&keeper),
        Commands::Package => cmd_package(&keeper),
        Commands::Debug { json } => cmd_debug(&keeper, json),
        Commands::Tree => cmd_tree(&keeper),
    }
}

fn cmd_map(keeper: &Dirkeep) -> Result<()> {
    for entry in keeper.map()? {
        println!("{}", entry.directory.blue().bold());
        for file in entry.files {
            println!("  {}", file);
        }
    }
    Ok(())
}

fn cmd_open(keeper: &Dirkeep, path: PathBuf) -> Result<()> {
    match keeper.open_path(&path)? {
        OpenResult::Directory(names) => {
            for name in names {
                println!("{}", name);
            }
        }
        OpenResult::File(content) => print!("{}", content),
        OpenResult::NotFound(path) => {
            println!("{} Not found: {}", "[open]".yellow(), path.display());
        }
    }
    Ok(())
}

/// Take the single snapshot
///
/// An existing snapshot is never overwritten. Remove it by hand to take a
/// new one.
fn cmd_snapshot(keeper: &Dirkeep, strict: bool) -> Result<()> {
    let start = Instant::now();
    let spinner = spinner("Copying tree...");

    let outcome = if strict {
        keeper.snapshot_strict().map(|stats| SnapshotOutcome::Created {
            path: keeper.layout().snapshot.clone(),
            stats,
        })
    } else {
        keeper.snapshot()
    };
    finish(spinner);

    match outcome? {
        SnapshotOutcome::Created { path, stats } => {
            println!(
                "{} saved to {} ({} files, {}, {})",
                "[snapshot]".green().bold(),
                path.display().to_string().cyan(),
                stats.files,
                format_bytes(stats.bytes),
                format_duration(round(start.elapsed()))
            );
        }
        SnapshotOutcome::AlreadyExists { path } => {
            println!(
                "{} already exists at {}; left untouched",
                "[snapshot]".yellow().bold(),
                path.display()
            );
        }
    }
    Ok(())
}

/// Replace the root with the snapshot
///
/// Everything in the root that is not in the snapshot is deleted.
fn cmd_rewind(keeper: &Dirkeep) -> Result<()> {
    let start = Instant::now();
    let spinner = spinner("Restoring tree...");
    let outcome = keeper.rewind();
    finish(spinner);

    match outcome? {
        RewindOutcome::Restored { stats, strategy } => {
            println!(
                "{} previous contents of {} were deleted ({})",
                "[rewind]".yellow().bold(),
                keeper.layout().root.display(),
                strategy
            );
            println!(
                "{} restored from {} ({} files, {})",
                "[rewind]".green().bold(),
                keeper.layout().snapshot.display().to_string().cyan(),
                stats.files,
                format_duration(round(start.elapsed()))
            );
        }
        RewindOutcome::NoSnapshot => {
            println!("{} no snapshot.", "[rewind]".yellow().bold());
        }
    }
    Ok(())
}

fn cmd_macro(keeper: &Dirkeep, list: bool) -> Result<()> {
    println!("{} computing checksums...", "[macro]".blue().bold());
    let start = Instant::now();
    let report = keeper.verify_all()?;

    if list {
        for file in &report.files {
            println!("{}  {}", file.digest, file.path.display());
        }
    }
    println!(
        "{} done. {} files, {} in {}",
        "[macro]".green().bold(),
        report.files.len(),
        format_bytes(report.total_bytes),
        format_duration(round(start.elapsed()))
    );
    Ok(())
}

/// Replace the mirror with a fresh copy of the root
fn cmd_sync(keeper: &Dirkeep) -> Result<()> {
    let start = Instant::now();
    let spinner = spinner("Mirroring tree...");
    let outcome = keeper.sync();
    finish(spinner);
    let outcome = outcome?;

    if outcome.replaced_previous {
        println!("{} removed previous mirror", "[sync]".yellow().bold());
    }
    println!(
        "{} mirror created at {} ({} files, {}, {})",
        "[sync]".green().bold(),
        outcome.path.display().to_string().cyan(),
        outcome.stats.files,
        format_bytes(outcome.stats.bytes),
        format_duration(round(start.elapsed()))
    );
    Ok(())
}

fn cmd_package(keeper: &Dirkeep) -> Result<()> {
    let spinner = spinner("Compressing mirror...");
    let report = keeper.package();
    finish(spinner);
    let report = report?;

    println!(
        "{} created {} ({} files, {} -> {})",
        "[package]".green().bold(),
        report.path.display().to_string().cyan(),
        report.files,
        format_bytes(report.bytes),
        format_bytes(report.archive_size)
    );
    for path in &report.skipped {
        println!("{} skipped {}", "[package]".yellow().bold(), path.display());
    }
    Ok(())
}

fn cmd_debug(keeper: &Dirkeep, json: bool) -> Result<()> {
    let status = keeper.status();
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let mark = |exists: bool| if exists { "yes".green() } else { "no".red() };
    println!("ROOT: {}", status.root.path.display());
    println!("ROOT exists: {}", mark(status.root.exists));
    println!("SNAPSHOT exists: {} ({})", mark(status.snapshot.exists), status.snapshot.path.display());
    println!("MIRROR exists: {} ({})", mark(status.mirror.exists), status.mirror.path.display());
    println!("ARCHIVE exists: {} ({})", mark(status.archive.exists), status.archive.path.display());
    println!("ARCHIVE parent exists: {}", mark(status.archive_parent_exists));
    println!("Strategy: {}", keeper.strategy());
    Ok(())
}

fn cmd_tree(keeper: &Dirkeep) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&keeper.tree()?)?);
    Ok(())
}

// Helper functions

/// Spinner on stdout when it is a terminal
fn spinner(message: &'static str) -> Option<ProgressBar> {
    if !std::io::stdout().is_terminal() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

fn finish(spinner: Option<ProgressBar>) {
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
}

/// Drop sub-millisecond noise from durations shown to the user
fn round(duration: Duration) -> Duration {
    Duration::from_millis(duration.as_millis() as u64)
}
