use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::ArgAction;
use clap::{Args, Parser, Subcommand};
use dupe_index_core::{
    flatten_paths, snapshot, DuplicateGroup, Engine, PathPolicy, ProgressSink, ReconcileOptions,
    ReconcileSummary,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "dupe-index",
    version,
    about = "Index file contents under chosen locations and report byte-identical duplicates."
)]
struct Cli {
    /// Index snapshot file read at start and written back after changes.
    #[arg(long, global = true, default_value = "dupe-index.json", value_name = "FILE")]
    state: PathBuf,

    /// Hide the progress bar.
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Make the index cover exactly the given paths (purge, scan, rescan).
    Sync(SyncArgs),
    /// Fully re-index the given paths, discarding their previous records.
    Scan(PathArgs),
    /// Pick up added and removed files under already indexed paths.
    Rescan(RescanArgs),
    /// Drop records for the given paths, or everything with --all.
    Purge(PurgeArgs),
    /// List indexed locations.
    Locations,
    /// Print duplicate groups from the index.
    Duplicates(DuplicatesArgs),
}

#[derive(Debug, Args)]
struct SyncArgs {
    /// Every location the index should cover afterwards.
    #[arg(long = "paths", value_name = "PATH", num_args = 1.., action = ArgAction::Append, required = true)]
    paths: Vec<String>,

    /// File name glob applied while enumerating.
    #[arg(long, default_value = "*", value_name = "GLOB")]
    pattern: String,
}

#[derive(Debug, Args)]
struct PathArgs {
    /// One or more root paths.
    #[arg(long = "paths", value_name = "PATH", num_args = 1.., action = ArgAction::Append, required = true)]
    paths: Vec<String>,

    /// File name glob applied while enumerating.
    #[arg(long, default_value = "*", value_name = "GLOB")]
    pattern: String,
}

#[derive(Debug, Args)]
struct RescanArgs {
    /// Paths to rescan. If omitted, every indexed location is rescanned.
    #[arg(long = "paths", value_name = "PATH", num_args = 1.., action = ArgAction::Append)]
    paths: Vec<String>,

    /// File name glob applied while enumerating.
    #[arg(long, default_value = "*", value_name = "GLOB")]
    pattern: String,
}

#[derive(Debug, Args)]
struct PurgeArgs {
    #[arg(long = "paths", value_name = "PATH", num_args = 1.., action = ArgAction::Append)]
    paths: Vec<String>,

    /// Clear the whole index.
    #[arg(long, conflicts_with = "paths")]
    all: bool,
}

#[derive(Debug, Args)]
struct DuplicatesArgs {
    /// Optional JSON output file for the duplicate groups.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print only the duplicate file paths, one per line.
    #[arg(long, conflicts_with = "output")]
    paths_only: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Sync(args) => run_sync_command(&cli.state, cli.quiet, args),
        Commands::Scan(args) => run_scan_command(&cli.state, cli.quiet, args),
        Commands::Rescan(args) => run_rescan_command(&cli.state, cli.quiet, args),
        Commands::Purge(args) => run_purge_command(&cli.state, args),
        Commands::Locations => run_locations_command(&cli.state),
        Commands::Duplicates(args) => run_duplicates_command(&cli.state, args),
    }
}

fn open_engine(state: &Path, pattern: &str) -> Result<Engine> {
    let index = snapshot::load(state, PathPolicy::default())
        .with_context(|| format!("failed to load index {}", state.display()))?;
    let options = ReconcileOptions {
        search_pattern: pattern.to_string(),
        ..ReconcileOptions::default()
    };
    Ok(Engine::on_disk(index).with_options(options))
}

fn save_engine(engine: &Engine, state: &Path) -> Result<()> {
    snapshot::save(engine.index(), state)
        .with_context(|| format!("failed to write index {}", state.display()))?;
    info!("index written to {}", state.display());
    Ok(())
}

fn run_sync_command(state: &Path, quiet: bool, args: SyncArgs) -> Result<()> {
    let mut engine = open_engine(state, &args.pattern)?;
    let bar = progress_bar(quiet);
    let report = engine.synchronize(&args.paths, &bar);
    bar.finish_and_clear();
    save_engine(&engine, state)?;

    println!(
        "Sync: {} new, {} rescanned, {} purged location(s).",
        report.plan.new_locations.len(),
        report.plan.rescan_locations.len(),
        report.plan.purge_locations.len()
    );
    if let Some(summary) = &report.scan {
        print_summary("Scan", summary);
    }
    if let Some(summary) = &report.rescan {
        print_summary("Rescan", summary);
    }
    if let Some(error) = report.error {
        bail!("sync stopped early: {error}");
    }
    print_duplicate_totals(&engine.duplicate_groups());
    Ok(())
}

fn run_scan_command(state: &Path, quiet: bool, args: PathArgs) -> Result<()> {
    let mut engine = open_engine(state, &args.pattern)?;
    let bar = progress_bar(quiet);
    let result = engine.scan(&args.paths, &bar);
    bar.finish_and_clear();
    let summary = result.context("scan failed")?;
    save_engine(&engine, state)?;

    print_summary("Scan", &summary);
    print_duplicate_totals(&engine.duplicate_groups());
    Ok(())
}

fn run_rescan_command(state: &Path, quiet: bool, args: RescanArgs) -> Result<()> {
    let mut engine = open_engine(state, &args.pattern)?;
    let paths = if args.paths.is_empty() {
        engine.list_indexed_locations()
    } else {
        args.paths
    };
    if paths.is_empty() {
        println!("Nothing indexed yet; run `dupe-index scan` first.");
        return Ok(());
    }

    let bar = progress_bar(quiet);
    let result = engine.rescan(&paths, &bar);
    bar.finish_and_clear();
    let summary = result.context("rescan failed")?;
    save_engine(&engine, state)?;

    print_summary("Rescan", &summary);
    print_duplicate_totals(&engine.duplicate_groups());
    Ok(())
}

fn run_purge_command(state: &Path, args: PurgeArgs) -> Result<()> {
    if args.paths.is_empty() && !args.all {
        bail!("pass --paths to purge specific locations or --all to clear the index");
    }

    let mut engine = open_engine(state, "*")?;
    let before = engine.index().files().len();
    if args.all {
        engine.purge(None)?;
    } else {
        engine.purge(Some(args.paths.as_slice()))?;
    }
    save_engine(&engine, state)?;

    println!(
        "Purged {} file record(s); {} location(s) remain indexed.",
        before.saturating_sub(engine.index().files().len()),
        engine.list_indexed_locations().len()
    );
    Ok(())
}

fn run_locations_command(state: &Path) -> Result<()> {
    let engine = open_engine(state, "*")?;
    let locations = engine.list_indexed_locations();
    if locations.is_empty() {
        println!("No locations indexed in {}", state.display());
    }
    for location in locations {
        println!("{location}");
    }
    Ok(())
}

fn run_duplicates_command(state: &Path, args: DuplicatesArgs) -> Result<()> {
    let engine = open_engine(state, "*")?;
    let groups = engine.duplicate_groups();

    if args.paths_only {
        for path in flatten_paths(&groups) {
            println!("{path}");
        }
        return Ok(());
    }
    if groups.is_empty() {
        println!("No duplicates found in {}", state.display());
    }
    for group in &groups {
        let digest = group
            .digest
            .as_ref()
            .map(|digest| digest.short_hex())
            .unwrap_or_else(|| "no-digest".to_string());
        match group.wasted_bytes() {
            Some(wasted) => println!(
                "[{digest}] {} copies, {} reclaimable",
                group.files.len(),
                human_bytes(wasted)
            ),
            None => println!("[{digest}] {} copies", group.files.len()),
        }
        for file in &group.files {
            println!("  {}", file.path);
        }
    }

    if let Some(output) = args.output {
        let payload =
            serde_json::to_string_pretty(&groups).context("failed to serialize duplicates")?;
        fs::write(&output, payload)
            .with_context(|| format!("failed to write duplicates to {}", output.display()))?;
        println!("Duplicates JSON written to {}", output.display());
    }

    Ok(())
}

/// Progress bar fed by the engine's percentage reports.
struct BarSink(ProgressBar);

impl BarSink {
    fn finish_and_clear(&self) {
        self.0.finish_and_clear();
    }
}

impl ProgressSink for BarSink {
    fn report(&self, percent: u32) {
        self.0.set_position(u64::from(percent));
    }
}

fn progress_bar(quiet: bool) -> BarSink {
    if quiet {
        return BarSink(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template("  Indexing [{bar:30.cyan/dim}] {pos:>3}%") {
        bar.set_style(style.progress_chars("━╸─"));
    }
    BarSink(bar)
}

fn print_summary(label: &str, summary: &ReconcileSummary) {
    println!(
        "{label}: {} hashed, {} skipped, {} removed ({} step(s)).",
        summary.hashed, summary.skipped, summary.removed, summary.total_steps
    );
}

fn print_duplicate_totals(groups: &[DuplicateGroup]) {
    let files = groups.iter().map(|group| group.files.len()).sum::<usize>();
    let wasted = groups
        .iter()
        .filter_map(DuplicateGroup::wasted_bytes)
        .sum::<u64>();
    println!(
        "{} duplicate group(s), {} file(s), {} reclaimable.",
        groups.len(),
        files,
        human_bytes(wasted)
    );
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn human_bytes(value: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if value == 0 {
        return "0 B".to_string();
    }
    let mut size = value as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}
