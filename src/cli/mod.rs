//! # CLI Module
//!
//! Command-line interface for the photo sifter.
//!
//! ## Usage
//! ```bash
//! # Find exact duplicates
//! photosift scan ~/Pictures
//!
//! # Keep one copy and move the rest to the review area
//! photosift resolve ~/Pictures --keep ~/Pictures/a.jpg
//!
//! # Undo, or permanently delete, a staged file
//! photosift revert 3f2a
//! photosift commit 3f2a --yes
//!
//! # Preview, then apply, a date-based layout
//! photosift organize ~/Incoming --into ~/Library
//! photosift organize ~/Incoming --into ~/Library --apply
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_sifter::core::organize::{
    FileOutcome, FolderStructure, OrganizeExecutor, OrganizePlan, OrganizePlanner,
    OrganizeReport, PlannedAction,
};
use photo_sifter::core::scanner::{ScanResult, ScanSession};
use photo_sifter::core::staging::{ReviewSummary, StageManager, StageOutcome, StageRecord};
use photo_sifter::core::{CancellationToken, Fingerprint};
use photo_sifter::error::{Result, SiftError};
use photo_sifter::events::{Event, EventChannel, EventReceiver, HashEvent, OrganizeEvent, ScanEvent};
use photo_sifter::SiftConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

/// Photo Sifter - exact duplicate finder and date organizer that never deletes on its own
#[derive(Parser, Debug)]
#[command(name = "photosift")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Settings file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Review directory for staged files
    #[arg(long, global = true)]
    review_dir: Option<PathBuf>,

    /// Staging record database
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan directories for exact duplicates
    Scan {
        #[command(flatten)]
        scan: ScanArgs,
    },
    /// Move one file into the review area
    Stage {
        file: PathBuf,
        /// Fingerprint of the duplicate set the file belongs to
        #[arg(long)]
        group: String,
    },
    /// Scan, then keep one file of its duplicate set and stage the others
    Resolve {
        #[command(flatten)]
        scan: ScanArgs,
        /// The copy to keep
        #[arg(long)]
        keep: PathBuf,
    },
    /// Move staged files back to where they came from
    Revert {
        /// Record id or unique prefix
        #[arg(required_unless_present = "all")]
        id: Option<String>,
        #[arg(long, conflicts_with = "id")]
        all: bool,
    },
    /// Permanently delete a staged file
    Commit {
        /// Record id or unique prefix
        id: String,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Clear a staging record without touching any file
    Forget {
        /// Record id or unique prefix
        id: String,
    },
    /// List files in the review area
    Staged,
    /// Plan a date-based layout and optionally apply it
    Organize {
        #[command(flatten)]
        scan: ScanArgs,
        /// Destination library root
        #[arg(long)]
        into: PathBuf,
        /// Use year/month/day folders
        #[arg(long)]
        by_day: bool,
        /// Move files; without this only the plan is shown
        #[arg(long)]
        apply: bool,
    },
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Directories to scan
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Stop examining files after this many
    #[arg(long)]
    ceiling: Option<usize>,

    /// Hashing worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Include hidden files
    #[arg(long)]
    include_hidden: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (paths only)
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    photo_sifter::init_tracing(cli.global.verbose);

    let mut config = SiftConfig::load_or_default(cli.global.config.as_deref())?;
    if let Some(dir) = &cli.global.review_dir {
        config.review_dir = dir.clone();
    }
    if let Some(db) = &cli.global.database {
        config.database = db.clone();
    }

    let ctx = Context {
        term: Term::stderr(),
        output: cli.global.output,
        config,
    };

    match cli.command {
        Commands::Scan { scan } => ctx.run_scan(&scan),
        Commands::Stage { file, group } => ctx.run_stage(&file, &group),
        Commands::Resolve { scan, keep } => ctx.run_resolve(&scan, &keep),
        Commands::Revert { id, all } => ctx.run_revert(id.as_deref(), all),
        Commands::Commit { id, yes } => ctx.run_commit(&id, yes),
        Commands::Forget { id } => ctx.run_forget(&id),
        Commands::Staged => ctx.run_staged(),
        Commands::Organize {
            scan,
            into,
            by_day,
            apply,
        } => ctx.run_organize(&scan, &into, by_day, apply),
    }
}

struct Context {
    term: Term,
    output: OutputFormat,
    config: SiftConfig,
}

impl Context {
    fn pretty(&self) -> bool {
        matches!(self.output, OutputFormat::Pretty)
    }

    fn line(&self, text: impl AsRef<str>) {
        self.term.write_line(text.as_ref()).ok();
    }

    /// Settings with per-command scan flags layered on top
    fn config_for(&self, args: &ScanArgs) -> SiftConfig {
        let mut config = self.config.clone();
        if let Some(ceiling) = args.ceiling {
            config.ceiling = Some(ceiling);
        }
        if let Some(workers) = args.workers {
            config.workers = workers;
        }
        config.include_hidden |= args.include_hidden;
        config
    }

    fn manager(&self) -> Result<StageManager> {
        Ok(StageManager::open(&self.config.review_dir, &self.config.database)?)
    }

    fn scan(&self, args: &ScanArgs) -> Result<ScanResult> {
        let (sender, receiver) = EventChannel::new();
        let progress = spawn_progress(receiver, self.pretty());

        let session = ScanSession::new(self.config_for(args).scan_config()).with_events(sender);
        let result = session.scan(&args.paths);

        // The session owned the only sender; the progress thread ends with it
        drop(session);
        progress.join().ok();

        Ok(result?)
    }

    fn run_scan(&self, args: &ScanArgs) -> Result<()> {
        if self.pretty() {
            self.header();
        }
        let result = self.scan(args)?;

        match self.output {
            OutputFormat::Pretty => self.print_scan(&result),
            OutputFormat::Json => print_json(&result)?,
            OutputFormat::Minimal => {
                for group in &result.groups {
                    for path in group.paths() {
                        println!("{}", path.display());
                    }
                    println!();
                }
            }
        }
        Ok(())
    }

    fn run_stage(&self, file: &Path, group: &str) -> Result<()> {
        let fingerprint: Fingerprint = group
            .parse()
            .map_err(|e: photo_sifter::core::hasher::ParseFingerprintError| SiftError::Config(e.to_string()))?;
        let record = self.manager()?.stage(file, &fingerprint)?;

        match self.output {
            OutputFormat::Json => print_json(&record)?,
            OutputFormat::Minimal => println!("{}", record.id),
            OutputFormat::Pretty => self.line(format!(
                "{} Staged {} -> {}  [{}]",
                style("✓").green().bold(),
                display_path(&record.original_path),
                display_path(&record.staged_path),
                style(record.id).dim()
            )),
        }
        Ok(())
    }

    fn run_resolve(&self, args: &ScanArgs, keep: &Path) -> Result<()> {
        let keep = keep
            .canonicalize()
            .map_err(|e| SiftError::Config(format!("cannot use {} as keeper: {}", keep.display(), e)))?;

        let result = self.scan(args)?;
        let group = result.group_for(&keep).ok_or_else(|| {
            SiftError::Config(format!("{} has no duplicates in the scanned folders", keep.display()))
        })?;

        let outcomes = self
            .manager()?
            .resolve_group(group, &keep, &CancellationToken::new())?;

        match self.output {
            OutputFormat::Json => {
                let view: Vec<OutcomeView> = outcomes.iter().map(OutcomeView::from).collect();
                print_json(&view)?;
            }
            OutputFormat::Minimal => {
                for outcome in outcomes.iter().filter(|o| o.is_staged()) {
                    println!("{}", outcome.path.display());
                }
            }
            OutputFormat::Pretty => {
                self.line(format!("  {} {}", style("★").green(), display_path(&keep)));
                for outcome in &outcomes {
                    match &outcome.result {
                        Ok(record) => self.line(format!(
                            "  {} {}  [{}]",
                            style("→").cyan(),
                            display_path(&outcome.path),
                            style(record.id).dim()
                        )),
                        Err(e) => self.line(format!("  {} {}", style("✗").red(), e)),
                    }
                }
                self.line("");
                self.line(format!(
                    "{}",
                    style("Staged files can be reverted until you commit them.").dim()
                ));
            }
        }
        Ok(())
    }

    fn run_revert(&self, id: Option<&str>, all: bool) -> Result<()> {
        let manager = self.manager()?;

        if !all {
            let record = find_record(&manager, id.unwrap_or_default())?;
            manager.revert(&record)?;
            self.report_restored(&record);
            return Ok(());
        }

        // Conflicts are reported and the remaining records still reverted
        for record in manager.records()? {
            match manager.revert(&record) {
                Ok(()) => self.report_restored(&record),
                Err(e) => self.line(format!("{} {}", style("✗").red(), e)),
            }
        }
        Ok(())
    }

    fn report_restored(&self, record: &StageRecord) {
        if self.pretty() {
            self.line(format!(
                "{} Restored {}",
                style("✓").green().bold(),
                display_path(&record.original_path)
            ));
        } else {
            println!("{}", record.original_path.display());
        }
    }

    fn run_commit(&self, id: &str, yes: bool) -> Result<()> {
        let manager = self.manager()?;
        let record = find_record(&manager, id)?;

        if !yes {
            return Err(SiftError::Config(format!(
                "refusing to delete {} without --yes",
                record.staged_path.display()
            )));
        }

        manager.commit_delete(&record)?;
        if self.pretty() {
            self.line(format!(
                "{} Permanently deleted {}",
                style("✓").yellow().bold(),
                display_path(&record.staged_path)
            ));
        }
        Ok(())
    }

    fn run_forget(&self, id: &str) -> Result<()> {
        let manager = self.manager()?;
        let record = find_record(&manager, id)?;
        manager.forget(&record)?;
        if self.pretty() {
            self.line(format!(
                "Forgot record for {} (no files were touched)",
                display_path(&record.original_path)
            ));
        }
        Ok(())
    }

    fn run_staged(&self) -> Result<()> {
        let manager = self.manager()?;
        let records = manager.records()?;

        match self.output {
            OutputFormat::Json => print_json(&records)?,
            OutputFormat::Minimal => {
                for record in &records {
                    println!("{}\t{}", record.id, record.staged_path.display());
                }
            }
            OutputFormat::Pretty => {
                let summary = ReviewSummary::from_records(&records);
                self.line(format!(
                    "{} files in {} ({})",
                    style(summary.files).cyan(),
                    display_path(manager.review_dir()),
                    format_bytes(summary.total_bytes)
                ));
                for record in &records {
                    let missing = if record.staged_path.exists() {
                        String::new()
                    } else {
                        style(" (missing)").red().to_string()
                    };
                    self.line(format!(
                        "  {}  {} <- {}{}",
                        style(record.id.to_string()).dim(),
                        display_path(&record.staged_path),
                        display_path(&record.original_path),
                        missing
                    ));
                }
            }
        }
        Ok(())
    }

    fn run_organize(&self, args: &ScanArgs, into: &Path, by_day: bool, apply: bool) -> Result<()> {
        let mut config = self.config_for(args);
        if by_day {
            config.structure = FolderStructure::YearMonthDay;
        }

        let plan = OrganizePlanner::new(config.organize_config()).plan(&args.paths, into)?;

        if !apply {
            match self.output {
                OutputFormat::Json => print_json(&plan)?,
                OutputFormat::Minimal => {
                    for file in plan.moves() {
                        println!("{}\t{}", file.source.display(), file.destination.display());
                    }
                }
                OutputFormat::Pretty => self.print_plan(&plan),
            }
            return Ok(());
        }

        let (sender, receiver) = EventChannel::new();
        let progress = spawn_progress(receiver, self.pretty());
        let executor = OrganizeExecutor::new().with_events(sender);
        let report = executor.apply(&plan);
        drop(executor);
        progress.join().ok();
        let report = report?;

        match self.output {
            OutputFormat::Json => print_json(&report)?,
            OutputFormat::Minimal => {
                for result in &report.results {
                    if let FileOutcome::Moved { destination } = &result.outcome {
                        println!("{}", destination.display());
                    }
                }
            }
            OutputFormat::Pretty => self.print_report(&report),
        }
        Ok(())
    }

    fn header(&self) {
        self.line(format!(
            "{} {}",
            style("Photo Sifter").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ));
        self.line("");
    }

    fn print_scan(&self, result: &ScanResult) {
        self.line("");
        self.line(format!("{} Scan Complete", style("✓").green().bold()));
        self.line("");
        self.line(format!(
            "  {} files examined in {:.1}s",
            style(result.files_examined).cyan(),
            result.duration_ms as f64 / 1000.0
        ));
        self.line(format!(
            "  {} duplicate sets found",
            style(result.groups.len()).cyan()
        ));
        self.line(format!(
            "  {} potential space savings",
            style(format_bytes(result.reclaimable_bytes())).yellow()
        ));
        if result.ceiling_skipped > 0 {
            self.line(format!(
                "  {} files not examined: ceiling reached",
                style(result.ceiling_skipped).yellow()
            ));
        }
        let other_skips = result.skipped.len() - result.ceiling_skipped.min(result.skipped.len());
        if other_skips > 0 {
            self.line(format!("  {} entries skipped", style(other_skips).dim()));
        }
        if result.cancelled {
            self.line(format!("  {}", style("Scan was cancelled; results are partial").red()));
        }
        self.line("");

        if result.groups.is_empty() {
            self.line(format!("  {} No duplicates found!", style("🎉").green()));
        } else {
            self.line(format!("{}", style("Duplicate Sets:").bold().underlined()));
            self.line("");
            for (i, group) in result.groups.iter().enumerate() {
                self.line(format!(
                    "  {} {} ({} files, {} each)",
                    style(format!("Set {}:", i + 1)).bold(),
                    style(group.fingerprint().short(12)).yellow(),
                    group.len(),
                    format_bytes(group.size())
                ));
                for path in group.paths() {
                    self.line(format!("    {} {}", style("○").dim(), display_path(path)));
                }
                self.line("");
            }
        }

        self.line(format!(
            "{}",
            style("No files were moved or deleted. Choose a keeper with `photosift resolve`.").dim()
        ));
    }

    fn print_plan(&self, plan: &OrganizePlan) {
        let summary = &plan.summary;
        self.line(format!(
            "{} Organize plan for {}",
            style("•").cyan().bold(),
            display_path(&plan.destination_root)
        ));
        self.line(format!(
            "  {} to move, {} already in place, {} duplicates left alone, {} renamed",
            style(summary.to_move).cyan(),
            summary.already_in_place,
            summary.duplicates,
            summary.collisions
        ));
        if summary.no_capture_date > 0 {
            self.line(format!(
                "  {} files dated by modification time",
                style(summary.no_capture_date).yellow()
            ));
        }
        for year in &summary.by_year {
            self.line(format!(
                "    {}: {} files, {}",
                year.year,
                year.count,
                format_bytes(year.size_bytes)
            ));
        }
        self.line("");
        for file in &plan.files {
            let marker = match &file.action {
                PlannedAction::Move if file.collision.is_some() => style("→").yellow(),
                PlannedAction::Move => style("→").cyan(),
                PlannedAction::AlreadyInPlace => style("=").dim(),
                PlannedAction::SkipDuplicate { .. } => style("≡").magenta(),
            };
            self.line(format!(
                "  {} {} {}",
                marker,
                display_path(&file.source),
                display_path(&file.destination)
            ));
        }
        self.line("");
        self.line(format!(
            "{}",
            style("Dry run. Re-run with --apply to move files.").dim()
        ));
    }

    fn print_report(&self, report: &OrganizeReport) {
        self.line(format!(
            "{} {} moved, {} already in place, {} duplicates, {} failed",
            style("✓").green().bold(),
            style(report.moved).cyan(),
            report.already_in_place,
            report.duplicates,
            report.failed
        ));
        for failure in report.failures() {
            if let FileOutcome::Failed { message } = &failure.outcome {
                self.line(format!("  {} {}", style("✗").red(), message));
            }
        }
        if report.cancelled {
            self.line(format!("  {}", style("Cancelled before every file was moved").red()));
        }
    }
}

/// Serializable view of a staging outcome
#[derive(Serialize)]
struct OutcomeView<'a> {
    path: &'a Path,
    record: Option<&'a StageRecord>,
    error: Option<String>,
}

impl<'a> From<&'a StageOutcome> for OutcomeView<'a> {
    fn from(outcome: &'a StageOutcome) -> Self {
        Self {
            path: &outcome.path,
            record: outcome.result.as_ref().ok(),
            error: outcome.result.as_ref().err().map(ToString::to_string),
        }
    }
}

fn find_record(manager: &StageManager, id: &str) -> Result<StageRecord> {
    let id = id.trim().to_lowercase();
    let mut matches: Vec<StageRecord> = manager
        .records()?
        .into_iter()
        .filter(|r| r.id.to_string().starts_with(&id))
        .collect();

    match matches.len() {
        1 => Ok(matches.remove(0)),
        0 => Err(SiftError::Config(format!("no staged file with id {}", id))),
        n => Err(SiftError::Config(format!("id {} matches {} records", id, n))),
    }
}

fn spawn_progress(receiver: EventReceiver, enabled: bool) -> JoinHandle<()> {
    thread::spawn(move || {
        let progress = enabled.then(|| {
            let pb = ProgressBar::new(0);
            if let Ok(style) =
                ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("█▓░"));
            }
            pb
        });

        for event in receiver.iter() {
            let Some(pb) = &progress else { continue };
            match &event {
                Event::Scan(ScanEvent::Progress(p)) => {
                    pb.set_message(format!("{} files found", p.files_found));
                }
                Event::Hash(HashEvent::Started { total_files, .. }) => {
                    pb.set_length(*total_files as u64);
                    pb.set_message(event.label());
                }
                Event::Hash(HashEvent::Progress(p)) => pb.set_position(p.completed as u64),
                Event::Organize(OrganizeEvent::Started { total_files }) => {
                    pb.set_length(*total_files as u64);
                    pb.set_message(event.label());
                }
                Event::Organize(OrganizeEvent::Progress { completed, .. }) => {
                    pb.set_position(*completed as u64)
                }
                Event::Hash(HashEvent::Completed { .. })
                | Event::Organize(OrganizeEvent::Completed { .. }) => pb.finish_and_clear(),
                _ => {}
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn display_path(path: &Path) -> String {
    match dirs::home_dir() {
        Some(home) => match path.strip_prefix(&home) {
            Ok(rest) => format!("~/{}", rest.display()),
            Err(_) => path.display().to_string(),
        },
        None => path.display().to_string(),
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
