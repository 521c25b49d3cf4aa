//! dcp - Deduplicating Copy
//!
//! Merge a directory tree into a destination, copying each distinct file
//! content once. Powered by dedupcopy.

mod logging;

use clap::{Parser, ValueEnum};
use dedupcopy::{
    DedupOptions, DedupStats, Error as DedupError, ErrorCode, PlanReport, ProgressHandler,
    ScanMode, create_progress_bar, dedup_execute, dedup_plan,
};
use indicatif::ProgressBar;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// dcp - Deduplicating directory copy
///
/// Copy every file below SOURCE into the top level of DESTINATION, skipping
/// any file whose content is already there or was already copied in this
/// run. Existing files are never overwritten: a taken name becomes
/// name_1.ext, name_2.ext, ...
///
/// Symlinks and special files in SOURCE are skipped.
#[derive(Parser, Debug)]
#[command(name = "dcp", version, about, long_about = None)]
struct Args {
    /// Directory to copy from (walked recursively)
    source: PathBuf,

    /// Directory to copy into (created if missing)
    destination: PathBuf,

    /// Number of parallel workers for scanning, hashing and copying
    #[arg(short = 'j', long, default_value = "16")]
    jobs: usize,

    /// Profile-driven defaults
    #[arg(long, value_enum, default_value = "modern")]
    profile: ProfileName,

    /// Do not preserve file timestamps
    #[arg(long)]
    no_times: bool,

    /// Do not preserve file permissions
    #[arg(long)]
    no_perms: bool,

    /// Do not call fsync after each file (faster but less safe)
    #[arg(long)]
    no_sync: bool,

    /// Check for duplicates in the whole destination tree, not just its top level
    #[arg(long)]
    recursive_destination: bool,

    /// Print what would be copied without actually copying
    #[arg(short = 'n', long = "plan", alias = "dry-run")]
    plan: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    output: OutputMode,

    /// Disable the progress bar
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Verbose output (per-file decisions, debug logging)
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProfileName {
    /// Durable copies with all attributes
    Modern,
    /// No fsync, no attributes
    Fast,
}

impl ProfileName {
    fn as_str(self) -> &'static str {
        match self {
            Self::Modern => "modern",
            Self::Fast => "fast",
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ProfileDefaults {
    preserve_timestamps: bool,
    preserve_permissions: bool,
    fsync: bool,
}

fn profile_defaults(profile: ProfileName) -> ProfileDefaults {
    match profile {
        ProfileName::Modern => ProfileDefaults {
            preserve_timestamps: true,
            preserve_permissions: true,
            fsync: true,
        },
        ProfileName::Fast => ProfileDefaults {
            preserve_timestamps: false,
            preserve_permissions: false,
            fsync: false,
        },
    }
}

type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
enum CliError {
    #[error("{source}")]
    Run { source: DedupError },

    #[error("Failed to serialize JSON output: {source}")]
    JsonSerialize { source: serde_json::Error },
}

impl CliError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::Run { source } => source.code(),
            Self::JsonSerialize { .. } => ErrorCode::Internal,
        }
    }
}

#[derive(Debug, Clone)]
struct EffectiveConfig {
    profile: ProfileName,
    jobs: usize,
    preserve_timestamps: bool,
    preserve_permissions: bool,
    fsync: bool,
    destination_scan: ScanMode,
    output_mode: OutputMode,
}

impl EffectiveConfig {
    fn destination_scan_str(&self) -> &'static str {
        match self.destination_scan {
            ScanMode::Recursive => "recursive",
            ScanMode::TopLevel => "top_level",
        }
    }

    fn to_json_value(&self) -> Value {
        json!({
            "profile": self.profile.as_str(),
            "jobs": self.jobs,
            "preserve_timestamps": self.preserve_timestamps,
            "preserve_permissions": self.preserve_permissions,
            "fsync": self.fsync,
            "destination_scan": self.destination_scan_str(),
            "output_mode": self.output_mode.as_str(),
        })
    }

    fn print_human_stderr(&self) {
        eprintln!("Effective configuration:");
        eprintln!("  profile: {}", self.profile.as_str());
        eprintln!("  jobs: {}", self.jobs);
        eprintln!("  preserve_timestamps: {}", self.preserve_timestamps);
        eprintln!("  preserve_permissions: {}", self.preserve_permissions);
        eprintln!("  fsync: {}", self.fsync);
        eprintln!("  destination_scan: {}", self.destination_scan_str());
        eprintln!("  output_mode: {}", self.output_mode.as_str());
    }
}

fn exit_code_for(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::InvalidInput | ErrorCode::SourceNotFound => 2,
        _ => 1,
    }
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error[{}]: {}", error.code(), error);
        std::process::exit(exit_code_for(error.code()));
    }
}

fn run() -> CliResult<()> {
    let args = Args::parse();
    logging::init_logger(args.verbose);

    let (mut options, effective_config) = build_options_and_effective_config(&args);

    if effective_config.output_mode == OutputMode::Human && args.verbose {
        effective_config.print_human_stderr();
    }
    tracing::debug!(config = ?effective_config, "starting run");

    // Per-file debug lines would tear through the bar
    let pb = if effective_config.output_mode == OutputMode::Human && !args.quiet && !args.verbose
    {
        Some(create_bar())
    } else {
        None
    };
    if let Some(pb) = &pb {
        options = options.with_progress_handler(ProgressHandler::for_bar(pb.clone()));
    }

    set_phase(&pb, format!("Scanning {}...", args.source.display()));
    let plan_result = dedup_plan(&args.source, &args.destination, &options);
    let report = match plan_result {
        Ok(report) => report,
        Err(source) => {
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }
            return Err(CliError::Run { source });
        }
    };

    if args.plan {
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        return emit_plan_output(&effective_config, &report);
    }

    let stats = dedup_execute(&report, &options);

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    match effective_config.output_mode {
        OutputMode::Human => {
            print_stats(&stats, args.verbose);
            Ok(())
        }
        OutputMode::Json => {
            let payload = json!({
                "schema_version": "1.0",
                "mode": "execute",
                "effective_config": effective_config.to_json_value(),
                "source": display_path(&report.source_root),
                "destination": display_path(&report.destination_root),
                "stats": stats_json(&stats)?,
            });
            print_json_value(&payload)
        }
    }
}

fn build_options_and_effective_config(args: &Args) -> (DedupOptions, EffectiveConfig) {
    let defaults = profile_defaults(args.profile);

    let mut preserve_timestamps = defaults.preserve_timestamps;
    if args.no_times {
        preserve_timestamps = false;
    }

    let mut preserve_permissions = defaults.preserve_permissions;
    if args.no_perms {
        preserve_permissions = false;
    }

    let mut fsync = defaults.fsync;
    if args.no_sync {
        fsync = false;
    }

    let destination_scan = if args.recursive_destination {
        ScanMode::Recursive
    } else {
        ScanMode::TopLevel
    };

    let mut options = DedupOptions::default()
        .with_parallel(args.jobs)
        .with_destination_scan(destination_scan);
    if !preserve_timestamps {
        options = options.without_timestamps();
    }
    if !preserve_permissions {
        options = options.without_permissions();
    }
    if !fsync {
        options = options.without_fsync();
    }

    let effective_config = EffectiveConfig {
        profile: args.profile,
        jobs: options.parallel,
        preserve_timestamps,
        preserve_permissions,
        fsync,
        destination_scan,
        output_mode: args.output,
    };

    (options, effective_config)
}

/// Length and position are driven by the library's progress handler
fn create_bar() -> ProgressBar {
    let pb = create_progress_bar(0);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn set_phase(pb: &Option<ProgressBar>, message: String) {
    if let Some(pb) = pb {
        pb.set_message(message);
    }
}

fn emit_plan_output(effective_config: &EffectiveConfig, report: &PlanReport) -> CliResult<()> {
    let plan = &report.plan;
    match effective_config.output_mode {
        OutputMode::Human => {
            println!(
                "Plan ({} files, {}):",
                plan.tasks.len(),
                format_bytes(plan.total_bytes())
            );
            for task in &plan.tasks {
                println!(
                    "  copy {} -> {}",
                    task.source.display(),
                    task.destination.display()
                );
            }
            println!(
                "Skipping {} duplicates, {} symlinks, {} non-regular files",
                report.stats.duplicates_skipped,
                report.stats.symlinks_skipped,
                report.stats.non_regular_skipped
            );
            Ok(())
        }
        OutputMode::Json => {
            let items: Vec<Value> = plan
                .tasks
                .iter()
                .map(|task| {
                    json!({
                        "source": display_path(&task.source),
                        "destination": display_path(&task.destination),
                        "size": task.size,
                        "action": "copy",
                    })
                })
                .collect();
            let payload = json!({
                "schema_version": "1.0",
                "mode": "plan",
                "effective_config": effective_config.to_json_value(),
                "source": display_path(&report.source_root),
                "destination": display_path(&report.destination_root),
                "items": items,
                "stats": stats_json(&report.stats)?,
            });
            print_json_value(&payload)
        }
    }
}

fn print_stats(stats: &DedupStats, verbose: bool) {
    println!(
        "Scanned {} source files, {} destination files",
        stats.source_files, stats.destination_files
    );

    if stats.files_copied == 0 {
        println!("Nothing to copy");
    } else {
        println!(
            "Copied {} files ({})",
            stats.files_copied,
            format_bytes(stats.bytes_copied)
        );
    }

    println!(
        "Skipped {} duplicates, {} symlinks, {} non-regular files",
        stats.duplicates_skipped, stats.symlinks_skipped, stats.non_regular_skipped
    );

    if stats.has_failures() {
        println!(
            "Failed: {} unreadable, {} unhashable, {} copy errors",
            stats.unreadable, stats.hash_failures, stats.copy_failures
        );
    }

    if verbose {
        let plan = &stats.plan;
        println!("Completed in {:?}", stats.duration);
        println!("  Unique size:        {}", plan.unique_size);
        println!("  Unique content:     {}", plan.hashed_unique);
        println!("  Dup of destination: {}", plan.duplicates_of_destination);
        println!("  Dup within source:  {}", plan.duplicates_within_source);
        println!(
            "  Partial matches:    {} ({} false positives)",
            plan.probable_duplicates, plan.partial_false_positives
        );
        println!(
            "  Hashes computed:    {} partial, {} full",
            plan.partial_hashes, plan.full_hashes
        );

        if stats.duration.as_secs_f64() > 0.0 {
            let speed = stats.bytes_copied as f64 / stats.duration.as_secs_f64();
            println!("  Speed:              {}/s", format_bytes(speed as u64));
        }
    }
}

fn stats_json(stats: &DedupStats) -> CliResult<Value> {
    serde_json::to_value(stats).map_err(|source| CliError::JsonSerialize { source })
}

fn print_json_value(value: &Value) -> CliResult<()> {
    let serialized =
        serde_json::to_string(value).map_err(|source| CliError::JsonSerialize { source })?;
    println!("{serialized}");
    Ok(())
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
