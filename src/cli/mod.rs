//! # CLI Module
//!
//! Command-line interface for the HDR bracket merger.
//!
//! ## Usage
//! ```bash
//! # Merge every bracket in a card dump
//! photo-hdr ~/Pictures/2023-10-04
//!
//! # Keep HDRs from a previous run, show what would happen
//! photo-hdr ~/Pictures/2023-10-04 --onconflict skip --dry-run
//!
//! # Canon RAW files, two brackets at a time, JSON report
//! photo-hdr ~/Pictures/2023-10-04 --extension cr2 --workers 2 --output json
//! ```

use clap::{Parser, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_hdr::core::conflict::ConflictPolicy;
use photo_hdr::core::workflow::{BracketOutcome, CancellationToken, HdrWorkflow, RunReport};
use photo_hdr::error::Result;
use photo_hdr::events::{BracketEvent, Event, EventChannel, PipelineEvent};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use tokio::signal;

/// Photo HDR - Merge exposure brackets into HDR images
#[derive(Parser, Debug)]
#[command(name = "photo-hdr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the RAW photos
    path: PathBuf,

    /// RAW file extension to look for
    #[arg(short, long, default_value = "arw")]
    extension: String,

    /// What to do when an output file already exists
    #[arg(long, default_value = "overwrite")]
    onconflict: OnConflict,

    /// Log the commands and file changes without performing them
    #[arg(long)]
    dry_run: bool,

    /// Brackets processed at the same time
    #[arg(short, long, default_value = "1")]
    workers: usize,

    /// Fewest exposures that make a bracket
    #[arg(long, default_value = "2")]
    min_stack_size: usize,

    /// Include hidden files
    #[arg(long)]
    include_hidden: bool,

    /// Output format
    #[arg(short, long, default_value = "pretty")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OnConflict {
    /// Replace the existing file
    Overwrite,
    /// Write next to it as name_01, name_02, ...
    Rename,
    /// Keep the existing file and move on
    Skip,
    /// Give up on that bracket
    Fail,
}

impl From<OnConflict> for ConflictPolicy {
    fn from(value: OnConflict) -> Self {
        match value {
            OnConflict::Overwrite => ConflictPolicy::Overwrite,
            OnConflict::Rename => ConflictPolicy::Rename,
            OnConflict::Skip => ConflictPolicy::Skip,
            OnConflict::Fail => ConflictPolicy::Fail,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (HDR paths only)
    Minimal,
}

/// Run the CLI. Success means at least one HDR exists for the run.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    photo_hdr::init_tracing(cli.verbose);

    let term = Term::stderr();
    if matches!(cli.output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Photo HDR").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        if cli.dry_run {
            term.write_line(&format!("{}", style("Dry run: nothing will be written").yellow()))
                .ok();
        }
        term.write_line("").ok();
    }

    let workflow = HdrWorkflow::builder()
        .base_path(&cli.path)
        .raw_extension(cli.extension.clone())
        .policy(cli.onconflict.into())
        .dry_run(cli.dry_run)
        .workers(cli.workers)
        .min_stack_size(cli.min_stack_size)
        .include_hidden(cli.include_hidden)
        .build()?;
    listen_for_interrupts(workflow.cancellation_token());

    let (sender, receiver) = EventChannel::new();

    let progress = if matches!(cli.output, OutputFormat::Pretty) {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let verbose = cli.verbose;

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_message(format!("{}", phase));
                }
                Event::Bracket(BracketEvent::Detected { total_brackets, .. }) => {
                    pb.set_length(total_brackets as u64);
                }
                Event::Bracket(BracketEvent::StageChanged { index, stage }) => {
                    if verbose {
                        pb.set_message(format!("Bracket {}: {}", index, stage));
                    }
                }
                Event::Bracket(
                    BracketEvent::Completed { .. }
                    | BracketEvent::Skipped { .. }
                    | BracketEvent::Failed { .. },
                ) => pb.inc(1),
                Event::Pipeline(PipelineEvent::Completed { .. }) => pb.finish_and_clear(),
                _ => {}
            }
        }
    });

    let result = workflow.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let report = result?;
    match cli.output {
        OutputFormat::Pretty => print_pretty_results(&term, &report, cli.verbose),
        OutputFormat::Json => print_json_results(&report),
        OutputFormat::Minimal => print_minimal_results(&report),
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_pretty_results(term: &Term, report: &RunReport, verbose: bool) {
    let headline = if report.is_success() {
        style("✓").green().bold()
    } else {
        style("✗").red().bold()
    };
    term.write_line(&format!("{} Run Complete", headline)).ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} photos scanned in {:.1}s",
        style(report.photos_scanned).cyan(),
        report.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} HDRs produced from {} brackets attempted ({} found)",
        style(report.hdrs.len()).cyan(),
        style(report.attempted()).cyan(),
        report.brackets_found
    ))
    .ok();
    if report.existing() > 0 {
        term.write_line(&format!(
            "  {} kept from an earlier run",
            style(report.existing()).dim()
        ))
        .ok();
    }
    if report.cancelled {
        term.write_line(&format!("  {}", style("Run was cancelled").yellow()))
            .ok();
    }
    term.write_line("").ok();

    if report.brackets.is_empty() {
        term.write_line(&format!("  {}", style("No brackets found.").yellow()))
            .ok();
    }

    for bracket in &report.brackets {
        let (marker, detail) = match &bracket.outcome {
            BracketOutcome::Created(hdr) => (style("★").green(), display_path(hdr.path())),
            BracketOutcome::Existing(hdr) => (style("○").dim(), display_path(hdr.path())),
            BracketOutcome::Failed { reason } => (style("✗").red(), reason.clone()),
        };
        term.write_line(&format!(
            "  {} {} {}",
            marker,
            style(format!(
                "Bracket {} ({} × {}):",
                bracket.index, bracket.size, bracket.first
            ))
            .bold(),
            detail
        ))
        .ok();

        if verbose && !bracket.cleanup.deleted.is_empty() {
            term.write_line(&format!(
                "    {}",
                style(format!(
                    "{} intermediate files removed",
                    bracket.cleanup.deleted.len()
                ))
                .dim()
            ))
            .ok();
        }
    }

    let violations: Vec<_> = report.cleanup_violations().collect();
    if !violations.is_empty() {
        term.write_line("").ok();
        term.write_line(&format!(
            "{}",
            style("Files left in place because they did not look like intermediates:")
                .red()
                .bold()
        ))
        .ok();
        for violation in violations {
            term.write_line(&format!("    {}", violation)).ok();
        }
    }

    for dir in &report.kept_dirs {
        term.write_line(&format!(
            "  {} {}",
            style("Working folder not empty:").yellow(),
            display_path(dir)
        ))
        .ok();
    }

    for error in &report.scan_errors {
        term.write_line(&format!("  {} {}", style("!").yellow(), error))
            .ok();
    }
}

fn print_json_results(report: &RunReport) {
    let output = serde_json::json!({
        "success": report.is_success(),
        "summary": report.summary(),
        "cancelled": report.cancelled,
        "hdrs": report.hdrs.iter().map(|p| p.path()).collect::<Vec<_>>(),
        "brackets": report.brackets.iter().map(|b| {
            let (status, detail) = match &b.outcome {
                BracketOutcome::Created(hdr) => ("created", hdr.path().display().to_string()),
                BracketOutcome::Existing(hdr) => ("existing", hdr.path().display().to_string()),
                BracketOutcome::Failed { reason } => ("failed", reason.clone()),
            };
            serde_json::json!({
                "index": b.index,
                "size": b.size,
                "first": b.first,
                "status": status,
                "detail": detail,
                "intermediates_removed": b.cleanup.deleted.len(),
            })
        }).collect::<Vec<_>>(),
        "cleanup_violations": report
            .cleanup_violations()
            .map(|v| v.to_string())
            .collect::<Vec<_>>(),
        "kept_dirs": report.kept_dirs,
        "scan_errors": report.scan_errors,
    });

    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!(error = %e, "Could not serialize report"),
    }
}

fn print_minimal_results(report: &RunReport) {
    for hdr in &report.hdrs {
        println!("{}", hdr.path().display());
    }
}

/// First Ctrl+C stops new brackets from starting and lets running ones
/// clean up; a second one exits immediately.
fn listen_for_interrupts(token: CancellationToken) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::warn!(error = %e, "Could not listen for Ctrl+C");
            return;
        }
    };

    thread::spawn(move || {
        runtime.block_on(async {
            if !cancel_on_interrupt(&token, shutdown_signal()).await {
                return;
            }
            if shutdown_signal().await {
                tracing::error!("Interrupted again, exiting without cleanup");
                std::process::exit(130);
            }
        })
    });
}

/// Cancel `token` once `interrupt` fires. False when no signal could be awaited.
async fn cancel_on_interrupt(
    token: &CancellationToken,
    interrupt: impl Future<Output = bool>,
) -> bool {
    if !interrupt.await {
        return false;
    }
    tracing::warn!("Interrupted, finishing the brackets already running (Ctrl+C again to abort)");
    token.cancel();
    true
}

/// Resolves on Ctrl+C or SIGTERM; false if the handler could not be installed
async fn shutdown_signal() -> bool {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = ctrl_c => result.is_ok(),
        _ = terminate => true,
    }
}

/// Shorten paths under the home directory to `~/...`
fn display_path(path: &Path) -> String {
    match dirs::home_dir().and_then(|home| path.strip_prefix(home).ok().map(Path::to_path_buf)) {
        Some(relative) => format!("~/{}", relative.display()),
        None => path.display().to_string(),
    }
}
