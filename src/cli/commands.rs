//! Command implementations for the EDI CLI
//!
//! This module contains the command execution logic, progress reporting and
//! terminal output for the CLI interface.

use crate::cli::args::{Args, Commands, InspectArgs, RewriteArgs, ScanArgs};
use crate::document::Edi;
use crate::position::decimal_degrees_to_dms;
use anyhow::{Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Main command runner
pub fn run(args: Args) -> Result<()> {
    setup_logging(&args);
    debug!("Command line arguments: {:?}", args);

    match &args.command {
        Some(Commands::Inspect(inspect)) => run_inspect(inspect),
        Some(Commands::Rewrite(rewrite)) => run_rewrite(rewrite),
        Some(Commands::Scan(scan)) => run_scan(scan),
        None => Ok(()),
    }
}

/// Set up structured logging based on CLI arguments
fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mt_edi={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    debug!("Logging initialized at level: {}", log_level);
}

fn run_inspect(args: &InspectArgs) -> Result<()> {
    let edi = Edi::open(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    println!("{}", args.file.display().to_string().bright_green().bold());
    print_station(&edi);
    print_frequencies(&edi);
    print_channels(&edi);
    Ok(())
}

fn print_station(edi: &Edi) {
    println!(
        "  {} {}",
        "Station:".bright_cyan(),
        edi.station().unwrap_or("<unnamed>").bright_white().bold()
    );
    for (label, value) in [("Latitude:", edi.latitude()), ("Longitude:", edi.longitude())] {
        match value {
            Some(v) => println!(
                "  {} {:.6} ({})",
                label.bright_cyan(),
                v,
                decimal_degrees_to_dms(v)
            ),
            None => println!("  {} {}", label.bright_cyan(), "unset".yellow()),
        }
    }
    match edi.elevation() {
        Some(elev) => println!("  {} {:.1} m", "Elevation:".bright_cyan(), elev),
        None => println!("  {} {}", "Elevation:".bright_cyan(), "unset".yellow()),
    }
    let dialect = if edi.header.is_phoenix() {
        "Phoenix"
    } else {
        "standard"
    };
    println!("  {} {}", "Dialect:".bright_cyan(), dialect);
    println!("  {} {}", "Data type:".bright_cyan(), edi.data_sect.data_type);
}

fn print_frequencies(edi: &Edi) {
    let freq = edi.frequencies();
    let (min, max) = freq
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &f| {
            (lo.min(f), hi.max(f))
        });

    if freq.is_empty() {
        println!("  {} {}", "Frequencies:".bright_cyan(), "none".yellow());
    } else {
        println!(
            "  {} {} ({:.4e} to {:.4e} Hz)",
            "Frequencies:".bright_cyan(),
            freq.len().to_string().bright_white().bold(),
            min,
            max
        );
    }

    let tipper = if edi.has_tipper() {
        "present".bright_green()
    } else {
        "absent".yellow()
    };
    println!("  {} {}", "Tipper:".bright_cyan(), tipper);
}

fn print_channels(edi: &Edi) {
    let channels = &edi.define_measurement.channels;
    println!(
        "  {} {}",
        "Channels:".bright_cyan(),
        channels.len().to_string().bright_white().bold()
    );
    for (key, channel) in channels {
        println!(
            "    {:<8} {:<4} id={}",
            key,
            channel.chtype(),
            channel.id()
        );
    }
}

fn run_rewrite(args: &RewriteArgs) -> Result<()> {
    args.validate()?;
    let config = args.to_config()?;

    let edi = Edi::open_with_config(&args.file, config)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let written = edi
        .save(args.output.as_deref())
        .with_context(|| format!("Failed to write {}", args.file.display()))?;

    println!(
        "{} {} -> {}",
        "Rewrote".bright_green(),
        args.file.display(),
        written.display().to_string().bright_white().bold()
    );
    Ok(())
}

/// Outcome of reading one file during a scan
enum ScanOutcome {
    Read(String),
    Failed(String),
}

fn run_scan(args: &ScanArgs) -> Result<()> {
    let start_time = Instant::now();
    args.validate()?;

    let files = discover_edi_files(&args.dir, args.recursive);
    info!("Found {} EDI files under {}", files.len(), args.dir.display());
    if files.is_empty() {
        println!("{}", "No EDI files found".yellow());
        return Ok(());
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut outcomes = Vec::with_capacity(files.len());
    for path in &files {
        pb.set_message(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        let outcome = match Edi::open(path) {
            Ok(edi) => ScanOutcome::Read(summary_line(path, &edi)),
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                ScanOutcome::Failed(format!("{}: {}", path.display(), e))
            }
        };
        outcomes.push(outcome);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let mut failures = 0;
    for outcome in &outcomes {
        match outcome {
            ScanOutcome::Read(line) => println!("  {}", line),
            ScanOutcome::Failed(message) => {
                failures += 1;
                println!("  {} {}", "FAILED".bright_red().bold(), message);
            }
        }
    }

    println!(
        "\n{} {} files in {:.2?}, {} failed",
        "Scanned".bright_green(),
        files.len().to_string().bright_white().bold(),
        start_time.elapsed(),
        if failures > 0 {
            failures.to_string().bright_red().bold()
        } else {
            failures.to_string().bright_white().bold()
        }
    );
    Ok(())
}

/// Collect `.edi` files in name order
fn discover_edi_files(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let walker = if recursive {
        WalkDir::new(dir)
    } else {
        WalkDir::new(dir).max_depth(1)
    };

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("edi"))
                {
                    files.push(path.to_path_buf());
                }
            }
            Err(e) => {
                warn!("Error walking directory {}: {}", dir.display(), e);
            }
        }
    }
    files.sort();
    files
}

fn summary_line(path: &Path, edi: &Edi) -> String {
    let position = match (edi.latitude(), edi.longitude()) {
        (Some(lat), Some(lon)) => format!("{:.5}, {:.5}", lat, lon),
        _ => "no position".to_string(),
    };
    format!(
        "{} station={} ({}) nfreq={} tipper={}",
        path.display(),
        edi.station().unwrap_or("<unnamed>"),
        position,
        edi.z.len(),
        if edi.has_tipper() { "yes" } else { "no" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discover_edi_files_depth() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("line1");
        fs::create_dir(&nested).unwrap();
        fs::write(temp_dir.path().join("b.edi"), "").unwrap();
        fs::write(temp_dir.path().join("a.EDI"), "").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "").unwrap();
        fs::write(nested.join("c.edi"), "").unwrap();

        let flat = discover_edi_files(temp_dir.path(), false);
        assert_eq!(
            flat,
            vec![temp_dir.path().join("a.EDI"), temp_dir.path().join("b.edi")]
        );

        let deep = discover_edi_files(temp_dir.path(), true);
        assert_eq!(deep.len(), 3);
    }
}
