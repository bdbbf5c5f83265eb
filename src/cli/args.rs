//! Command-line argument definitions for the EDI tool
//!
//! This module defines the CLI interface using the clap derive API.

use crate::config::EdiConfig;
use crate::{Error, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the EDI reader and writer
///
/// Reads magnetotelluric EDI files, reports their contents and writes them
/// back out in canonical form.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mt-edi",
    version,
    about = "Inspect, rewrite and scan magnetotelluric EDI files",
    long_about = "Reads EDI (Electrical Data Interchange) transfer-function files, \
                  reports station, position and frequency content, and rewrites them \
                  with canonical section order and fixed-width numeric blocks."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: debug, -vv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    ///
    /// Only show warnings and errors. Overrides verbose settings.
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Suppress output except warnings and errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Print the contents of one EDI file
    Inspect(InspectArgs),
    /// Read an EDI file and write it back out
    Rewrite(RewriteArgs),
    /// Read every EDI file under a directory and summarise each
    Scan(ScanArgs),
}

/// Arguments for the inspect command
#[derive(Debug, Clone, Parser)]
pub struct InspectArgs {
    /// EDI file to read
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Arguments for the rewrite command
#[derive(Debug, Clone, Parser)]
pub struct RewriteArgs {
    /// EDI file to read
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Output path
    ///
    /// If not specified, the file is written beside the input with a
    /// numeric suffix so the original is never overwritten.
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        help = "Output path (default: unique name beside the input)"
    )]
    pub output: Option<PathBuf>,

    /// Values per line in numeric blocks
    #[arg(long = "block-len", value_name = "N", help = "Values per line in numeric blocks")]
    pub block_len: Option<usize>,

    /// Digits after the decimal point in numeric blocks
    #[arg(
        long = "precision",
        value_name = "P",
        help = "Mantissa digits in numeric blocks"
    )]
    pub precision: Option<usize>,

    /// JSON file with output settings
    ///
    /// Keys left out of the file keep their defaults. `--block-len` and
    /// `--precision` override values read from the file.
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "JSON file with output settings"
    )]
    pub config: Option<PathBuf>,
}

/// Arguments for the scan command
#[derive(Debug, Clone, Parser)]
pub struct ScanArgs {
    /// Directory to search for `.edi` files
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Descend into subdirectories
    #[arg(short = 'r', long = "recursive", help = "Descend into subdirectories")]
    pub recursive: bool,
}

impl Args {
    /// Get the log level based on verbosity settings
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

impl RewriteArgs {
    /// Writing configuration with command-line overrides applied
    pub fn to_config(&self) -> Result<EdiConfig> {
        let mut config = match &self.config {
            Some(path) => EdiConfig::from_json_file(path)?,
            None => EdiConfig::default(),
        };
        if let Some(block_len) = self.block_len {
            config = config.with_block_len(block_len);
        }
        if let Some(precision) = self.precision {
            let width = config
                .field_width
                .max(EdiConfig::min_field_width(precision));
            config = config.with_precision(precision).with_field_width(width);
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate the rewrite arguments for consistency
    pub fn validate(&self) -> Result<()> {
        if !self.file.exists() {
            return Err(Error::missing_input(self.file.display().to_string()));
        }
        if let Some(output) = &self.output {
            if output == &self.file {
                return Err(Error::configuration(
                    "Output path must differ from the input file".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl ScanArgs {
    pub fn validate(&self) -> Result<()> {
        if !self.dir.is_dir() {
            return Err(Error::configuration(format!(
                "Scan path is not a directory: {}",
                self.dir.display()
            )));
        }
        Ok(())
    }
}
