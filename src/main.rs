//! uce-scan - Ultra-Conserved Element Finder
//!
//! Reports reference intervals conserved across samples of a TAF or MAF
//! alignment, one tab-separated `contig start end depth` line per interval.
//!
//! ## Usage
//!
//! ```bash
//! uce-scan -m 50 -d 3 < alignment.taf
//! uce-scan -i alignment.maf -m 100 -d 5 -x hg38 -x panTro6
//! ```

// Use jemalloc for better memory management (returns memory to OS)
#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use uce_scan::formats::{open_alignment, FileFormat};
use uce_scan::uce::{compute_uces, IntervalWriter, UceOptions};

/// Alignment format specification for command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    /// Transposed alignment format
    Taf,
    /// Multiple alignment format
    Maf,
    /// Auto-detect from header and extension
    Auto,
}

impl From<FormatArg> for Option<FileFormat> {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Taf => Some(FileFormat::Taf),
            FormatArg::Maf => Some(FileFormat::Maf),
            FormatArg::Auto => None,
        }
    }
}

/// Compute Ultra-Conserved Elements from a TAF or MAF alignment
///
/// Output regions are written as `contig<TAB>start<TAB>end<TAB>min_depth`
/// with 0-based half-open coordinates on the reference (first) row.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input alignment file [default: stdin]
    #[arg(short = 'i', long = "input-file", value_name = "FILE")]
    input_file: Option<PathBuf>,

    /// Output regions must be at least N bp long
    #[arg(short = 'm', long = "min-length", value_name = "N",
          value_parser = clap::value_parser!(u64).range(1..))]
    min_length: u64,

    /// Output regions must be conserved in N samples
    #[arg(short = 'd', long = "min-depth", value_name = "N",
          value_parser = clap::value_parser!(u64).range(1..))]
    min_depth: u64,

    /// Columns where this sample matches are not considered conserved (multiple allowed)
    #[arg(short = 'x', long = "exclude-sample", value_name = "SAMPLE")]
    exclude_sample: Vec<String>,

    /// Separator between sample and contig in sequence names
    #[arg(short = 's', long = "separator", default_value = ".")]
    separator: char,

    /// Force a specific alignment format (overrides auto-detection)
    #[arg(short = 'f', long = "format", value_enum, default_value = "auto")]
    format: FormatArg,

    /// Output file. Use "-" for stdout.
    #[arg(short = 'o', long = "output", default_value = "-")]
    output: String,

    /// Increase diagnostic verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();

    let min_depth = usize::try_from(args.min_depth).context("Minimum depth is too large")?;
    let options = UceOptions::new(args.min_length, min_depth)?
        .exclude_samples(args.exclude_sample)
        .with_separator(args.separator);

    let forced_format: Option<FileFormat> = args.format.into();
    let blocks = open_alignment(args.input_file.as_ref(), forced_format).with_context(|| {
        match &args.input_file {
            Some(path) => format!("Unable to open input file {}", path.display()),
            None => "Unable to read standard input".to_string(),
        }
    })?;

    let output: Box<dyn Write> = if args.output == "-" {
        Box::new(io::stdout().lock())
    } else {
        let file = File::create(&args.output)
            .with_context(|| format!("Unable to create output file {}", args.output))?;
        Box::new(BufWriter::new(file))
    };

    let mut writer = IntervalWriter::new(output);
    let summary = compute_uces(blocks, &mut writer, &options)?;
    log::info!(
        "Wrote {} conserved intervals from {} blocks",
        summary.intervals,
        summary.blocks
    );

    Ok(())
}
