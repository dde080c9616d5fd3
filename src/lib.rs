//! coco-records: per-image annotation records and their COCO projection.
//!
//! Raw samples (one per annotation, or one per image) are parsed into
//! [`Record`](record::Record)s keyed by dense image ids, partitioned by a
//! data splitter, and converted into the COCO `images` / `annotations` /
//! `categories` layout that evaluation tooling expects.
//!
//! # Modules
//!
//! - [`record`]: Record model, id mapping, boxes, masks and RLE
//! - [`parser`]: Parser pipeline that aggregates samples into records
//! - [`split`]: Data splitters (single, random, fixed)
//! - [`coco`]: COCO converter, index and evaluation adapter
//! - [`validation`]: Record validation and issue reporting
//! - [`error`]: Error types for coco-records operations

pub mod coco;
pub mod error;
pub mod parser;
mod progress;
pub mod record;
pub mod split;
pub mod validation;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;

pub use error::RecordError;

use split::DataSplitter;

/// The coco-records CLI application.
#[derive(Parser)]
#[command(name = "coco-records")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Convert a records JSON file into a COCO dataset.
    Convert(ConvertArgs),
    /// Validate records for errors and warnings.
    Validate(ValidateArgs),
    /// Split record image ids into groups.
    Split(SplitArgs),
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Records JSON file.
    input: PathBuf,

    /// Treat the records as predictions (annotations only).
    #[arg(long)]
    preds: bool,

    #[arg(long)]
    no_images: bool,

    #[arg(long)]
    no_annotations: bool,

    #[arg(long)]
    no_categories: bool,

    /// Show a progress bar on stderr.
    #[arg(long)]
    progress: bool,
}

/// Arguments for the validate subcommand.
#[derive(clap::Args)]
struct ValidateArgs {
    /// Records JSON file to validate.
    input: PathBuf,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

#[derive(clap::Args)]
struct SplitArgs {
    /// Records JSON file.
    input: PathBuf,

    /// Comma-separated split probabilities, e.g. 0.8,0.2.
    #[arg(long, value_delimiter = ',', required = true)]
    ratios: Vec<f64>,

    /// Seed for a reproducible split.
    #[arg(long, env = "COCO_RECORDS_SEED")]
    seed: Option<u64>,
}

/// Run the coco-records CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), RecordError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Convert(args)) => run_convert(args),
        Some(Commands::Validate(args)) => run_validate(args),
        Some(Commands::Split(args)) => run_split(args),
        None => {
            println!("coco-records {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Parse annotation records and convert them to COCO.");
            println!();
            println!("Run 'coco-records --help' for usage information.");
            Ok(())
        }
    }
}

fn run_convert(args: ConvertArgs) -> Result<(), RecordError> {
    let records = record::io_json::read_records_json(&args.input)?;

    let mut opts = if args.preds {
        coco::CocoOptions::predictions()
    } else {
        coco::CocoOptions {
            images: !args.no_images,
            annotations: !args.no_annotations,
            categories: !args.no_categories,
            ..coco::CocoOptions::default()
        }
    };
    opts.show_progress = args.progress;

    let dataset = coco::records_to_coco(&records, &opts)?;
    let json =
        coco::to_coco_string(&dataset).map_err(|source| RecordError::CocoJsonWrite { source })?;
    println!("{}", json);
    Ok(())
}

/// Machine-readable validation summary.
#[derive(Serialize)]
struct JsonReport<'a> {
    error_count: usize,
    warning_count: usize,
    issues: &'a [validation::ValidationIssue],
}

/// Execute the validate subcommand.
fn run_validate(args: ValidateArgs) -> Result<(), RecordError> {
    let records = record::io_json::read_records_json(&args.input)?;

    let opts = validation::ValidateOptions {
        strict: args.strict,
    };
    let report = validation::validate_records(&records, &opts);

    match args.output.as_str() {
        "json" => {
            let summary = JsonReport {
                error_count: report.error_count(),
                warning_count: report.warning_count(),
                issues: &report.issues,
            };
            let json = serde_json::to_string_pretty(&summary)
                .map_err(|source| RecordError::JsonWrite { source })?;
            println!("{}", json);
        }
        "text" => print!("{}", report),
        other => {
            return Err(RecordError::UnsupportedFormat(format!(
                "'{}' (supported: text, json)",
                other
            )));
        }
    }

    // Determine exit status
    let has_errors = report.error_count() > 0;
    let has_warnings = report.warning_count() > 0;

    if has_errors || (args.strict && has_warnings) {
        Err(RecordError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

fn run_split(args: SplitArgs) -> Result<(), RecordError> {
    let records = record::io_json::read_records_json(&args.input)?;
    let splitter = split::RandomSplitter::new(args.ratios, args.seed)?;

    let ids: Vec<_> = records.iter().map(|r| r.imageid).collect();
    let groups = splitter.split(&ids);
    info!(
        "split {} image(s) into groups of {:?}",
        ids.len(),
        groups.iter().map(Vec::len).collect::<Vec<_>>()
    );

    let json =
        serde_json::to_string(&groups).map_err(|source| RecordError::JsonWrite { source })?;
    println!("{}", json);
    Ok(())
}
