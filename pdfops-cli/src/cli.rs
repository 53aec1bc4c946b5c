//! Command-line interface definition.
//!
//! Kept free of library types so `build.rs` can include it to render the
//! man page.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Merge, split and compress PDF documents.
#[derive(Parser, Debug)]
#[command(name = "pdfops")]
#[command(version)]
#[command(about = "Merge, split and compress PDF documents", long_about = None)]
#[command(author)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Operation to run
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output - show statistics and debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Overwrite existing output files
    ///
    /// Without this flag an existing output file is an error.
    #[arg(short, long, global = true)]
    pub force: bool,
}

/// Available operations.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Combine the pages of two or more PDFs into one document
    ///
    /// Examples:
    ///   pdfops merge a.pdf b.pdf -o out.pdf
    ///   pdfops merge 'chapter*.pdf' -o book.pdf --bookmarks
    Merge(MergeArgs),

    /// Split a PDF into several documents
    ///
    /// Without --every or --range, every page becomes its own document.
    ///
    /// Examples:
    ///   pdfops split report.pdf -o parts/
    ///   pdfops split report.pdf -o parts/ --every 3
    ///   pdfops split report.pdf -o parts/ --range 1-4 --range 9
    Split(SplitArgs),

    /// Re-encode a PDF to reduce its size
    ///
    /// Quality below 70 also resamples embedded images.
    Compress(CompressArgs),

    /// Show page count, version and size of PDFs
    Info(InfoArgs),
}

/// Arguments of `pdfops merge`.
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Input PDF files or glob patterns, in merge order
    #[arg(required = true, value_name = "FILE")]
    pub inputs: Vec<String>,

    /// Output PDF file path
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Alternate pages across inputs instead of concatenating them
    #[arg(short, long)]
    pub interleave: bool,

    /// Retain the outlines (bookmarks) of the inputs
    #[arg(short, long)]
    pub bookmarks: bool,
}

/// Arguments of `pdfops split`.
#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Directory for the result files
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Chunks of N consecutive pages
    #[arg(short, long, value_name = "N", conflicts_with = "ranges")]
    pub every: Option<u32>,

    /// One document per range expression, e.g. "5" or "4-8"
    #[arg(short = 'r', long = "range", value_name = "EXPR")]
    pub ranges: Vec<String>,
}

/// Arguments of `pdfops compress`.
#[derive(Args, Debug)]
pub struct CompressArgs {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Output PDF file path
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Quality from 1 to 100
    #[arg(long, value_name = "Q", default_value_t = 100)]
    #[arg(value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,
}

/// Arguments of `pdfops info`.
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// PDF files or glob patterns
    #[arg(required = true, value_name = "FILE")]
    pub inputs: Vec<String>,

    /// Print one JSON object per file
    #[arg(long)]
    pub json: bool,
}
