//! pdfops - Merge, split and compress PDF documents from the command line.

mod cli;
mod output;

use anyhow::{Context, bail};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, CompressArgs, InfoArgs, MergeArgs, SplitArgs};
use crate::output::OutputFormatter;
use pdfops::codec::WriteStatistics;
use pdfops::compress::Compressor;
use pdfops::config::{CompressOptions, MergeMode, MergeOptions, Quality, SplitOptions};
use pdfops::inspect::inspect;
use pdfops::merge::Merger;
use pdfops::split::Splitter;
use pdfops::utils::{file_stem, format_file_size};
use pdfops::{PdfOpsError, PdfReader, PdfWriter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let formatter = OutputFormatter::new(cli.quiet, cli.verbose);
    init_tracing(formatter.is_verbose());
    if let Err(err) = run(cli, &formatter).await {
        formatter.error(&format!("Error: {err:#}"));
        process::exit(exit_code(&err));
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("pdfops=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pdfops=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Library errors carry their own exit code; anything else is a usage error.
fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<PdfOpsError>()
        .map_or(1, PdfOpsError::exit_code)
}

async fn run(cli: Cli, formatter: &OutputFormatter) -> anyhow::Result<()> {
    match cli.command {
        Command::Merge(args) => merge(args, cli.force, formatter).await,
        Command::Split(args) => split(args, cli.force, formatter).await,
        Command::Compress(args) => compress(args, cli.force, formatter).await,
        Command::Info(args) => info(args, formatter).await,
    }
}

async fn merge(args: MergeArgs, force: bool, formatter: &OutputFormatter) -> anyhow::Result<()> {
    let inputs = resolve_inputs(&args.inputs)?;
    ensure_writable(&args.output, force).await?;

    let buffers = read_all(&inputs).await?;
    let options = MergeOptions {
        mode: if args.interleave {
            MergeMode::Interleave
        } else {
            MergeMode::Concatenate
        },
        include_bookmarks: args.bookmarks,
    };

    formatter.info(&format!("Merging {} PDF files...", inputs.len()));
    let output = Merger::new().merge(&buffers, &options)?;
    let written = PdfWriter::new().save(output.bytes, &args.output).await?;

    formatter.success(&format!(
        "Created {} ({} pages, {})",
        args.output.display(),
        output.page_count,
        written.format_file_size()
    ));

    let stats = &output.statistics;
    formatter.section("Statistics");
    formatter.detail("Input files", &stats.files_merged.to_string());
    formatter.detail("Total pages", &stats.total_pages.to_string());
    formatter.detail("Input size", &stats.format_input_size());
    formatter.detail("Output size", &stats.format_output_size());
    formatter.detail("Bookmarks", &stats.bookmarks_added.to_string());
    formatter.detail("Merge time", &format!("{:.2}s", stats.merge_time.as_secs_f64()));
    formatter.detail("Write time", &format!("{:.2}s", written.write_time.as_secs_f64()));

    Ok(())
}

async fn split(args: SplitArgs, force: bool, formatter: &OutputFormatter) -> anyhow::Result<()> {
    let options = if let Some(stride) = args.every {
        SplitOptions::every(stride)?
    } else if !args.ranges.is_empty() {
        SplitOptions::ranges(&args.ranges)?
    } else {
        SplitOptions::Single
    };

    let source = PdfReader::new().read_file(&args.input).await?;
    let parts = Splitter::new().split(&source, &options)?;

    let stem = args
        .input
        .file_name()
        .map(|name| file_stem(&name.to_string_lossy()).to_string())
        .unwrap_or_else(|| "split".to_string());

    let targets: Vec<PathBuf> = parts
        .iter()
        .map(|part| args.output.join(format!("{stem}-{}.pdf", part.suffix)))
        .collect();
    for target in &targets {
        ensure_writable(target, force).await?;
    }

    tokio::fs::create_dir_all(&args.output)
        .await
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let page_counts: Vec<usize> = parts.iter().map(|part| part.page_count).collect();
    let outputs = parts
        .into_iter()
        .map(|part| part.bytes)
        .zip(targets.iter().cloned())
        .collect();
    let written = save_all(&PdfWriter::new(), outputs).await?;

    for ((target, pages), stats) in targets.iter().zip(page_counts).zip(&written) {
        formatter.detail(
            &target.display().to_string(),
            &format!("{pages} pages, {}", stats.format_file_size()),
        );
    }

    formatter.success(&format!(
        "Split {} into {} files in {}",
        args.input.display(),
        targets.len(),
        args.output.display()
    ));
    Ok(())
}

async fn compress(args: CompressArgs, force: bool, formatter: &OutputFormatter) -> anyhow::Result<()> {
    ensure_writable(&args.output, force).await?;

    let options = CompressOptions {
        quality: Quality::new(args.quality)?,
    };
    let source = PdfReader::new().read_file(&args.input).await?;
    let output = Compressor::new().compress(&source, &options)?;
    PdfWriter::new().save(output.bytes, &args.output).await?;

    let report = &output.report;
    formatter.success(&format!("Created {}", args.output.display()));
    formatter.info(&report.summary());
    formatter.section("Statistics");
    formatter.detail("Original size", &format_file_size(report.original_size));
    formatter.detail("Compressed size", &format_file_size(report.compressed_size));
    formatter.detail("Objects deduplicated", &report.objects_deduplicated.to_string());
    formatter.detail("Images resampled", &report.images_resampled.to_string());

    if report.compressed_size > report.original_size {
        formatter.warning("The result is larger than the input; the input was already compact");
    }
    Ok(())
}

async fn info(args: InfoArgs, formatter: &OutputFormatter) -> anyhow::Result<()> {
    let inputs = resolve_inputs(&args.inputs)?;
    let reader = PdfReader::new();

    for path in &inputs {
        let bytes = reader.read_file(path).await?;
        let info = inspect(&bytes).with_context(|| format!("Failed to inspect {}", path.display()))?;

        if args.json {
            let mut value = serde_json::to_value(&info)?;
            if let Some(object) = value.as_object_mut() {
                object.insert("file".to_string(), path.display().to_string().into());
            }
            println!("{value}");
            continue;
        }

        formatter.info(&format!(
            "{}: {} pages, PDF {}, {}",
            path.display(),
            info.page_count,
            info.version,
            format_file_size(info.byte_size)
        ));
        if let Some((width, height)) = info.page_dimensions {
            formatter.detail("Page size", &format!("{width:.0} x {height:.0} pt"));
        }
        formatter.detail("Objects", &info.object_count.to_string());
        formatter.detail("Outline", if info.has_outline { "yes" } else { "no" });
    }
    Ok(())
}

/// Expand glob patterns in order; plain paths pass through untouched.
fn resolve_inputs(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut resolved = Vec::new();

    for pattern in patterns {
        if !pattern.contains(['*', '?', '[']) {
            resolved.push(PathBuf::from(pattern));
            continue;
        }

        let mut matches = glob::glob(pattern)
            .with_context(|| format!("Invalid glob pattern: {pattern}"))?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to expand {pattern}"))?;
        if matches.is_empty() {
            bail!("No files match {pattern}");
        }
        matches.sort();
        debug!(pattern = %pattern, matches = matches.len(), "expanded glob");
        resolved.extend(matches);
    }

    Ok(resolved)
}

async fn read_all(paths: &[PathBuf]) -> anyhow::Result<Vec<Vec<u8>>> {
    let reader = PdfReader::new();
    let mut buffers = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = reader
            .read_file(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        buffers.push(bytes);
    }
    Ok(buffers)
}

/// Save every buffer, or none: files written before a failure are removed.
async fn save_all(
    writer: &PdfWriter,
    outputs: Vec<(Vec<u8>, PathBuf)>,
) -> pdfops::Result<Vec<WriteStatistics>> {
    let mut written = Vec::with_capacity(outputs.len());

    for (bytes, target) in outputs {
        match writer.save(bytes, &target).await {
            Ok(stats) => written.push(stats),
            Err(e) => {
                for stats in &written {
                    if let Err(cleanup) = tokio::fs::remove_file(&stats.output_path).await {
                        warn!(
                            path = %stats.output_path.display(),
                            error = %cleanup,
                            "failed to remove partial output"
                        );
                    }
                }
                debug!(removed = written.len(), "rolled back partial split");
                return Err(e);
            }
        }
    }

    Ok(written)
}

async fn ensure_writable(path: &Path, force: bool) -> anyhow::Result<()> {
    if !force && PdfWriter::new().exists(path).await {
        bail!(
            "Output file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_plain_paths_keep_order() {
        let inputs = vec!["b.pdf".to_string(), "a.pdf".to_string()];
        let resolved = resolve_inputs(&inputs).unwrap();
        assert_eq!(resolved, vec![PathBuf::from("b.pdf"), PathBuf::from("a.pdf")]);
    }

    #[test]
    fn test_resolve_glob_is_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["c.pdf", "a.pdf", "b.pdf", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let pattern = format!("{}/*.pdf", dir.path().display());
        let resolved = resolve_inputs(&[pattern]).unwrap();
        let names: Vec<String> = resolved
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf", "c.pdf"]);
    }

    #[test]
    fn test_resolve_glob_without_matches() {
        let dir = TempDir::new().unwrap();
        let pattern = format!("{}/*.pdf", dir.path().display());
        assert!(resolve_inputs(&[pattern]).is_err());
    }

    #[tokio::test]
    async fn test_existing_output_needs_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.pdf");
        assert!(ensure_writable(&path, false).await.is_ok());

        fs::write(&path, b"existing").unwrap();
        assert!(ensure_writable(&path, false).await.is_err());
        assert!(ensure_writable(&path, true).await.is_ok());
    }

    #[tokio::test]
    async fn test_save_all_removes_earlier_files_on_failure() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("doc-part-1.pdf");
        let second = dir.path().join("doc-part-2.pdf");
        let third = dir.path().join("doc-part-3.pdf");
        // A non-empty directory in place of the second part makes its rename fail.
        fs::create_dir_all(second.join("blocker")).unwrap();

        let outputs = vec![
            (b"%PDF-1.7 one".to_vec(), first.clone()),
            (b"%PDF-1.7 two".to_vec(), second.clone()),
            (b"%PDF-1.7 three".to_vec(), third.clone()),
        ];
        let err = save_all(&PdfWriter::new(), outputs).await.unwrap_err();

        assert!(matches!(err, PdfOpsError::Io { .. }));
        assert!(!first.exists());
        assert!(!third.exists());
        assert!(second.is_dir());
    }

    #[tokio::test]
    async fn test_save_all_writes_every_file() {
        let dir = TempDir::new().unwrap();
        let outputs: Vec<(Vec<u8>, PathBuf)> = (1..=2)
            .map(|k| {
            let path = dir.path().join(format!("p{k}.pdf"));
            (format!("part {k}").into_bytes(), path)
        })
            .collect();

        let written = save_all(&PdfWriter::new(), outputs).await.unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(fs::read(dir.path().join("p2.pdf")).unwrap(), b"part 2");
    }

    #[test]
    fn test_exit_codes() {
        let insufficient = anyhow::Error::new(PdfOpsError::InsufficientInputs {
            required: 2,
            provided: 1,
        });
        assert_eq!(exit_code(&insufficient), 1);

        let malformed = anyhow::Error::new(PdfOpsError::malformed(0, "no header"))
            .context("Failed to read a.pdf");
        assert_eq!(exit_code(&malformed), 3);

        assert_eq!(exit_code(&anyhow::anyhow!("usage")), 1);
    }

    #[tokio::test]
    async fn test_info_rejects_non_pdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.pdf");
        fs::write(&path, b"not a pdf").unwrap();

        let args = InfoArgs {
            inputs: vec![path.display().to_string()],
            json: false,
        };
        let err = info(args, &OutputFormatter::new(true, false)).await.unwrap_err();
        assert_eq!(exit_code(&err), 3);
    }
}
