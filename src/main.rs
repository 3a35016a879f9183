//! DicomScout: find DICOM files under a set of roots, including inside
//! zip and 7z archives.
//!
//! Thin binary entry point. All logic lives in `dicomscout-core`.

use anyhow::{bail, Context};
use clap::Parser;
use dicomscout_core::roots::{load_root_list, parse_root_list};
use dicomscout_core::{start_scan, ReportFormat, ReportWriter, ScanConfig, ScanEvent, ScanRoot};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "dicomscout", version, about = "Find DICOM files in directories and archives")]
struct Cli {
    /// Directories to scan, after any listed in --roots-file.
    roots: Vec<PathBuf>,

    /// File with one root per line; lines starting with ** are comments.
    #[arg(long, value_name = "FILE")]
    roots_file: Option<PathBuf>,

    /// JSON scan config; command-line flags override it.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format: text, csv or jsonl.
    #[arg(long, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    /// Write the report here instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Scan roots concurrently.
    #[arg(long)]
    parallel: bool,

    /// Worker threads for --parallel (default: CPU count).
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Deepest archive nesting to open.
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,

    /// Directory for temporary copies of nested archives.
    #[arg(long, value_name = "DIR")]
    temp_dir: Option<PathBuf>,

    /// Debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so the report can be piped.
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let roots = collect_roots(&cli, &config)?;
    if roots.is_empty() {
        bail!("no roots to scan: pass directories or --roots-file");
    }

    tracing::info!("DicomScout starting, {} root(s)", roots.len());

    let output: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut report = ReportWriter::new(cli.format, BufWriter::new(output));

    let handle = start_scan(roots, config).context("Failed to start scanner thread")?;
    for event in handle.events.iter() {
        if let ScanEvent::Discovered(discovery) = event {
            report.write(&discovery).context("Failed to write report")?;
        }
    }
    let written = report.written();
    report.into_inner().context("Failed to write report")?;
    tracing::info!("Wrote {written} report record(s)");
    let summary = handle.join()?;

    let totals = summary.totals;
    eprintln!("Scrape complete");
    eprintln!(
        "  roots: {}  files: {}  directories: {}  archives: {}  errors: {}  fatal: {}  elapsed: {:.2?}",
        summary.roots,
        totals.discoveries,
        totals.directories,
        totals.containers,
        totals.errors,
        totals.fatal_errors,
        summary.duration
    );
    Ok(())
}

fn build_config(cli: &Cli) -> anyhow::Result<ScanConfig> {
    let mut config = match &cli.config {
        Some(path) => ScanConfig::from_json_file(path)?,
        None => ScanConfig::default(),
    };
    if cli.parallel {
        config.parallel_roots = true;
    }
    if cli.threads.is_some() {
        config.threads = cli.threads;
    }
    if let Some(depth) = cli.max_depth {
        config.max_nesting_depth = depth;
    }
    if cli.temp_dir.is_some() {
        config.temp_dir = cli.temp_dir.clone();
    }
    Ok(config)
}

fn collect_roots(cli: &Cli, config: &ScanConfig) -> anyhow::Result<Vec<ScanRoot>> {
    let sentinel = config.sentinel_dir_name.as_str();
    let mut roots = match &cli.roots_file {
        Some(path) => load_root_list(path, sentinel)?,
        None => Vec::new(),
    };
    for root in &cli.roots {
        // Positional roots go through the same filter as root-list lines.
        let text = root.to_string_lossy();
        if parse_root_list(&text).is_empty() {
            continue;
        }
        roots.push(ScanRoot::new(root.clone(), sentinel));
    }
    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "dicomscout",
            "--parallel",
            "--threads",
            "3",
            "--max-depth",
            "2",
            "/data",
        ]);
        let config = build_config(&cli).unwrap();
        assert!(config.parallel_roots);
        assert_eq!(config.threads, Some(3));
        assert_eq!(config.max_nesting_depth, 2);
        assert_eq!(cli.format, ReportFormat::Text);
    }

    #[test]
    fn comment_like_positional_roots_are_skipped() {
        let cli = Cli::parse_from(["dicomscout", "/a", "**/b", "/c"]);
        let roots = collect_roots(&cli, &ScanConfig::default()).unwrap();
        let paths: Vec<_> = roots.iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths, [PathBuf::from("/a"), PathBuf::from("/c")]);
    }

    #[test]
    fn format_flag_parses() {
        let cli = Cli::parse_from(["dicomscout", "--format", "jsonl", "/a"]);
        assert_eq!(cli.format, ReportFormat::JsonLines);
    }
}
