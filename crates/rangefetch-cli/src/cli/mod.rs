//! CLI for the rangefetch downloader.

mod progress;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rangefetch::{config, control, CancellationToken, Downloader, FetchConfig};

/// Download one URL with concurrent Range requests.
#[derive(Debug, Parser)]
#[command(name = "rangefetch")]
#[command(about = "Segmented HTTP(S) downloader", long_about = None)]
pub struct Cli {
    /// Direct HTTP/HTTPS URL to download.
    pub url: String,

    /// Directory to save into (default: current directory).
    #[arg(short = 'd', long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Save under this name instead of the one the server suggests.
    #[arg(short = 'o', long, value_name = "NAME")]
    pub output: Option<String>,

    /// Number of segments for files above the threshold.
    #[arg(long, value_name = "N")]
    pub segments: Option<usize>,

    /// Files at or below this many bytes are fetched as one segment.
    #[arg(long, value_name = "BYTES")]
    pub threshold: Option<u64>,

    /// Attempts per segment, including the first.
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Extra request header, e.g. `-H "Authorization: Bearer x"`. Repeatable.
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
    pub headers: Vec<String>,

    /// Replace an existing file.
    #[arg(long)]
    pub overwrite: bool,

    /// Read settings from this file instead of the XDG config.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Layer command-line flags over the loaded config.
    pub fn apply(&self, mut cfg: FetchConfig) -> Result<FetchConfig> {
        if let Some(n) = self.segments {
            cfg.segment_count = n;
        }
        if let Some(n) = self.threshold {
            cfg.segment_threshold_bytes = n;
        }
        if let Some(n) = self.retries {
            cfg.retry.retry_times = n;
        }
        for raw in &self.headers {
            let (name, value) = parse_header(raw)?;
            cfg.headers.insert(name, value);
        }
        cfg.overwrite |= self.overwrite;
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .with_context(|| format!("header must look like 'Name: value', got {:?}", raw))?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("header name is empty in {:?}", raw);
    }
    Ok((name.to_string(), value.trim().to_string()))
}

pub async fn run_from_args() -> Result<()> {
    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => config::load_from_path(path)?,
        None => config::load_or_init()?,
    };
    let cfg = cli.apply(cfg)?;
    tracing::debug!("effective config: {:?}", cfg);

    let dir = match &cli.dir {
        Some(d) => d.clone(),
        None => std::env::current_dir()?,
    };

    let cancel = CancellationToken::new();
    control::cancel_on_interrupt(cancel.clone())?;

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let printer = tokio::spawn(progress::print_events(rx));

    let mut downloader = Downloader::new(cfg, dir)?
        .with_cancel_token(cancel)
        .with_events(tx);
    if let Some(name) = &cli.output {
        downloader = downloader.with_file_name(name.clone());
    }
    let result = downloader.run_async(&cli.url).await;
    // The sender lives in the downloader; drop it so the printer sees the end.
    drop(downloader);
    let _ = printer.await;

    let report = result?;
    println!(
        "saved {} ({} bytes, {} segment(s)) in {:.1}s",
        report.path.display(),
        report.job.total_size,
        report.job.segments.len(),
        report.elapsed.as_secs_f64()
    );
    Ok(())
}
