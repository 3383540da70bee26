//! # tome
//!
//! Loads one file through the tome loader and prints the decoded text.
//!
//! ```bash
//! tome notes.txt
//! tome --max-size -1 --chunk-size 4096 -v big.log
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tome_config::Config;
use tome_fs::{FileLoader, LoadOptions, LocalFile, TextBuffer};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tome")]
#[command(about = "Load a text file with automatic charset detection")]
#[command(version)]
struct Cli {
    /// Path to config file (default: first of the standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Largest file to load, in bytes; -1 disables the limit
    #[arg(long, allow_negative_numbers = true)]
    max_size: Option<i64>,

    /// Read size, in bytes
    #[arg(long)]
    chunk_size: Option<u64>,

    /// Keep the final line break instead of treating it as implied
    #[arg(long)]
    keep_trailing_newline: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// File to load
    file: PathBuf,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };

    if let Some(max_size) = cli.max_size {
        config.loader.max_size = max_size;
    }
    if let Some(chunk_size) = cli.chunk_size {
        config.loader.chunk_size = chunk_size;
    }
    config.validate().context("Invalid settings")?;
    Ok(config)
}

fn init_logging(cli: &Cli, config: &Config) -> Result<()> {
    let default_level = if cli.verbose { "debug" } else { config.logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&cli, &config)?;

    let mut buffer = TextBuffer::new_with_path(cli.file.clone());
    buffer.set_implicit_trailing_newline(!cli.keep_trailing_newline);
    let sink = Arc::new(Mutex::new(buffer));
    let file = Arc::new(LocalFile::new(&cli.file));

    let mut loader = FileLoader::for_file(&sink, &file);
    loader
        .configure(&config.loader)
        .context("Failed to apply loader settings")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling load");
            on_interrupt.cancel();
        }
    });

    let options = LoadOptions::new()
        .with_cancel(cancel)
        .with_progress(|read, total| debug!(read, total, "progress"));

    let summary = loader
        .load(options)
        .await
        .with_context(|| format!("Failed to load '{}'", cli.file.display()))?;

    let sink = sink.lock();
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(sink.text().as_bytes())?;
    if !cli.keep_trailing_newline && !sink.is_empty() {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;

    eprintln!(
        "Loaded {} ({}, {} bytes, {} lines)",
        sink.file_path().unwrap_or(&cli.file).display(),
        summary.charset,
        summary.bytes_read,
        sink.line_count()
    );
    Ok(())
}
