//! CLI entry point: builds every static data category, then updates
//! `meta.json`.
//!
//! Exits non-zero when any category or the metadata write failed; the
//! remaining categories are still built.

use anyhow::{Result, bail};
use clap::Parser;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use transit_static_gen::config::PipelineConfig;
use transit_static_gen::fetch::build_client;
use transit_static_gen::{generators, pipeline};

#[derive(Parser)]
#[command(name = "transit_static_gen")]
#[command(about = "Builds the static transit reference data", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, env = "PIPELINE_CONFIG")]
    config: Option<String>,

    /// Output directory, overriding the configuration
    #[arg(short, long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/transit_static_gen.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_static_gen.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let mut config = PipelineConfig::resolve(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    info!(data_dir = %config.data_dir.display(), "Starting static data build");

    let client = build_client(&config.http)?;
    let generators = generators::all(client, &config);
    let summary = pipeline::run(&generators, &config.data_dir).await;

    if !summary.is_success() {
        bail!(
            "build incomplete: failed categories {:?}, metadata error {:?}",
            summary.failed,
            summary.metadata_error
        );
    }
    Ok(())
}
