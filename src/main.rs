//! Alga PSA Endpoint Agent - checks runtime
//!
//! Boots the embedded Python interpreter with the agent's capability
//! modules, reports the runtime it ended up with, then tears it down:
//!
//! - Settings from the agent config directory or `--config`
//! - Extra module search paths from `--path`
//! - Boot diagnostics logged on failure

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use alga_checks_runtime::config::Settings;
use alga_checks_runtime::platform;

/// Alga PSA checks runtime
#[derive(Parser, Debug)]
#[command(name = "alga-checks-runtime")]
#[command(version, about = "Embedded Python runtime for Alga PSA agent checks")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Python major version to embed, overrides the settings file
    #[arg(long, env = "ALGA_PYTHON_VERSION")]
    python_version: Option<i64>,

    /// Extra module search path (repeatable)
    #[arg(short, long = "path")]
    paths: Vec<String>,

    /// Enable debug logging
    #[arg(short, long, env = "ALGA_DEBUG")]
    debug: bool,
}

async fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::load_from(path).await?,
        None => Settings::load().await?,
    };

    if let Some(version) = args.python_version {
        settings.python_version = version;
    }
    settings.debug |= args.debug;

    Ok(settings)
}

/// Log filter from the merged settings (`--debug` or `debug = true`)
fn log_filter(settings: &Settings) -> EnvFilter {
    if settings.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    }
}

#[cfg(feature = "embedded-six")]
fn run(settings: Settings, search_paths: &[PathBuf]) -> Result<()> {
    use std::sync::Arc;

    use alga_checks_runtime::capabilities::{HostModules, LoggingAggregator, NoopTagger};
    use alga_checks_runtime::embed::six::SixEmbedding;
    use alga_checks_runtime::runtime::{self, InitContext};
    use alga_checks_runtime::telemetry::LoggingSeriesSink;

    let host = HostModules::from_settings(
        &settings,
        Arc::new(LoggingAggregator),
        Arc::new(NoopTagger),
    );
    let ctx = InitContext::new(
        Arc::new(SixEmbedding),
        settings,
        host,
        Arc::new(LoggingSeriesSink),
    );

    let result = runtime::initialize(&ctx, search_paths);
    if result.is_ok() {
        tracing::info!(
            python_version = %runtime::python_version(),
            python_home = %runtime::python_home(),
            python_path = %runtime::python_path(),
            "Checks runtime initialized"
        );
    }

    // The handle is kept on boot failure and still has to be released
    runtime::destroy();

    result.context("Failed to initialize embedded python")
}

#[cfg(not(feature = "embedded-six"))]
fn run(_settings: Settings, _search_paths: &[PathBuf]) -> Result<()> {
    anyhow::bail!("This build has no embedded python support (enable the `embedded-six` feature)")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Settings come first so their `debug` key can raise the log level
    let settings = load_settings(&args).await?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(log_filter(&settings))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        python_version = settings.python_version,
        "Starting Alga PSA checks runtime"
    );

    let search_paths: Vec<PathBuf> = args.paths.iter().map(|p| platform::search_path(p)).collect();

    run(settings, &search_paths)
}
