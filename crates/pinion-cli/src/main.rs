//! Pinion CLI - pin mod dependency versions to the latest compatible releases

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

mod pin;

#[derive(Parser)]
#[command(name = "pinion")]
#[command(version)]
#[command(about = "Pin mod dependency versions in info.json files", long_about = None)]
struct Cli {
    /// Path to an info.json file, a folder containing it, or a folder of packs
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// Write changes in place (default: dry run)
    #[arg(long)]
    write: bool,

    /// Pin mode: 'gte' => >= latest major.minor, 'eq' => == exact latest
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Override existing comparators
    #[arg(long)]
    force: bool,

    /// Update already pinned dependencies to the latest release
    #[arg(long)]
    upgrade: bool,

    /// Force a patch bump of the pack version
    #[arg(long)]
    bump: bool,

    /// Local package names that are never pinned (comma-separated, repeatable)
    #[arg(long = "local", value_delimiter = ',')]
    local_packages: Vec<String>,

    /// Registry base URL (default: $PINION_REGISTRY_URL or the mod portal)
    #[arg(long)]
    registry_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Configuration file (defaults to ./pinion.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Gte,
    Eq,
}

impl From<ModeArg> for pinion_pkg::PinMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Gte => Self::Gte,
            ModeArg::Eq => Self::Eq,
        }
    }
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("pinion_pkg=debug,pinion=debug")
        } else {
            EnvFilter::new("pinion_pkg=warn,pinion=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(explicit: Option<&PathBuf>) -> Result<pinion_pkg::Config> {
    match explicit {
        Some(path) => pinion_pkg::Config::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => pinion_pkg::Config::find(".").context("Failed to load pinion.toml"),
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let mut config = load_config(cli.config.as_ref())?;
    config.local_packages.extend(cli.local_packages);
    if let Some(url) = cli.registry_url {
        config.registry_url = Some(url);
    }
    if let Some(secs) = cli.timeout {
        config.timeout_secs = Some(secs);
    }

    let options = pinion_pkg::PinOptions {
        mode: cli
            .mode
            .map(pinion_pkg::PinMode::from)
            .or(config.mode)
            .unwrap_or_default(),
        write: cli.write,
        force: cli.force,
        upgrade: cli.upgrade,
        bump: cli.bump,
    };
    tracing::debug!(
        mode = %options.mode,
        write = options.write,
        force = options.force,
        upgrade = options.upgrade,
        bump = options.bump,
        "pin options"
    );

    let summary = pin::run(&cli.path, &config, options)?;
    summary.print_summary(options.write);

    Ok(if summary.failed.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
