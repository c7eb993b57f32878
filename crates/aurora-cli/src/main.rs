//! Aurora command-line interface.
//!
//! Run a Monte Carlo photoionization simulation from a TOML parameter
//! file:
//! ```sh
//! aurora --params run.toml --threads 8
//! aurora -p run.toml --dry-run
//! ```

mod config;
mod runner;
mod writer;

use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use log::{info, warn, LevelFilter};

#[derive(Parser)]
#[command(name = "aurora")]
#[command(about = "Aurora: 3D Monte Carlo photoionization simulator")]
#[command(version)]
struct Cli {
    /// Parameter file containing the simulation parameters.
    #[arg(short = 'p', long = "params")]
    params: PathBuf,

    /// Lower the logging threshold to show per-substep details.
    #[arg(short, long)]
    verbose: bool,

    /// Write program logs to a file instead of standard error.
    #[arg(short, long)]
    logfile: Option<PathBuf>,

    /// Number of parallel worker threads (default: all cores).
    #[arg(short, long)]
    threads: Option<usize>,

    /// Build all components, then exit before initialising the grid.
    /// Ideal for checking that a parameter file will work.
    #[arg(short = 'n', long = "dry-run")]
    dry_run: bool,

    /// Allow running a build flagged as dirty. A dirty build does not
    /// correspond to a unique revision, so reruns are not reproducible.
    #[arg(short, long)]
    dirty: bool,
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Some(path) = &cli.logfile {
        let file = std::fs::File::create(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    info!(
        "This is Aurora, version {} ({} build).",
        env!("CARGO_PKG_VERSION"),
        if cfg!(debug_assertions) { "debug" } else { "release" }
    );

    if option_env!("AURORA_DIRTY") == Some("1") {
        warn!("This binary was built from a dirty source tree.");
        if !cli.dirty {
            bail!(
                "Running a dirty build is disabled by default; pass --dirty to run it anyway."
            );
        }
        warn!("However, dirty running is enabled.");
    }

    let config = config::load_config(&cli.params)?;
    info!("Configuration: {}", cli.params.display());

    let start = std::time::Instant::now();
    runner::execute(&config, cli.threads, cli.dry_run)?;
    info!("Total program time: {:.2} s.", start.elapsed().as_secs_f64());
    Ok(())
}
