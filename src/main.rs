use anyhow::{Context, Result};
use clap::Parser;
use dreamshift::cli::Cli;
use dreamshift::config::Settings;
use tracing_subscriber::EnvFilter;

/// Log to stderr; `RUST_LOG` overrides the verbosity flag.
fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;

    match cli.command.into_analysis() {
        Some(analysis) => {
            let written = analysis
                .run(&settings)
                .with_context(|| format!("{} failed", analysis.name()))?;
            for path in written {
                println!("{}", path.display());
            }
        }
        None => {
            let created = settings
                .init_directories()
                .context("failed to create directories")?;
            for dir in created {
                println!("{}", dir.display());
            }
        }
    }
    Ok(())
}
