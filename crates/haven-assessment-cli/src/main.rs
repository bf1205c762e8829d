use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = haven_assessment_cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(default_filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    haven_assessment_cli::run_cli(cli)
}

/// `RUST_LOG` when set, `warn` otherwise.
fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}
