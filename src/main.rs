use anyhow::Result;
use clap::Parser;
use syncmeter::{cli::Cli, driver};
use tracing_subscriber::EnvFilter;

/// Progress goes to stderr at info level; stdout stays the report surface.
/// RUST_LOG overrides the default filter.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing();

    let config = driver::RunConfig::from(args);
    driver::run(&config).await
}
