use anyhow::Result;
use chatrelay::app::dispatch::dispatch;
use chatrelay::cli::Cli;
use chatrelay::config::Config;
use clap::Parser;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Both the websocket and HTTP stacks run on rustls; pick the provider once.
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: Failed to install default crypto provider: {e:?}");
    }

    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::load(cli.config.as_deref())?;
    dispatch(cli, config).await
}
