mod config;
mod service;
mod workers;

use clap::Parser;
use config::Config;
use service::Service;
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Parser)]
#[clap(author, version, about = "Layer-2 transaction sequencer", long_about = None)]
struct Args {
    #[clap(long, env, default_value = "sequencerd.toml")]
    config_file: String,
}

fn setup_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into())))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logging();

    let args = Args::parse();
    let config = match Config::from_toml_file(&args.config_file) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("{err}; falling back to default configuration");
            Config::default()
        }
    };

    let service = Service::from(config)?;
    tracing::info!("sequencerd starting");

    tokio::select! {
        _ = service.run() => {},
        _ = signal::ctrl_c() => {
            tracing::info!("shutting down...");
        },
    }

    Ok(())
}
