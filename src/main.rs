use clap::Parser;
use tracing_subscriber::EnvFilter;
use zotwise::config::{Cli, Settings};
use zotwise::sync::Synchronizer;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("zotwise starting");

    let settings = Settings::from_cli(&args).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to load configuration");
        std::process::exit(2);
    });

    let synchronizer = Synchronizer::new(settings).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup api clients");
        std::process::exit(1);
    });

    match synchronizer.run().await {
        Ok(stats) => {
            tracing::info!(
                uploaded = stats.uploaded,
                failed = stats.normalize_failed + stats.convert_failed,
                "zotwise done"
            );
        }
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "sync failed");
            std::process::exit(1);
        }
    }
}
