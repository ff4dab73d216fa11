use std::path::PathBuf;

use bosh_vault::{
    api::{start_api_server, ApiState},
    config::load_config,
    observability::{init_observability, log_config_info},
    secrets::{build_store, DefaultConnector},
    Error, Result, APP_NAME, VERSION,
};
use clap::Parser;
use tracing::{error, info};

/// BOSH config-server compatible credential broker
#[derive(Debug, Parser)]
#[command(name = "bosh-vault", version, about)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, env = "BV_CONFIG")]
    config: Option<PathBuf>,
}

fn install_rustls_provider() -> Result<()> {
    use rustls::crypto::{ring, CryptoProvider};

    if CryptoProvider::get_default().is_none() {
        ring::default_provider()
            .install_default()
            .map_err(|_| Error::internal("failed to install ring crypto provider"))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    install_rustls_provider()?;

    // Load .env file if it exists (optional - won't fail if missing)
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let config = load_config(cli.config.as_deref())?;
    let metrics = init_observability(&config.observability)?;

    info!(app_name = APP_NAME, version = VERSION, "Starting bosh-vault");
    log_config_info(&config);

    // The default backend must be reachable before serving anything.
    let store = match build_store(&config, &DefaultConnector, metrics).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "Unable to initialize the backend store, refusing to serve");
            return Err(e.into());
        }
    };

    start_api_server(&config.server, ApiState::new(store, metrics)).await?;

    info!("bosh-vault stopped");
    Ok(())
}
