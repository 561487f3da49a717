use anyhow::Result;
use clap::Parser;
use log::{error, info, warn};
use smart_shield::api::{AppState, RestApi};
use smart_shield::config;
use smart_shield::db;
use smart_shield::geocoding::NominatimGeocoder;
use smart_shield::messaging::{self, EventType, RegistryEvents};
use std::path::PathBuf;
use std::sync::Arc;

/// SmartShield camera registry server
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Configuration file (TOML or JSON)
    #[arg(long, env = "SMART_SHIELD_CONFIG")]
    config: Option<PathBuf>,
}

async fn run_app(args: Args) -> Result<()> {
    let config = config::load_config(args.config.as_deref())?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.api.log_level.as_str()),
    )
    .init();
    info!("Starting SmartShield camera registry");

    if config.security.uses_default_secret() {
        warn!("security.jwt_secret is the built-in default; owner tokens can be forged until it is changed");
    }

    let store = db::open_store(&config.database).await?;
    info!("Registration store ready ({:?})", config.database.backend);

    let geocoder = Arc::new(NominatimGeocoder::new(&config.geocoding)?);

    let publisher = messaging::create_publisher(&config.message_broker).await?;
    let events = RegistryEvents::new(Arc::clone(&publisher));

    if let Err(e) = events.system_event(EventType::SystemStartup).await {
        warn!("Failed to publish system startup event: {}", e);
    }

    let state = AppState::new(config, store, geocoder, publisher);
    let http_server = RestApi::new(state);

    http_server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down...");
        })
        .await?;

    if let Err(e) = events.system_event(EventType::SystemShutdown).await {
        error!("Failed to publish shutdown event: {}", e);
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run_app(args).await {
        eprintln!("Application error: {:#}", e);
        std::process::exit(1);
    }
}
