use std::sync::Arc;

use beacon_core::Config;
use beacon_store::DynamoDbStore;
use beacon_tracker::{build_router, AppState};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tracker-server")]
struct Cli {
    /// Configuration profile (falls back to unprefixed env vars).
    #[arg(long, env = "BEACON_PROFILE", default_value = "")]
    profile: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    beacon_core::config::load_dotenv();
    let cli = Cli::parse();

    let config = Config::for_profile(&cli.profile);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    config.log_summary();
    config.require_configured("SESSIONS_TABLE")?;

    let state = Arc::new(AppState {
        store: DynamoDbStore::new(&config.aws, config.store.ttl_days),
        sessions_table: config.store.sessions_table.clone(),
        allowed_domains: config.tracker.allowed_domains.clone(),
    });

    let app = build_router(state);
    let addr = format!("{}:{}", config.tracker.host, config.tracker.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "journey tracker listening");

    axum::serve(listener, app).await?;
    Ok(())
}
