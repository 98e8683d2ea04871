use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crisisdesk::config::AppConfig;
use crisisdesk::routes::create_router;
use crisisdesk::state::AppState;
use crisisdesk::storage::DiskStorage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        server_host = %config.server_host,
        server_port = config.server_port,
        upload_dir = %config.upload_dir.display(),
        cors_restricted = config.cors_allowed_origin.is_some(),
        "loaded configuration"
    );

    let storage = DiskStorage::new(config.upload_dir.clone());
    storage.ensure_root().await?;

    let bind_addr = config.bind_addr();
    let state = AppState::new(config, Arc::new(storage));
    let router = create_router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", bind_addr);

    axum::serve(listener, router).await?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
