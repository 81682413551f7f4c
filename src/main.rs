use anyhow::Result;
use elektra::coordinator::PollCoordinator;
use elektra::ostrom::{Credentials, OstromClient};
use elektra::series::PriceSeriesStore;
use elektra::web::{self, AppState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = elektra::Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    elektra::logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Elektra {} starting up for ZIP {}",
        env!("APP_VERSION"),
        config.ostrom.zip_code
    );

    let credentials = Credentials {
        client_id: config.ostrom.client_id.clone(),
        client_secret: config.ostrom.client_secret.clone(),
        zip_code: config.ostrom.zip_code.clone(),
    };
    let client = OstromClient::new(
        credentials,
        config.ostrom.base_url.clone(),
        config.ostrom.auth_url.clone(),
        Duration::from_secs(config.polling.request_timeout_secs),
    )
    .map_err(|e| anyhow::anyhow!("Failed to create Ostrom client: {}", e))?;

    let tz = config.tz().map_err(|e| anyhow::anyhow!("{}", e))?;
    let store = Arc::new(RwLock::new(PriceSeriesStore::new(tz)));
    let mut coordinator =
        PollCoordinator::new(Box::new(client), store.clone(), config.polling.clone());

    // Spawn the web server over the published snapshot
    let state = AppState {
        snapshot_rx: coordinator.subscribe(),
        store,
        config: Arc::new(config.clone()),
    };
    let web_host = config.web.host.clone();
    let web_port = config.web.port;
    let web_task = tokio::spawn(async move {
        if let Err(e) = web::serve(state, &web_host, web_port).await {
            error!("Web server error: {}", e);
        }
    });

    // Translate Ctrl-C into a coordinator shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let result = coordinator.run(shutdown_rx).await;
    web_task.abort();
    match result {
        Ok(()) => {
            info!("Shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("Coordinator failed with error: {}", e);
            Err(anyhow::anyhow!("Coordinator error: {}", e))
        }
    }
}
