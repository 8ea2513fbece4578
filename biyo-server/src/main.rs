use anyhow::Result;
use biyo_server::ServerConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; real deployments set the variables directly.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,biyo_server=debug")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let addr = config.addr();
    info!(store = config.store.backend_name(), enforce_tenant = config.enforce_tenant, "starting");

    let ax = biyo_server::build(config)?;
    ax.listen(addr).await
}
