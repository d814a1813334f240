//! Line-delimited JSON TCP server for the slot arena.

use arena_server::config::Config;
use arena_server::server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    info!(
        "starting arena-server on {}:{} (max_clients = {}, data_dir = {})",
        config.bind_addr,
        config.port,
        config.max_clients,
        config.data_dir.display()
    );

    server::run(config).await
}
