use carriage::config::Config;
use carriage::engine::Engine;
use carriage::error::Error;
use carriage::server::serve;
use carriage::store::{MemoryStore, PgStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load()?;
    let retry = config.retry_policy();

    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.max_connections).await?;
            serve(Engine::new(store, retry)?, config.bind_addr).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            serve(Engine::new(MemoryStore::new(), retry)?, config.bind_addr).await
        }
    }
}
