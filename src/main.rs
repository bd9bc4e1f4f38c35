use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use uptime_monitor::auth::{CredentialHasher, SystemClock, TokenAuthority};
use uptime_monitor::configuration::{get_configuration, StorageBackend};
use uptime_monitor::startup::{run, spawn_revocation_purge};
use uptime_monitor::store::{DocumentStore, FileStore, MemoryStore};
use uptime_monitor::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry("info");

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!(
                environment = config.application.environment.as_str(),
                "Configuration loaded successfully"
            );
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let store: Arc<dyn DocumentStore> = match configuration.storage.backend {
        StorageBackend::File => {
            tracing::info!(base_dir = %configuration.storage.base_dir, "Using file store");
            Arc::new(FileStore::new(&configuration.storage.base_dir))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory store, data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    let auth = configuration.auth.clone();
    let hasher = CredentialHasher::new(&auth.hashing_secret);
    let authority = TokenAuthority::new(auth.clone(), store.clone(), Arc::new(SystemClock));

    spawn_revocation_purge(
        authority.clone(),
        Duration::from_secs(auth.revocation_purge_interval_seconds),
    );

    let address = configuration.application.address();
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, store, authority, hasher)?;
    server.await
}
