//! Server orchestration

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use opsdeck_api::RestServer;
use opsdeck_cluster::{ClusterClient, KubeApiClient};
use opsdeck_common::config::Config;
use opsdeck_security::JwtAuth;
use opsdeck_telemetry::{BlobStore, ObjectStore, StoreTelemetryRepository, TelemetryRepository};

/// Main Opsdeck server wiring all components together
pub struct AppServer {
    config: Config,
    rest: RestServer,
}

impl AppServer {
    pub async fn new(config: Config) -> Result<Self> {
        info!("Initializing Opsdeck components...");

        let auth = JwtAuth::new(&config.security.jwt_secret)?;

        let store: Arc<dyn ObjectStore> = Arc::new(BlobStore::new(&config.storage)?);
        let mut repository =
            StoreTelemetryRepository::new(Arc::clone(&store), &config.telemetry);

        if config.database.url.is_empty() {
            warn!("no database url configured; sql text lookups are disabled");
        } else {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .connect(&config.database.url)
                .await?;
            info!("Successfully connected to the database");
            repository = repository.with_database(pool);
        }
        let repository: Arc<dyn TelemetryRepository> = Arc::new(repository);

        let cluster: Arc<dyn ClusterClient> =
            Arc::new(KubeApiClient::from_config(&config.cluster)?);

        let rest = RestServer::new(
            &config.server,
            &config.telemetry,
            repository,
            cluster,
            auth,
        );

        info!("Opsdeck initialization complete");
        Ok(Self { config, rest })
    }

    /// Run until the HTTP server stops; actix handles the shutdown signal
    /// and drains in-flight requests.
    pub async fn run(&self) -> Result<()> {
        info!(
            "Serving dashboard API on http://{}:{}",
            self.config.server.host, self.config.server.port
        );
        self.rest.run().await?;
        info!("Shutdown complete");
        Ok(())
    }
}
