//! REST API implementation

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use tracing::info;

use opsdeck_cluster::ClusterClient;
use opsdeck_common::config::{ServerConfig, TelemetryConfig};
use opsdeck_common::error::Result;
use opsdeck_common::metrics;
use opsdeck_security::JwtAuth;
use opsdeck_telemetry::TelemetryRepository;

pub mod auth;
pub mod error;
pub mod registry;
pub mod telemetry;
pub mod workloads;

use auth::RequireAuth;

/// REST API server
#[derive(Clone)]
pub struct RestServer {
    config: ServerConfig,
    telemetry_config: TelemetryConfig,
    repository: Arc<dyn TelemetryRepository>,
    cluster: Arc<dyn ClusterClient>,
    auth: JwtAuth,
}

impl RestServer {
    /// Create a new REST server
    pub fn new(
        config: &ServerConfig,
        telemetry_config: &TelemetryConfig,
        repository: Arc<dyn TelemetryRepository>,
        cluster: Arc<dyn ClusterClient>,
        auth: JwtAuth,
    ) -> Self {
        Self {
            config: config.clone(),
            telemetry_config: telemetry_config.clone(),
            repository,
            cluster,
            auth,
        }
    }

    /// Build CORS middleware based on configuration
    fn build_cors(origins: &[String]) -> Cors {
        // Wildcard or empty list means permissive mode (development only)
        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            tracing::warn!(
                "CORS is configured with wildcard origin - not recommended for production"
            );
            return Cors::permissive();
        }

        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CONTENT_TYPE,
            ])
            .max_age(3600);

        for origin in origins {
            cors = cors.allowed_origin(origin);
        }

        cors
    }

    /// Run the REST server
    pub async fn run(&self) -> Result<()> {
        let repository = self.repository.clone();
        let cluster = self.cluster.clone();
        let auth = self.auth.clone();
        let telemetry_config = self.telemetry_config.clone();
        let cors_origins = self.config.cors_origins.clone();

        info!(
            "Starting REST API server on {}:{}",
            self.config.host, self.config.port
        );

        HttpServer::new(move || {
            let cors = Self::build_cors(&cors_origins);

            App::new()
                .app_data(web::Data::new(repository.clone()))
                .app_data(web::Data::new(cluster.clone()))
                .app_data(web::Data::new(telemetry_config.clone()))
                .wrap(cors)
                .wrap(middleware::Logger::default())
                .route("/health", web::get().to(health_check))
                .route("/metrics", web::get().to(metrics_export))
                .service(
                    web::scope("")
                        .wrap(RequireAuth::new(auth.clone()))
                        .configure(telemetry::routes)
                        .configure(workloads::routes)
                        .configure(registry::routes),
                )
        })
        .workers(self.config.workers)
        .bind((self.config.host.clone(), self.config.port))?
        .run()
        .await?;

        Ok(())
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn metrics_export() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(metrics::export_prometheus())
}
