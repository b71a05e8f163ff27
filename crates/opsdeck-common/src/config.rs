//! Configuration management for Opsdeck

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Main configuration structure for Opsdeck
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Security configuration
    #[serde(default)]
    pub security: SecurityConfig,

    /// Object store configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Telemetry pipeline configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Relational database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Workload cluster configuration
    #[serde(default)]
    pub cluster: ClusterConfig,
}

impl Config {
    /// Load configuration from a TOML/JSON file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

        let config: Config = if path.as_ref().extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse TOML config: {e}")))?
        } else {
            serde_json::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse JSON config: {e}")))?
        };

        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Number of worker threads
    pub workers: usize,
    /// CORS allowed origins
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            workers: 4,
            cors_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Shared secret used to sign and validate HS256 bearer tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
}

fn default_jwt_secret() -> String {
    std::env::var("OPSDECK_JWT_SECRET").unwrap_or_default()
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage account name
    #[serde(default = "default_storage_account")]
    pub account: String,
    /// Shared access key, base64-encoded
    #[serde(default = "default_storage_key")]
    pub access_key: String,
    /// Service endpoint override; defaults to the account's public blob endpoint
    pub endpoint: Option<String>,
    /// Storage REST API version header
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

fn default_storage_account() -> String {
    std::env::var("OPSDECK_STORAGE_ACCOUNT").unwrap_or_default()
}

fn default_storage_key() -> String {
    std::env::var("OPSDECK_STORAGE_KEY").unwrap_or_default()
}

fn default_api_version() -> String {
    "2021-08-06".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            account: default_storage_account(),
            access_key: default_storage_key(),
            endpoint: None,
            api_version: default_api_version(),
        }
    }
}

impl StorageConfig {
    /// Resolved service endpoint without a trailing slash
    #[must_use]
    pub fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}.blob.core.windows.net", self.account))
            .trim_end_matches('/')
            .to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Resource scope baked into every partition path
    pub resource_scope: String,
    /// Earliest queryable instant; callers clamp range starts to this floor
    #[serde(default = "default_retention_floor")]
    pub retention_floor: DateTime<Utc>,
    /// Maximum in-flight partition fetches per range query (0 = unbounded)
    pub max_concurrent_fetches: usize,
}

fn default_retention_floor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            resource_scope: String::new(),
            retention_floor: default_retention_floor(),
            max_concurrent_fetches: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Connection pool size
    pub max_connections: u32,
}

fn default_database_url() -> String {
    std::env::var("OPSDECK_DATABASE_URL").unwrap_or_default()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// API server endpoint; defaults to the in-cluster service environment
    pub endpoint: Option<String>,
    /// Bearer token; defaults to the mounted service-account token
    pub token: Option<String>,
    /// Path to the mounted service-account token
    #[serde(default = "default_token_path")]
    pub token_path: String,
    /// PEM bundle for the API server certificate
    pub ca_path: Option<String>,
    /// Skip TLS verification of the API server
    pub accept_invalid_certs: bool,
}

fn default_token_path() -> String {
    "/var/run/secrets/kubernetes.io/serviceaccount/token".to_string()
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            token_path: default_token_path(),
            ca_path: None,
            accept_invalid_certs: false,
        }
    }
}
