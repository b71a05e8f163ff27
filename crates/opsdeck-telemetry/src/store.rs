//! Object store access
//!
//! The pipeline needs a tri-state read: a partition either yields bytes,
//! does not exist (expected and silent), or fails in transit (fatal to
//! the enclosing range query). The trait models that as
//! `Ok(Some)` / `Ok(None)` / `Err`.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use opsdeck_common::config::StorageConfig;
use opsdeck_common::error::{Error, Result, TelemetryError};

type HmacSha256 = Hmac<Sha256>;

/// Read access to a named container/object path.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one object. `Ok(None)` means the object does not exist.
    async fn fetch(&self, container: &str, path: &str)
        -> std::result::Result<Option<Bytes>, TelemetryError>;
}

/// Blob storage client using SharedKey request signing.
#[derive(Debug)]
pub struct BlobStore {
    account: String,
    key: Vec<u8>,
    endpoint: String,
    api_version: String,
    client: reqwest::Client,
}

impl BlobStore {
    /// Build a client from configuration. The access key is expected
    /// base64-encoded, as issued by the storage provider.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        if config.account.is_empty() {
            return Err(Error::Config("storage account not configured".to_string()));
        }
        let key = BASE64
            .decode(&config.access_key)
            .map_err(|e| Error::Config(format!("invalid storage access key: {e}")))?;

        Ok(Self {
            account: config.account.clone(),
            key,
            endpoint: config.endpoint(),
            api_version: config.api_version.clone(),
            client: reqwest::Client::new(),
        })
    }

    fn object_url(&self, container: &str, path: &str) -> String {
        let sep = if path.starts_with('/') { "" } else { "/" };
        format!("{}/{}{}{}", self.endpoint, container, sep, path)
    }

    /// The canonicalized request layout covered by the signature: verb,
    /// eleven empty standard headers, the x-ms headers, then the resource.
    fn string_to_sign(&self, container: &str, path: &str, date: &str) -> String {
        let sep = if path.starts_with('/') { "" } else { "/" };
        let canonical_resource = format!("/{}/{}{}{}", self.account, container, sep, path);
        format!(
            "GET\n\n\n\n\n\n\n\n\n\n\n\nx-ms-date:{date}\nx-ms-version:{version}\n{canonical_resource}",
            version = self.api_version,
        )
    }

    fn sign(&self, string_to_sign: &str) -> std::result::Result<String, TelemetryError> {
        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|e| {
            TelemetryError::Transport {
                path: String::new(),
                reason: format!("unusable signing key: {e}"),
            }
        })?;
        mac.update(string_to_sign.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl ObjectStore for BlobStore {
    async fn fetch(
        &self,
        container: &str,
        path: &str,
    ) -> std::result::Result<Option<Bytes>, TelemetryError> {
        let transport = |reason: String| TelemetryError::Transport {
            path: path.to_string(),
            reason,
        };

        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let signature = self.sign(&self.string_to_sign(container, path, &date))?;

        let response = self
            .client
            .get(self.object_url(container, path))
            .header("x-ms-date", &date)
            .header("x-ms-version", &self.api_version)
            .header(
                "Authorization",
                format!("SharedKey {}:{}", self.account, signature),
            )
            .send()
            .await
            .map_err(|e| transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(transport(format!("unexpected status {status}")));
        }

        let body = response.bytes().await.map_err(|e| transport(e.to_string()))?;
        debug!(container, path, bytes = body.len(), "object fetched");
        Ok(Some(body))
    }
}

/// In-memory object store for tests and local development.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: HashMap<(String, String), Bytes>,
    failing: HashSet<(String, String)>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one object.
    pub fn insert(&mut self, container: &str, path: &str, data: impl Into<Bytes>) {
        self.objects
            .insert((container.to_string(), path.to_string()), data.into());
    }

    /// Make reads of one path fail with a transport error.
    pub fn fail(&mut self, container: &str, path: &str) {
        self.failing
            .insert((container.to_string(), path.to_string()));
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn fetch(
        &self,
        container: &str,
        path: &str,
    ) -> std::result::Result<Option<Bytes>, TelemetryError> {
        let key = (container.to_string(), path.to_string());
        if self.failing.contains(&key) {
            return Err(TelemetryError::Transport {
                path: path.to_string(),
                reason: "injected transport failure".to_string(),
            });
        }
        Ok(self.objects.get(&key).cloned())
    }
}
