//! Cluster API client

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;
use tracing::{info, warn};

use opsdeck_common::config::ClusterConfig;
use opsdeck_common::error::{ClusterError, Error, Result};
use opsdeck_common::metrics;

use crate::workload::{condense_pod_list, LogOptions, WorkloadStatus};

/// Streamed log chunks from a followed pod.
pub type LogChunkStream = BoxStream<'static, std::result::Result<Bytes, ClusterError>>;

/// Workload cluster operations used by the dashboard.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Condensed statuses of every pod in the namespace.
    async fn list_workloads(&self, namespace: &str) -> Result<Vec<WorkloadStatus>>;

    /// Collected pod logs.
    async fn workload_logs(
        &self,
        namespace: &str,
        pod: &str,
        options: &LogOptions,
    ) -> Result<String>;

    /// Live pod log stream; ends when the cluster closes the connection
    /// or the caller drops the stream.
    async fn follow_workload_logs(
        &self,
        namespace: &str,
        pod: &str,
        options: &LogOptions,
    ) -> Result<LogChunkStream>;

    /// Rewrite the first container image of a deployment, reverting to
    /// the previous image on a failed update.
    async fn update_workload_image(
        &self,
        namespace: &str,
        deployment: &str,
        image: &str,
    ) -> Result<()>;
}

/// Production client speaking HTTPS+JSON to the cluster API server.
pub struct KubeApiClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl KubeApiClient {
    /// Build a client from configuration, falling back to the in-cluster
    /// service environment and mounted service-account token.
    pub fn from_config(config: &ClusterConfig) -> Result<Self> {
        let base_url = config
            .endpoint
            .clone()
            .or_else(in_cluster_endpoint)
            .ok_or_else(|| Error::Config("no cluster endpoint configured".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let token = match &config.token {
            Some(token) => token.clone(),
            None => std::fs::read_to_string(&config.token_path)
                .map_err(|e| {
                    Error::Config(format!(
                        "failed to read service-account token {}: {e}",
                        config.token_path
                    ))
                })?
                .trim()
                .to_string(),
        };

        let mut builder = reqwest::Client::builder();
        if let Some(ca_path) = &config.ca_path {
            let pem = std::fs::read(ca_path)?;
            let certificate = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| Error::Config(format!("invalid cluster CA bundle: {e}")))?;
            builder = builder.add_root_certificate(certificate);
        }
        if config.accept_invalid_certs {
            warn!("cluster TLS verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build cluster http client: {e}")))?;

        Ok(Self {
            base_url,
            token,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ClusterError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClusterError::Api {
                status: status.as_u16(),
                message,
            }
            .into());
        }
        Ok(response)
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let response = self.send(self.client.get(self.url(path))).await?;
        response
            .json()
            .await
            .map_err(|e| ClusterError::Malformed(e.to_string()).into())
    }

    async fn put_json(&self, path: &str, body: &Value) -> Result<()> {
        self.send(self.client.put(self.url(path)).json(body)).await?;
        Ok(())
    }
}

#[async_trait]
impl ClusterClient for KubeApiClient {
    async fn list_workloads(&self, namespace: &str) -> Result<Vec<WorkloadStatus>> {
        let list = self
            .get_json(&format!("/api/v1/namespaces/{namespace}/pods"))
            .await?;
        Ok(condense_pod_list(&list))
    }

    async fn workload_logs(
        &self,
        namespace: &str,
        pod: &str,
        options: &LogOptions,
    ) -> Result<String> {
        let response = self
            .send(
                self.client
                    .get(self.url(&format!("/api/v1/namespaces/{namespace}/pods/{pod}/log")))
                    .query(&options.to_query()),
            )
            .await?;
        response
            .text()
            .await
            .map_err(|e| ClusterError::Transport(e.to_string()).into())
    }

    async fn follow_workload_logs(
        &self,
        namespace: &str,
        pod: &str,
        options: &LogOptions,
    ) -> Result<LogChunkStream> {
        let response = self
            .send(
                self.client
                    .get(self.url(&format!("/api/v1/namespaces/{namespace}/pods/{pod}/log")))
                    .query(&options.to_query()),
            )
            .await?;

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ClusterError::Transport(e.to_string())));
        Ok(stream.boxed())
    }

    async fn update_workload_image(
        &self,
        namespace: &str,
        deployment: &str,
        image: &str,
    ) -> Result<()> {
        let path = format!("/apis/apps/v1/namespaces/{namespace}/deployments/{deployment}");
        let mut manifest = self.get_json(&path).await?;
        let original = swap_first_container_image(&mut manifest, image)?;

        info!(namespace, deployment, image, %original, "updating deployment image");
        match self.put_json(&path, &manifest).await {
            Ok(()) => {
                metrics::record_image_update(true);
                Ok(())
            }
            Err(update_err) => {
                metrics::record_image_update(false);
                warn!(namespace, deployment, error = %update_err, "image update failed, reverting");
                swap_first_container_image(&mut manifest, &original)?;
                match self.put_json(&path, &manifest).await {
                    Ok(()) => {
                        Err(ClusterError::UpdateReverted(update_err.to_string()).into())
                    }
                    Err(revert_err) => Err(ClusterError::RevertFailed {
                        update: update_err.to_string(),
                        revert: revert_err.to_string(),
                    }
                    .into()),
                }
            }
        }
    }
}

fn in_cluster_endpoint() -> Option<String> {
    let host = std::env::var("KUBERNETES_SERVICE_HOST").ok()?;
    let port = std::env::var("KUBERNETES_SERVICE_PORT").ok()?;
    Some(format!("https://{host}:{port}"))
}

/// Swap the first container image of a deployment manifest in place,
/// returning the previous image.
fn swap_first_container_image(
    manifest: &mut Value,
    image: &str,
) -> std::result::Result<String, ClusterError> {
    let slot = manifest
        .pointer_mut("/spec/template/spec/containers/0/image")
        .ok_or_else(|| {
            ClusterError::Malformed("deployment has no container image".to_string())
        })?;
    let original = slot
        .as_str()
        .ok_or_else(|| ClusterError::Malformed("container image is not a string".to_string()))?
        .to_string();
    *slot = Value::String(image.to_string());
    Ok(original)
}
