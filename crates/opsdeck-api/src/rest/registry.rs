//! Registry push webhook
//!
//! A container-registry push notification names the repository that
//! changed; the handler maps it to a namespace and deployment and asks
//! the cluster to roll the new image out.

use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::info;

use opsdeck_cluster::ClusterClient;
use opsdeck_common::error::{ClusterError, Error};

use super::error::{ApiError, ApiResult};

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/update-deployment", web::post().to(update_deployment));
}

/// Registry push notification body.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub action: String,
    pub target: PushTarget,
    pub request: PushRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushTarget {
    #[serde(default, rename = "mediaType")]
    pub media_type: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub length: i64,
    pub repository: String,
    pub tag: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushRequest {
    #[serde(default)]
    pub id: String,
    pub host: String,
    #[serde(default)]
    pub method: String,
    #[serde(default, rename = "useragent")]
    pub user_agent: String,
}

/// Where a push event should be deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployTarget {
    pub namespace: String,
    pub deployment: String,
    pub image: String,
}

impl DeployTarget {
    /// Derive the target from the repository path. A two-segment
    /// repository (`ns/app`) uses its first segment as the namespace; a
    /// longer one (`registry/ns/app...`) uses the second, with any
    /// remaining slashes in the deployment name collapsed to `-`.
    pub fn from_event(event: &PushEvent) -> Result<Self, ClusterError> {
        let repository = event.target.repository.as_str();
        let image = format!("{}/{}:{}", event.request.host, repository, event.target.tag);

        let mut segments = repository.splitn(3, '/');
        let (namespace, deployment) =
            match (segments.next(), segments.next(), segments.next()) {
                (Some(namespace), Some(name), None) if !namespace.is_empty() => {
                    (namespace, name.to_string())
                }
                (Some(_registry), Some(namespace), Some(name)) if !namespace.is_empty() => {
                    (namespace, name.replace('/', "-"))
                }
                _ => return Err(ClusterError::BadWebhook(repository.to_string())),
            };

        if deployment.is_empty() {
            return Err(ClusterError::BadWebhook(repository.to_string()));
        }

        Ok(Self {
            namespace: namespace.to_string(),
            deployment,
            image,
        })
    }
}

async fn update_deployment(
    event: web::Json<PushEvent>,
    cluster: web::Data<Arc<dyn ClusterClient>>,
) -> ApiResult<HttpResponse> {
    info!(
        repository = %event.target.repository,
        tag = %event.target.tag,
        action = %event.action,
        "registry push received"
    );

    let target = DeployTarget::from_event(&event)
        .map_err(|e| ApiError::from(Error::Cluster(e)))?;

    cluster
        .update_workload_image(&target.namespace, &target.deployment, &target.image)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "deployment updated" })))
}
