//! Entry point of the SDK: a connection to one Hopsworks cluster.
//!
//! Opening a connection starts a new usage session for the backend host, so
//! call counts and sampling restart with every connection.

use std::sync::Arc;

use reqwest::Method;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::client::{RestApiError, RestClient};
use crate::config::{BackendConfig, ConfigV1, UsageConfig};
use crate::method_ref;
use crate::opensearch::OpenSearchApi;
use crate::usage::{default_version_sources, CallArguments, UsageRecorder};

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("no project name given and none configured")]
    NoProject,
    #[error(transparent)]
    Rest(#[from] RestApiError),
}

/// Project info as returned by `project/getProjectInfo/{name}`.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct ProjectInfo {
    project_id: i64,
    project_name: String,
}

/// A connection to a Hopsworks cluster.
#[derive(Debug, Clone)]
pub struct Connection {
    client: Arc<RestClient>,
    usage: Arc<UsageRecorder>,
    default_project: Option<String>,
}

impl Connection {
    /// Connects using the backend and usage sections of the config.
    pub fn connect(config: &ConfigV1) -> Result<Self, ConnectionError> {
        let client = RestClient::new(&config.backend)?;
        Ok(Self::from_client(client, &config.backend, config.usage.clone()))
    }

    /// Builds a connection around an existing client.
    pub fn from_client(client: RestClient, backend: &BackendConfig, usage: UsageConfig) -> Self {
        let client = Arc::new(client);
        let recorder =
            UsageRecorder::new(usage).with_version_sources(default_version_sources(client.clone()));
        recorder.init(Some(client.hostname()));
        info!(
            event_name = "connection.opened",
            event_domain = "connection",
            usage_enabled = recorder.is_enabled(),
            "Connected to Hopsworks at {}",
            client.base_url()
        );

        Self {
            client,
            usage: Arc::new(recorder),
            default_project: backend.project.clone(),
        }
    }

    pub fn client(&self) -> &Arc<RestClient> {
        &self.client
    }

    /// The usage recorder of this connection, for instrumenting calls outside the SDK.
    pub fn usage(&self) -> &Arc<UsageRecorder> {
        &self.usage
    }

    /// Looks up a project by name, or the configured project when `name` is `None`.
    pub async fn get_project(&self, name: Option<&str>) -> Result<Project, ConnectionError> {
        let name = name
            .map(str::to_string)
            .or_else(|| self.default_project.clone())
            .ok_or(ConnectionError::NoProject)?;

        self.usage
            .instrument(
                method_ref!("get_project"),
                CallArguments::new().arg(&name),
                || self.fetch_project(&name),
            )
            .await
    }

    async fn fetch_project(&self, name: &str) -> Result<Project, ConnectionError> {
        let body = self
            .client
            .send_request(Method::GET, &["project", "getProjectInfo", name], &[], None)
            .await?;
        let info: ProjectInfo =
            serde_json::from_value(body).map_err(|e| RestApiError::Decode {
                method: Method::GET,
                url: format!("project/getProjectInfo/{}", name),
                reason: e.to_string(),
            })?;
        info!("Resolved project '{}' to id {}", info.project_name, info.project_id);

        Ok(Project {
            id: info.project_id,
            name: info.project_name,
            client: self.client.clone(),
            usage: self.usage.clone(),
        })
    }
}

/// A project on the cluster: the namespace indices and tokens are scoped to.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: i64,
    pub name: String,
    client: Arc<RestClient>,
    usage: Arc<UsageRecorder>,
}

impl Project {
    pub fn get_opensearch_api(&self) -> OpenSearchApi {
        OpenSearchApi::new(
            self.id,
            self.name.clone(),
            self.client.clone(),
            self.usage.clone(),
        )
    }
}
