use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::client::{RestApiError, RestClient};
use crate::method_ref;
use crate::usage::{CallArguments, UsageRecorder};

/// Environment variable holding the project's OpenSearch endpoint URL.
pub const ELASTIC_ENDPOINT_ENV_VAR: &str = "ELASTIC_ENDPOINT";

#[derive(Debug, Error)]
pub enum OpenSearchError {
    #[error("environment variable {0} is not set")]
    MissingEndpoint(&'static str),
    #[error("invalid opensearch endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error(transparent)]
    Rest(#[from] RestApiError),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OpenSearchHost {
    pub host: String,
    pub port: u16,
}

/// Keyword arguments for an OpenSearch client constructor.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OpenSearchConfig {
    pub hosts: Vec<OpenSearchHost>,
    pub http_compress: bool,
    pub headers: BTreeMap<String, String>,
    pub use_ssl: bool,
    pub verify_certs: bool,
    pub ssl_assert_hostname: bool,
    pub ca_certs: PathBuf,
}

/// Project-scoped helpers for talking to the platform's OpenSearch.
#[derive(Debug, Clone)]
pub struct OpenSearchApi {
    project_id: i64,
    project_name: String,
    client: Arc<RestClient>,
    usage: Arc<UsageRecorder>,
    endpoint: Option<String>,
}

impl OpenSearchApi {
    pub fn new(
        project_id: i64,
        project_name: impl Into<String>,
        client: Arc<RestClient>,
        usage: Arc<UsageRecorder>,
    ) -> Self {
        Self {
            project_id,
            project_name: project_name.into(),
            client,
            usage,
            endpoint: None,
        }
    }

    /// Use `endpoint` instead of reading `ELASTIC_ENDPOINT`.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Prefixes `index` with the project name to avoid clashes between projects.
    pub fn get_project_index(&self, index: &str) -> String {
        format!("{}_{}", self.project_name, index).to_lowercase()
    }

    /// Connection settings for an OpenSearch client: host and port from the
    /// endpoint, a fresh JWT as `Authorization` header, and the project CA chain.
    pub async fn get_default_config(&self) -> Result<OpenSearchConfig, OpenSearchError> {
        self.usage
            .instrument(
                method_ref!("get_default_config"),
                CallArguments::new(),
                || self.build_default_config(),
            )
            .await
    }

    async fn build_default_config(&self) -> Result<OpenSearchConfig, OpenSearchError> {
        let url = self.opensearch_url()?;
        let host = url
            .host_str()
            .ok_or_else(|| OpenSearchError::InvalidEndpoint {
                endpoint: url.to_string(),
                reason: "no host".to_string(),
            })?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| OpenSearchError::InvalidEndpoint {
                endpoint: url.to_string(),
                reason: "no port".to_string(),
            })?;

        let token = self.get_authorization_token().await?;
        let ca_certs = self
            .client
            .ca_chain_path(self.project_id, &self.project_name)
            .await?;

        Ok(OpenSearchConfig {
            hosts: vec![OpenSearchHost { host, port }],
            http_compress: false,
            headers: BTreeMap::from([("Authorization".to_string(), token)]),
            use_ssl: true,
            verify_certs: true,
            ssl_assert_hostname: false,
            ca_certs,
        })
    }

    /// Fetches a short-lived OpenSearch JWT for the project.
    pub async fn get_authorization_token(&self) -> Result<String, RestApiError> {
        let project_id = self.project_id.to_string();
        let path = ["elastic", "jwt", project_id.as_str()];
        let body = self
            .client
            .send_request(Method::GET, &path, &[], None)
            .await?;
        debug!("Fetched OpenSearch token for project {}", self.project_id);

        body.get("token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| RestApiError::Decode {
                method: Method::GET,
                url: path.join("/"),
                reason: "missing field 'token'".to_string(),
            })
    }

    fn opensearch_url(&self) -> Result<Url, OpenSearchError> {
        let endpoint = match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => std::env::var(ELASTIC_ENDPOINT_ENV_VAR)
                .map_err(|_| OpenSearchError::MissingEndpoint(ELASTIC_ENDPOINT_ENV_VAR))?,
        };
        Url::parse(endpoint.trim()).map_err(|e| OpenSearchError::InvalidEndpoint {
            endpoint,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::test_backend;
    use crate::config::UsageConfig;
    use mockito::{Server, ServerGuard};

    fn disabled_usage() -> Arc<UsageRecorder> {
        Arc::new(UsageRecorder::new(UsageConfig {
            enabled: false,
            ..UsageConfig::default()
        }))
    }

    fn api_for(server: &ServerGuard, cert_folder: &std::path::Path, project: &str) -> OpenSearchApi {
        let mut config = test_backend("hopsworks.local");
        config.cert_folder = cert_folder.to_path_buf();
        let client = Arc::new(RestClient::with_base_url(&config, &server.url()).unwrap());
        OpenSearchApi::new(119, project, client, disabled_usage())
    }

    #[tokio::test]
    async fn test_project_index_is_prefixed_and_lowercased() {
        let server = Server::new_async().await;
        let api = api_for(&server, &std::env::temp_dir(), "MyProj");
        assert_eq!(api.get_project_index("foo"), "myproj_foo");
        assert_eq!(api.get_project_index("Logs_2024"), "myproj_logs_2024");
    }

    #[tokio::test]
    async fn test_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = Server::new_async().await;
        let jwt = server
            .mock("GET", "/elastic/jwt/119")
            .with_status(200)
            .with_body(r#"{"token": "Bearer eyJhbGciOi"}"#)
            .create_async()
            .await;
        let credentials = server
            .mock("GET", "/project/119/credentials")
            .with_status(200)
            .with_body(r#"{"caChain": "pem"}"#)
            .create_async()
            .await;

        let api = api_for(&server, dir.path(), "demo").with_endpoint("https://10.0.2.15:9200");
        let config = api.get_default_config().await.unwrap();

        jwt.assert_async().await;
        credentials.assert_async().await;
        assert_eq!(
            config.hosts,
            vec![OpenSearchHost {
                host: "10.0.2.15".to_string(),
                port: 9200
            }]
        );
        assert!(!config.http_compress);
        assert_eq!(config.headers["Authorization"], "Bearer eyJhbGciOi");
        assert!(config.use_ssl);
        assert!(config.verify_certs);
        assert!(!config.ssl_assert_hostname);
        assert_eq!(
            config.ca_certs,
            dir.path().join("hopsworks.local").join("demo").join("ca_chain.pem")
        );
    }

    #[tokio::test]
    async fn test_endpoint_without_port_uses_scheme_default() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/elastic/jwt/119")
            .with_status(200)
            .with_body(r#"{"token": "t"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/project/119/credentials")
            .with_status(200)
            .with_body(r#"{"caChain": "pem"}"#)
            .create_async()
            .await;

        let api = api_for(&server, dir.path(), "demo").with_endpoint("https://opensearch.local");
        let config = api.get_default_config().await.unwrap();
        assert_eq!(config.hosts[0].port, 443);
    }

    #[tokio::test]
    async fn test_token_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/elastic/jwt/119")
            .with_status(403)
            .with_body(r#"{"errorCode": 160000, "errorMsg": "forbidden"}"#)
            .create_async()
            .await;

        let api = api_for(&server, dir.path(), "demo").with_endpoint("https://10.0.2.15:9200");
        let err = api.get_default_config().await.unwrap_err();
        match err {
            OpenSearchError::Rest(rest) => {
                assert_eq!(rest.status(), Some(reqwest::StatusCode::FORBIDDEN))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_endpoint() {
        let server = Server::new_async().await;
        let api = api_for(&server, &std::env::temp_dir(), "demo").with_endpoint("not a url");
        let err = api.get_default_config().await.unwrap_err();
        assert!(matches!(err, OpenSearchError::InvalidEndpoint { .. }));
    }

    #[tokio::test]
    async fn test_config_serializes_with_client_keys() {
        let config = OpenSearchConfig {
            hosts: vec![OpenSearchHost {
                host: "h".to_string(),
                port: 9200,
            }],
            http_compress: false,
            headers: BTreeMap::from([("Authorization".to_string(), "t".to_string())]),
            use_ssl: true,
            verify_certs: true,
            ssl_assert_hostname: false,
            ca_certs: PathBuf::from("/tmp/ca_chain.pem"),
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["hosts"][0]["port"], 9200);
        assert_eq!(value["ca_certs"], "/tmp/ca_chain.pem");
        assert_eq!(value["ssl_assert_hostname"], false);
    }
}
