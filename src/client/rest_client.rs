use std::path::{Path, PathBuf};

use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde_json::Value;
use tracing::{debug, info};

use super::error::RestApiError;
use crate::config::BackendConfig;

/// Authenticated client for the Hopsworks REST API.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    host: String,
    api_key: String,
    pub(crate) cert_folder: PathBuf,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url.as_str())
            .field("host", &self.host)
            .field("api_key", &"***")
            .finish()
    }
}

impl RestClient {
    /// Creates a client for `https://{host}:{port}/hopsworks-api/api/`.
    pub fn new(config: &BackendConfig) -> Result<Self, RestApiError> {
        Self::with_base_url(config, &config.base_url())
    }

    /// Creates a client against an explicit API root, e.g. a proxy or a test server.
    pub fn with_base_url(config: &BackendConfig, base_url: &str) -> Result<Self, RestApiError> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| RestApiError::Config(format!("invalid base url '{}': {}", base, e)))?;

        let mut builder =
            reqwest::Client::builder().danger_accept_invalid_hostnames(!config.hostname_verification);
        if let Some(trust_store) = &config.trust_store_path {
            let pem = std::fs::read(trust_store).map_err(|source| RestApiError::Io {
                path: trust_store.clone(),
                source,
            })?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| RestApiError::Config(format!("invalid trust store: {}", e)))?;
            builder = builder.add_root_certificate(cert);
        }
        let http = builder
            .build()
            .map_err(|e| RestApiError::Config(format!("failed to build http client: {}", e)))?;

        info!(
            "Creating REST client for host '{}' at '{}'",
            config.host, base_url
        );
        Ok(Self {
            http,
            base_url,
            host: config.host.clone(),
            api_key: resolve_api_key(config)?,
            cert_folder: config.cert_folder.clone(),
        })
    }

    /// Configured backend hostname.
    pub fn hostname(&self) -> &str {
        &self.host
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Sends a request to `base_url/{path_params...}` and returns the decoded JSON body.
    ///
    /// Each path parameter becomes one percent-encoded URL segment. An empty
    /// response body decodes to `Value::Null`.
    pub async fn send_request(
        &self,
        method: Method,
        path_params: &[&str],
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value, RestApiError> {
        let url = self.endpoint(path_params, query)?;
        debug!("Sending {} request to {}", method, url);

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header(AUTHORIZATION, self.authorization_header()?)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|source| RestApiError::Transport {
                method: method.clone(),
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| RestApiError::Transport {
                method: method.clone(),
                url: url.to_string(),
                source,
            })?;

        if !status.is_success() {
            return Err(RestApiError::from_response(
                method,
                url.to_string(),
                status,
                &text,
            ));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| RestApiError::Decode {
            method,
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    fn endpoint(&self, path_params: &[&str], query: &[(&str, &str)]) -> Result<Url, RestApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RestApiError::Config(format!("'{}' cannot be a base url", self.base_url)))?
            .pop_if_empty()
            .extend(path_params);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn authorization_header(&self) -> Result<HeaderValue, RestApiError> {
        HeaderValue::from_str(&format!("ApiKey {}", self.api_key))
            .map_err(|_| RestApiError::Config("api key contains invalid characters".to_string()))
    }
}

/// Api key from the inline value, or else the first line of the key file.
fn resolve_api_key(config: &BackendConfig) -> Result<String, RestApiError> {
    if let Some(value) = &config.api_key_value {
        return Ok(value.trim().to_string());
    }
    match &config.api_key_file {
        Some(path) => read_api_key_file(path),
        None => Err(RestApiError::Config(
            "either api_key_value or api_key_file must be set".to_string(),
        )),
    }
}

fn read_api_key_file(path: &Path) -> Result<String, RestApiError> {
    let content = std::fs::read_to_string(path).map_err(|source| RestApiError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    content
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| RestApiError::Config(format!("api key file {} is empty", path.display())))
}
