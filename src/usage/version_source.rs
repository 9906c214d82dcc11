use std::sync::Arc;

use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::client::RestClient;

/// Something that can tell which version of a backend component is running.
#[async_trait::async_trait]
pub trait VersionSource: Send + Sync {
    fn get_name(&self) -> &str;
    async fn get_version(&self, software: &str) -> Result<String, String>;
}

/// Both backend lookups, in the order they are tried.
pub fn default_version_sources(client: Arc<RestClient>) -> Vec<Box<dyn VersionSource>> {
    vec![
        Box::new(VersionsEndpoint::new(client.clone())) as Box<dyn VersionSource>,
        Box::new(VariableEndpoint::new(client)),
    ]
}

fn validate(software: &str, version: &str) -> Result<String, String> {
    semver::Version::parse(version)
        .map(|_| version.to_string())
        .map_err(|e| format!("'{}' is not a valid {} version: {}", version, software, e))
}

#[derive(Deserialize)]
struct SoftwareVersion {
    software: String,
    version: String,
}

/// `GET variables/versions`: the list of installed components and their versions.
pub struct VersionsEndpoint {
    client: Arc<RestClient>,
}

impl VersionsEndpoint {
    pub fn new(client: Arc<RestClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl VersionSource for VersionsEndpoint {
    fn get_name(&self) -> &str {
        "variables/versions"
    }

    async fn get_version(&self, software: &str) -> Result<String, String> {
        let body = self
            .client
            .send_request(Method::GET, &["variables", "versions"], &[], None)
            .await
            .map_err(|e| e.to_string())?;
        let versions: Vec<SoftwareVersion> =
            serde_json::from_value(body).map_err(|e| format!("Error parsing versions: {}", e))?;

        let found = versions
            .into_iter()
            .find(|v| v.software == software)
            .ok_or_else(|| format!("No version reported for '{}'", software))?;
        debug!("{} reports {} {}", self.get_name(), software, found.version);
        validate(software, &found.version)
    }
}

/// `GET variables/{software}_version`: a single backend variable.
pub struct VariableEndpoint {
    client: Arc<RestClient>,
}

impl VariableEndpoint {
    pub fn new(client: Arc<RestClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl VersionSource for VariableEndpoint {
    fn get_name(&self) -> &str {
        "variables/{software}_version"
    }

    async fn get_version(&self, software: &str) -> Result<String, String> {
        let variable = format!("{}_version", software);
        let body = self
            .client
            .send_request(Method::GET, &["variables", &variable], &[], None)
            .await
            .map_err(|e| e.to_string())?;
        let version = body
            .get("successMessage")
            .and_then(Value::as_str)
            .ok_or_else(|| format!("Variable '{}' has no value", variable))?;
        validate(software, version)
    }
}
