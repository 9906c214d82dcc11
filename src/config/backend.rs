use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where the Hopsworks REST API lives and how to authenticate against it.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct BackendConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Project used when `Connection::get_project` is called without a name.
    pub project: Option<String>,
    pub api_key_value: Option<String>,
    pub api_key_file: Option<PathBuf>,
    /// Root folder for materialized project certificates.
    #[serde(default = "default_cert_folder")]
    pub cert_folder: PathBuf,
    #[serde(default)]
    pub hostname_verification: bool,
    /// PEM bundle added to the trusted roots.
    pub trust_store_path: Option<PathBuf>,
}

fn default_port() -> u16 {
    443
}

fn default_cert_folder() -> PathBuf {
    PathBuf::from("/tmp")
}

impl BackendConfig {
    /// Base URL of the REST API, always ending in a slash.
    pub fn base_url(&self) -> String {
        format!("https://{}:{}/hopsworks-api/api/", self.host, self.port)
    }
}
