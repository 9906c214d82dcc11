#![allow(dead_code)]

use std::path::Path;

use hopsworks_sdk::client::RestClient;
use hopsworks_sdk::config::{load_config_str, ConfigV1, UsageConfig};
use hopsworks_sdk::connection::Connection;
use mockito::ServerGuard;

pub const USAGE_PATH: &str = "/hopsworks/usage";

pub fn test_config(cert_folder: &Path, usage_dir: &Path) -> ConfigV1 {
    let yaml = format!(
        r#"
version: "1.0.0"
backend:
  host: "hopsworks.local"
  project: "demo"
  api_key_value: "integration-key"
  cert_folder: "{}"
usage:
  enabled: true
  dir: "{}"
"#,
        cert_folder.display(),
        usage_dir.display()
    );
    load_config_str(&yaml).expect("Failed to parse test config YAML")
}

/// A connection whose REST calls and usage records both go to `server`.
pub fn connect_to(server: &ServerGuard, config: &ConfigV1) -> Connection {
    let client = RestClient::with_base_url(&config.backend, &server.url())
        .expect("failed to build rest client");
    let usage = UsageConfig {
        endpoint: format!("{}{}", server.url(), USAGE_PATH),
        ..config.usage.clone()
    };
    Connection::from_client(client, &config.backend, usage)
}
