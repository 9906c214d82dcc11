use std::path::PathBuf;

#[allow(unused_imports)]
use cached::proc_macro::cached;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};

use super::error::RestApiError;
use super::rest_client::RestClient;

pub const CA_CHAIN_FILE: &str = "ca_chain.pem";

impl RestClient {
    /// Path of the project's CA chain, `{cert_folder}/{host}/{project}/ca_chain.pem`.
    ///
    /// The file is checked on every call and written again when it is missing.
    /// The PEM itself is downloaded from the project credentials endpoint once
    /// per backend and project.
    pub async fn ca_chain_path(
        &self,
        project_id: i64,
        project_name: &str,
    ) -> Result<PathBuf, RestApiError> {
        let path = self
            .cert_folder
            .join(self.hostname())
            .join(project_name)
            .join(CA_CHAIN_FILE);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!("Reusing CA chain at {}", path.display());
            return Ok(path);
        }

        let ca_chain = fetch_ca_chain(self, project_id).await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| RestApiError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&path, ca_chain)
            .await
            .map_err(|source| RestApiError::Io {
                path: path.clone(),
                source,
            })?;

        info!(
            event_name = "client.credentials.materialized",
            event_domain = "client",
            project_id,
            "CA chain written to {}",
            path.display()
        );
        Ok(path)
    }
}

/// PEM of the project's CA chain. Only successes are cached.
#[cfg_attr(
    not(test),
    cached(
        result = true,
        key = "(String, i64)",
        convert = r#"{ (client.base_url().to_string(), project_id) }"#
    )
)]
async fn fetch_ca_chain(client: &RestClient, project_id: i64) -> Result<String, RestApiError> {
    let project_id = project_id.to_string();
    let credentials = client
        .send_request(
            Method::GET,
            &["project", &project_id, "credentials"],
            &[],
            None,
        )
        .await?;
    credentials
        .get("caChain")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| RestApiError::Decode {
            method: Method::GET,
            url: format!("project/{}/credentials", project_id),
            reason: "missing field 'caChain'".to_string(),
        })
}
