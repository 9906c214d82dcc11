use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Environment flag gating usage telemetry. Anything but "true" disables it.
pub const USAGE_ENABLED_ENV_VAR: &str = "ENABLE_HOPSWORKS_USAGE";

/// Collection endpoint for usage records.
pub const USAGE_ENDPOINT: &str =
    "https://a2816e8b28.execute-api.us-east-2.amazonaws.com/hopsworks/usage";

/// Usage telemetry settings.
///
/// `enabled` can only narrow what `ENABLE_HOPSWORKS_USAGE` allows: an opt-out in
/// the environment wins over `enabled: true` in the config file.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct UsageConfig {
    #[serde(default = "enabled_from_env")]
    pub enabled: bool,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Directory holding the anonymous `user_id` file.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_post_timeout")]
    pub post_timeout_in_ms: u64,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            enabled: enabled_from_env(),
            endpoint: default_endpoint(),
            dir: default_dir(),
            post_timeout_in_ms: default_post_timeout(),
        }
    }
}

/// Interprets the raw value of `ENABLE_HOPSWORKS_USAGE`; unset means enabled.
pub fn usage_enabled(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().eq_ignore_ascii_case("true"))
}

/// Usage is recorded only when both the config and the environment allow it.
pub fn usage_allowed(config_enabled: bool, env_value: Option<&str>) -> bool {
    config_enabled && usage_enabled(env_value)
}

fn enabled_from_env() -> bool {
    usage_enabled(std::env::var(USAGE_ENABLED_ENV_VAR).ok().as_deref())
}

fn default_endpoint() -> String {
    USAGE_ENDPOINT.to_string()
}

fn default_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(".hopsworks")
}

fn default_post_timeout() -> u64 {
    5000
}
