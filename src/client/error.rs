use std::path::PathBuf;

use reqwest::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;

/// Everything that can go wrong talking to the Hopsworks REST API.
#[derive(Debug, Error)]
pub enum RestApiError {
    #[error("failed to send {method} request to {url}: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-success status.
    #[error(
        "{method} {url} returned {status}. Server response: error code: {}, error msg: {error_msg}, user msg: {user_msg}",
        .error_code.map(|c| c.to_string()).unwrap_or_default()
    )]
    Response {
        method: Method,
        url: String,
        status: StatusCode,
        error_code: Option<i64>,
        error_msg: String,
        user_msg: String,
    },

    #[error("failed to decode response of {method} {url}: {reason}")]
    Decode {
        method: Method,
        url: String,
        reason: String,
    },

    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RestApiError {
    /// Build a `Response` error, picking the backend's error fields out of the body if present.
    pub(crate) fn from_response(method: Method, url: String, status: StatusCode, body: &str) -> Self {
        let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
        let field = |name: &str| {
            parsed
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        RestApiError::Response {
            method,
            url,
            status,
            error_code: parsed.get("errorCode").and_then(Value::as_i64),
            error_msg: field("errorMsg"),
            user_msg: field("usrMsg"),
        }
    }

    /// HTTP status of a backend rejection, if that is what this error is.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RestApiError::Response { status, .. } => Some(*status),
            _ => None,
        }
    }
}
