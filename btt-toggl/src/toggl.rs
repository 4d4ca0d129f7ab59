//! Toggl Track API v9 client
//!
//! Direct reqwest HTTP calls with basic auth (`<api_token>:api_token`).
//! Each invocation of the tool performs at most a couple of requests, so the
//! client drives a single-threaded tokio runtime and exposes the blocking
//! [`Transport`] interface to the rest of the crate.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::transport::{TogglError, Transport};
use crate::types::TogglConfig;

/// Password Toggl expects when authenticating with an API token.
const TOKEN_PASSWORD: &str = "api_token";

/// Toggl REST API client.
pub struct TogglClient {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    base_url: String,
    api_token: String,
}

impl std::fmt::Debug for TogglClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TogglClient")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

impl TogglClient {
    /// Create a client from the loaded configuration.
    pub fn new(config: &TogglConfig) -> Result<Self, TogglError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| TogglError::Client(e.to_string()))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TogglError::Client(e.to_string()))?;

        Ok(Self {
            client,
            runtime,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TogglError> {
        let url = self.url(path);
        debug!("{} {}", method, url);
        self.runtime.block_on(async {
            let mut builder = self
                .client
                .request(method, &url)
                .basic_auth(&self.api_token, Some(TOKEN_PASSWORD))
                .header("Accept", "application/json");
            if let Some(body) = body {
                builder = builder.json(body);
            }
            let resp = builder.send().await.map_err(map_send_error)?;
            handle_response(resp, path).await
        })
    }
}

impl Transport for TogglClient {
    fn get(&self, path: &str) -> Result<Value, TogglError> {
        self.request(Method::GET, path, None)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value, TogglError> {
        self.request(Method::POST, path, Some(body))
    }

    fn put(&self, path: &str, body: Option<&Value>) -> Result<Value, TogglError> {
        self.request(Method::PUT, path, body)
    }

    fn patch(&self, path: &str, body: Option<&Value>) -> Result<Value, TogglError> {
        self.request(Method::PATCH, path, body)
    }
}

fn map_send_error(err: reqwest::Error) -> TogglError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        TogglError::Connectivity(err.to_string())
    } else {
        TogglError::HttpError {
            status: err.status().map_or(0, |s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

async fn handle_response(resp: reqwest::Response, path: &str) -> Result<Value, TogglError> {
    let status = resp.status();
    let body = resp.text().await.map_err(|e| {
        if e.is_timeout() {
            TogglError::Connectivity(e.to_string())
        } else {
            TogglError::Decode {
                path: path.to_string(),
                message: e.to_string(),
            }
        }
    })?;

    if status.is_success() {
        parse_body(&body, path)
    } else {
        Err(map_http_error(status, path, &body))
    }
}

/// Empty bodies and `null` both mean "nothing here".
fn parse_body(body: &str, path: &str) -> Result<Value, TogglError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| TogglError::Decode {
        path: path.to_string(),
        message: e.to_string(),
    })
}

fn map_http_error(status: StatusCode, path: &str, body: &str) -> TogglError {
    warn!(
        "Toggl API error: HTTP {} on {}: {}",
        status.as_u16(),
        path,
        body
    );
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TogglError::AuthFailed,
        StatusCode::NOT_FOUND => TogglError::NotFound(path.to_string()),
        _ => TogglError::HttpError {
            status: status.as_u16(),
            message: body.trim().to_string(),
        },
    }
}
