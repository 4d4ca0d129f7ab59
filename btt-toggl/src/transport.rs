//! Transport seam between the reconciler and the Toggl API.
//!
//! The reconciler only needs four verbs that take a path relative to the API
//! base and return parsed JSON. The production implementation lives in
//! [`crate::toggl`]; tests use the recording fake below.

use serde_json::Value;

/// Custom error type for Toggl API operations.
#[derive(Debug, thiserror::Error)]
pub enum TogglError {
    #[error("Could not reach Toggl: {0}")]
    Connectivity(String),
    #[error("Authentication failed (401/403). Check api_token")]
    AuthFailed,
    #[error("Resource not found (404): {0}")]
    NotFound(String),
    #[error("Toggl API error (HTTP {status}): {message}")]
    HttpError { status: u16, message: String },
    #[error("Failed to decode Toggl response for {path}: {message}")]
    Decode { path: String, message: String },
    #[error("Failed to initialise HTTP client: {0}")]
    Client(String),
}

impl TogglError {
    /// Remote unreachable or timed out.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, TogglError::Connectivity(_))
    }
}

/// True when `err` (anywhere in its chain) is a connectivity failure.
pub fn is_connectivity_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<TogglError>()
            .map_or(false, TogglError::is_connectivity)
    })
}

/// Authenticated JSON requests against the Toggl API.
pub trait Transport {
    fn get(&self, path: &str) -> Result<Value, TogglError>;
    fn post(&self, path: &str, body: &Value) -> Result<Value, TogglError>;
    fn put(&self, path: &str, body: Option<&Value>) -> Result<Value, TogglError>;
    fn patch(&self, path: &str, body: Option<&Value>) -> Result<Value, TogglError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, path: &str) -> Result<Value, TogglError> {
        (**self).get(path)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value, TogglError> {
        (**self).post(path, body)
    }

    fn put(&self, path: &str, body: Option<&Value>) -> Result<Value, TogglError> {
        (**self).put(path, body)
    }

    fn patch(&self, path: &str, body: Option<&Value>) -> Result<Value, TogglError> {
        (**self).patch(path, body)
    }
}
