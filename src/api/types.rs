//! API request and response types.

use serde::{Deserialize, Serialize};

use crate::executor::ActionResult;

/// Body of a POST action request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Tokens to run, in order
    #[serde(rename = "action-sequence", default)]
    pub action_sequence: Vec<String>,

    /// Accepted for compatibility; results are always returned inline
    #[serde(rename = "callback-url", default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

/// Outcome of one action as returned over HTTP. `error` is empty on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    /// Action token
    pub action: String,
    /// Boolean outcome
    pub status: bool,
    /// Message or screenshot reference
    pub message: String,
    /// Error text, empty when the action succeeded
    pub error: String,
}

impl From<&ActionResult> for ActionResponse {
    fn from(result: &ActionResult) -> Self {
        Self {
            action: result.action.clone(),
            status: result.status,
            message: result.message.clone(),
            error: result
                .error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }
}

/// Body of a request-level error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` while serving
    pub status: String,
    /// Crate version
    pub version: String,
    /// Seconds since start
    pub uptime_secs: u64,
}
