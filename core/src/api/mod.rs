//! Outbound API clients and shared error shaping
//!
//! Every client makes exactly one attempt per call. Failures are logged and
//! handed back to the caller classified as transport, status or malformed
//! response errors.

pub mod claude;
pub mod plaud;
pub mod vault;

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

pub use claude::ClaudeClient;
pub use plaud::{PlaudClient, RequestOptions};
pub use vault::VaultClient;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Transport(String),
    #[error("{context}: {status} {status_text}")]
    Status {
        context: String,
        status: u16,
        status_text: String,
    },
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ApiError {
    /// HTTP status of a remote rejection, if this is one
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

const USER_AGENT: &str = concat!("plaud-claude-core/", env!("CARGO_PKG_VERSION"));

pub(crate) fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

/// Join a base URL and an endpoint suffix with exactly one slash
pub(crate) fn join_url(base: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

pub(crate) fn with_bearer(request: ureq::Request, api_key: Option<&str>) -> ureq::Request {
    match api_key {
        Some(key) => request.set("Authorization", &format!("Bearer {}", key)),
        None => request,
    }
}

/// Map a ureq outcome to a response, classifying failures
pub(crate) fn check_response(
    result: Result<ureq::Response, ureq::Error>,
    context: &str,
) -> ApiResult<ureq::Response> {
    match result {
        Ok(resp) if (200..300).contains(&resp.status()) => Ok(resp),
        // ureq only errors on 4xx/5xx; anything else outside 2xx lands here
        Ok(resp) => Err(status_error(&resp, context)),
        Err(ureq::Error::Status(_, resp)) => Err(status_error(&resp, context)),
        Err(e) => {
            error!(error = %e, "{}", context);
            Err(ApiError::Transport(e.to_string()))
        }
    }
}

pub(crate) fn status_error(resp: &ureq::Response, context: &str) -> ApiError {
    let status = resp.status();
    let err = ApiError::Status {
        context: context.to_string(),
        status,
        status_text: resp.status_text().to_string(),
    };
    error!(status, "{}", err);
    err
}

/// Decode a successful response body as JSON, unchanged
pub(crate) fn decode_json(resp: ureq::Response, context: &str) -> ApiResult<Value> {
    let body = resp.into_string().map_err(|e| {
        error!(error = %e, "{}", context);
        ApiError::Transport(e.to_string())
    })?;

    serde_json::from_str(&body).map_err(|e| {
        error!(error = %e, "{}: response is not JSON", context);
        ApiError::MalformedResponse(e.to_string())
    })
}
