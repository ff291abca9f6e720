//! Client for the prompt-oriented generation API

use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

use super::{build_agent, check_response, decode_json, join_url, with_bearer, ApiError, ApiResult};
use crate::config::Settings;

const CONTEXT: &str = "Error sending request to Claude API";

pub struct ClaudeClient {
    base_url: String,
    api_key: Option<String>,
    agent: ureq::Agent,
}

impl ClaudeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        ClaudeClient {
            base_url: base_url.into(),
            api_key: None,
            agent: build_agent(Duration::from_secs(30)),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let client = Self::new(settings.claude_base_url.clone()).with_timeout(settings.request_timeout());
        match &settings.claude_api_key {
            Some(key) => client.with_api_key(key.clone()),
            None => client,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST the prompt to `{base}/generate` and return the decoded body as-is
    pub fn send_request(&self, prompt: &str) -> ApiResult<Value> {
        let url = join_url(&self.base_url, "generate");
        debug!(%url, prompt_len = prompt.len(), "sending prompt");

        let request = with_bearer(self.agent.post(&url), self.api_key.as_deref());
        let resp = check_response(request.send_json(json!({ "prompt": prompt })), CONTEXT)?;
        decode_json(resp, CONTEXT)
    }

    /// Send a prompt and extract the `response` string from the reply
    ///
    /// A reply without a string `response` field is a
    /// [`ApiError::MalformedResponse`].
    pub fn get_response(&self, prompt: &str) -> ApiResult<String> {
        let data = self.send_request(prompt)?;
        extract_response(&data)
    }
}

fn extract_response(data: &Value) -> ApiResult<String> {
    match data.get("response") {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => {
            error!(kind = json_kind(other), "{}: `response` is not a string", CONTEXT);
            Err(ApiError::MalformedResponse(format!(
                "`response` field is {}, expected string",
                json_kind(other)
            )))
        }
        None => {
            error!("{}: `response` field missing", CONTEXT);
            Err(ApiError::MalformedResponse("missing `response` field".to_string()))
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
