//! Client for the endpoint-oriented recording API

use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{build_agent, check_response, decode_json, join_url, with_bearer, ApiResult};
use crate::config::Settings;

const FETCH_CONTEXT: &str = "Error fetching data from Plaud API";
const SEND_CONTEXT: &str = "Error sending request to Plaud API";

/// Per-call options for [`PlaudClient::fetch`]
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        RequestOptions {
            method: "GET".to_string(),
            headers: Vec::new(),
            body: None,
        }
    }
}

impl RequestOptions {
    pub fn method(method: impl Into<String>) -> Self {
        RequestOptions {
            method: method.into(),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

pub struct PlaudClient {
    base_url: String,
    api_key: Option<String>,
    agent: ureq::Agent,
}

impl PlaudClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        PlaudClient {
            base_url: base_url.into(),
            api_key: None,
            agent: build_agent(Duration::from_secs(30)),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let client = Self::new(settings.plaud_base_url.clone()).with_timeout(settings.request_timeout());
        match &settings.plaud_api_key {
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

    /// Request `{base}/{endpoint}` with the method in `options`
    pub fn fetch(&self, endpoint: &str, options: &RequestOptions) -> ApiResult<Value> {
        let url = join_url(&self.base_url, endpoint);
        debug!(%url, method = %options.method, "fetching");

        let mut request = with_bearer(
            self.agent.request(&options.method.to_uppercase(), &url),
            self.api_key.as_deref(),
        );
        for (name, value) in &options.headers {
            request = request.set(name, value);
        }

        let result = match &options.body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };
        let resp = check_response(result, FETCH_CONTEXT)?;
        decode_json(resp, FETCH_CONTEXT)
    }

    /// POST `payload` as JSON to `{base}/{endpoint}`
    pub fn send(&self, endpoint: &str, payload: &Value) -> ApiResult<Value> {
        let url = join_url(&self.base_url, endpoint);
        debug!(%url, "sending");

        let request = with_bearer(self.agent.post(&url), self.api_key.as_deref())
            .set("Content-Type", "application/json");
        let resp = check_response(request.send_json(payload), SEND_CONTEXT)?;
        decode_json(resp, SEND_CONTEXT)
    }
}
