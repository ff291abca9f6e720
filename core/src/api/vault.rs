//! Client for the note vault's local REST API

use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{build_agent, check_response, join_url, status_error, with_bearer, ApiError, ApiResult};
use crate::config::Settings;

const PUT_CONTEXT: &str = "Error writing note to vault";
const LIST_CONTEXT: &str = "Error listing vault notes";

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    files: Vec<String>,
}

pub struct VaultClient {
    base_url: String,
    api_key: Option<String>,
    agent: ureq::Agent,
}

impl VaultClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        VaultClient {
            base_url: base_url.into(),
            api_key,
            agent: build_agent(Duration::from_secs(30)),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let mut client = Self::new(settings.vault_base_url.clone(), settings.vault_api_key.clone());
        client.agent = build_agent(settings.request_timeout());
        client
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create or overwrite the note at `path` with markdown content
    ///
    /// Returns the HTTP status on 200, 201 or 204.
    pub fn put_note(&self, path: &str, markdown: &str) -> ApiResult<u16> {
        let url = join_url(&self.base_url, &format!("vault/{}", path.trim_start_matches('/')));
        debug!(%url, bytes = markdown.len(), "writing note");

        let request = with_bearer(self.agent.put(&url), self.api_key.as_deref())
            .set("Content-Type", "text/markdown");
        let resp = check_response(request.send_string(markdown), PUT_CONTEXT)?;

        match resp.status() {
            status @ (200 | 201 | 204) => {
                info!(path, status, "note written");
                Ok(status)
            }
            _ => Err(status_error(&resp, PUT_CONTEXT)),
        }
    }

    /// List the entries of a vault folder
    ///
    /// A remote rejection yields an empty list; transport failures propagate.
    pub fn list_notes(&self, folder: &str) -> ApiResult<Vec<String>> {
        let folder = folder.trim_matches('/');
        let url = join_url(&self.base_url, &format!("vault/{}/", folder));
        debug!(%url, "listing notes");

        let request = with_bearer(self.agent.get(&url), self.api_key.as_deref())
            .set("Content-Type", "application/json");
        let resp = match request.call() {
            Ok(resp) if resp.status() == 200 => resp,
            Ok(resp) | Err(ureq::Error::Status(_, resp)) => {
                debug!(status = resp.status(), folder, "folder not listable, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => {
                error!(error = %e, "{}", LIST_CONTEXT);
                return Err(ApiError::Transport(e.to_string()));
            }
        };

        let list: ListResponse = resp
            .into_json()
            .map_err(|e| ApiError::MalformedResponse(e.to_string()))?;
        Ok(list.files)
    }
}

/// Title for a note created from a recording: `YYYY-MM-DD - <file stem>`
pub fn note_title(date: NaiveDate, filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    format!("{} - {}", date.format("%Y-%m-%d"), stem)
}
