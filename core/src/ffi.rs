//! FFI boundary definitions for C interop

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::PathBuf;
use std::ptr;

use serde_json::Value;

use crate::api::{ApiError, RequestOptions};
use crate::plugin::{LifecycleState, Plugin, PluginError};
use crate::ui::{ElementId, Modal, ModalContent};

/// Opaque handle to the Rust core state
pub struct PlaudClaudeCore {
    plugin: Plugin,
    last_response: Option<CString>,
    last_error: Option<CString>,
    last_status: u16,
    pending: Vec<PathBuf>,
    last_path: Option<CString>,
}

/// Result codes
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CResultCode {
    Ok = 0,
    InvalidArgument = 1,
    InvalidState = 2,
    SettingsError = 3,
    NetworkError = 4,
    StatusError = 5,
    MalformedResponse = 6,
    InboxError = 7,
}

// Static storage for strings returned to C
// These are overwritten on each call, so C code must copy if needed
thread_local! {
    static RENDERED: std::cell::RefCell<Option<CString>> = std::cell::RefCell::new(None);
    static PREFERENCE: std::cell::RefCell<Option<CString>> = std::cell::RefCell::new(None);
}

type StringSlot = std::thread::LocalKey<std::cell::RefCell<Option<CString>>>;

fn stash(slot: &'static StringSlot, s: String) -> *const c_char {
    slot.with(|cell| {
        let cstring = CString::new(s).unwrap_or_default();
        let ptr = cstring.as_ptr();
        *cell.borrow_mut() = Some(cstring);
        ptr
    })
}

unsafe fn opt_str<'a>(s: *const c_char) -> Result<Option<&'a str>, ()> {
    if s.is_null() {
        return Ok(None);
    }
    CStr::from_ptr(s).to_str().map(Some).map_err(|_| ())
}

unsafe fn req_str<'a>(s: *const c_char) -> Option<&'a str> {
    match opt_str(s) {
        Ok(Some(s)) => Some(s),
        _ => None,
    }
}

impl PlaudClaudeCore {
    fn fail(&mut self, code: CResultCode, message: impl Into<String>) -> CResultCode {
        self.last_error = CString::new(message.into()).ok();
        code
    }

    fn plugin_error(&mut self, err: PluginError) -> CResultCode {
        let code = match &err {
            PluginError::InvalidState { .. } => CResultCode::InvalidState,
            PluginError::Settings(_) => CResultCode::SettingsError,
            PluginError::Inbox(_) => CResultCode::InboxError,
        };
        self.fail(code, err.to_string())
    }

    fn api_outcome(&mut self, result: Result<String, ApiError>) -> CResultCode {
        self.last_status = 0;
        match result {
            Ok(body) => match CString::new(body) {
                Ok(body) => {
                    self.last_response = Some(body);
                    self.last_error = None;
                    CResultCode::Ok
                }
                Err(_) => {
                    self.last_response = None;
                    self.fail(
                        CResultCode::MalformedResponse,
                        "Malformed response: reply contains a NUL byte",
                    )
                }
            },
            Err(err) => {
                self.last_response = None;
                let code = match &err {
                    ApiError::Transport(_) => CResultCode::NetworkError,
                    ApiError::Status { status, .. } => {
                        self.last_status = *status;
                        CResultCode::StatusError
                    }
                    ApiError::MalformedResponse(_) => CResultCode::MalformedResponse,
                };
                self.fail(code, err.to_string())
            }
        }
    }

    fn not_loaded(&mut self) -> CResultCode {
        self.fail(CResultCode::InvalidState, "plugin is not loaded")
    }
}

/// Install a tracing subscriber writing to stderr
///
/// The filter is read from `PLAUD_CLAUDE_LOG` (default `info`). Calling it
/// more than once is harmless.
#[no_mangle]
pub extern "C" fn plaud_claude_core_init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("PLAUD_CLAUDE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Create a new core instance
///
/// # Safety
/// `settings_path` must be a valid C string or null for the default location.
/// Returns a pointer that must be freed with `plaud_claude_core_free`, or
/// null if `settings_path` is not UTF-8.
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_new(settings_path: *const c_char) -> *mut PlaudClaudeCore {
    let path = match opt_str(settings_path) {
        Ok(p) => p,
        Err(()) => return ptr::null_mut(),
    };
    let core = Box::new(PlaudClaudeCore {
        plugin: Plugin::new(path),
        last_response: None,
        last_error: None,
        last_status: 0,
        pending: Vec::new(),
        last_path: None,
    });
    Box::into_raw(core)
}

/// Free the core instance
///
/// # Safety
/// `core` must be a valid pointer returned by `plaud_claude_core_new`
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_free(core: *mut PlaudClaudeCore) {
    if !core.is_null() {
        drop(Box::from_raw(core));
    }
}

/// Plugin load hook
///
/// # Safety
/// `core` must be valid
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_load(core: *mut PlaudClaudeCore) -> CResultCode {
    let core = match core.as_mut() {
        Some(c) => c,
        None => return CResultCode::InvalidArgument,
    };

    match core.plugin.onload() {
        Ok(()) => CResultCode::Ok,
        Err(e) => core.plugin_error(e),
    }
}

/// Plugin unload hook
///
/// # Safety
/// `core` must be valid
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_unload(core: *mut PlaudClaudeCore) -> CResultCode {
    let core = match core.as_mut() {
        Some(c) => c,
        None => return CResultCode::InvalidArgument,
    };

    core.pending.clear();
    match core.plugin.onunload() {
        Ok(()) => CResultCode::Ok,
        Err(e) => core.plugin_error(e),
    }
}

/// Get a preference as JSON text, or null if unset
///
/// # Safety
/// `core` must be valid, `key` must be a valid C string
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_get_preference(
    core: *const PlaudClaudeCore,
    key: *const c_char,
) -> *const c_char {
    let (Some(core), Some(key)) = (core.as_ref(), req_str(key)) else {
        return ptr::null();
    };

    match core.plugin.preferences().and_then(|p| p.get_preference(key)) {
        Some(value) => stash(&PREFERENCE, value.to_string()),
        None => ptr::null(),
    }
}

/// Set a preference from JSON text
///
/// # Safety
/// `core` must be valid, `key` and `json_value` must be valid C strings
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_set_preference(
    core: *mut PlaudClaudeCore,
    key: *const c_char,
    json_value: *const c_char,
) -> CResultCode {
    let core = match core.as_mut() {
        Some(c) => c,
        None => return CResultCode::InvalidArgument,
    };
    let (Some(key), Some(raw)) = (req_str(key), req_str(json_value)) else {
        return core.fail(CResultCode::InvalidArgument, "key and value are required");
    };
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => return core.fail(CResultCode::InvalidArgument, e.to_string()),
    };

    match core.plugin.preferences_mut() {
        Some(prefs) => {
            prefs.set_preference(key, value);
            CResultCode::Ok
        }
        None => core.not_loaded(),
    }
}

/// Send a prompt and keep the extracted reply for `plaud_claude_core_last_response` (blocking)
///
/// # Safety
/// `core` must be valid, `prompt` must be a valid C string
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_claude_prompt(
    core: *mut PlaudClaudeCore,
    prompt: *const c_char,
) -> CResultCode {
    let core = match core.as_mut() {
        Some(c) => c,
        None => return CResultCode::InvalidArgument,
    };
    let Some(prompt) = req_str(prompt) else {
        return core.fail(CResultCode::InvalidArgument, "prompt is required");
    };

    let result = match core.plugin.claude() {
        Some(client) => client.get_response(prompt),
        None => return core.not_loaded(),
    };
    core.api_outcome(result)
}

/// Request a Plaud endpoint and keep the JSON reply (blocking)
///
/// # Safety
/// `core` must be valid, `endpoint` must be a valid C string, `method` may be
/// null for GET
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_plaud_fetch(
    core: *mut PlaudClaudeCore,
    endpoint: *const c_char,
    method: *const c_char,
) -> CResultCode {
    let core = match core.as_mut() {
        Some(c) => c,
        None => return CResultCode::InvalidArgument,
    };
    let (Some(endpoint), Ok(method)) = (req_str(endpoint), opt_str(method)) else {
        return core.fail(CResultCode::InvalidArgument, "endpoint is required");
    };
    let options = method.map(RequestOptions::method).unwrap_or_default();

    let result = match core.plugin.plaud() {
        Some(client) => client.fetch(endpoint, &options).map(|v| v.to_string()),
        None => return core.not_loaded(),
    };
    core.api_outcome(result)
}

/// POST a JSON payload to a Plaud endpoint and keep the JSON reply (blocking)
///
/// # Safety
/// `core` must be valid, `endpoint` and `json_payload` must be valid C strings
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_plaud_send(
    core: *mut PlaudClaudeCore,
    endpoint: *const c_char,
    json_payload: *const c_char,
) -> CResultCode {
    let core = match core.as_mut() {
        Some(c) => c,
        None => return CResultCode::InvalidArgument,
    };
    let (Some(endpoint), Some(raw)) = (req_str(endpoint), req_str(json_payload)) else {
        return core.fail(CResultCode::InvalidArgument, "endpoint and payload are required");
    };
    let payload: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => return core.fail(CResultCode::InvalidArgument, e.to_string()),
    };

    let result = match core.plugin.plaud() {
        Some(client) => client.send(endpoint, &payload).map(|v| v.to_string()),
        None => return core.not_loaded(),
    };
    core.api_outcome(result)
}

/// Body of the last successful API call, null after a failure
///
/// # Safety
/// `core` must be valid. The string is valid until the next API call.
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_last_response(core: *const PlaudClaudeCore) -> *const c_char {
    core.as_ref()
        .and_then(|c| c.last_response.as_ref())
        .map_or(ptr::null(), |s| s.as_ptr())
}

/// Message of the last failure, null if the last call succeeded
///
/// # Safety
/// `core` must be valid. The string is valid until the next call.
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_last_error(core: *const PlaudClaudeCore) -> *const c_char {
    core.as_ref()
        .and_then(|c| c.last_error.as_ref())
        .map_or(ptr::null(), |s| s.as_ptr())
}

/// HTTP status of the last `StatusError`, 0 otherwise
///
/// # Safety
/// `core` must be valid
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_last_status(core: *const PlaudClaudeCore) -> u16 {
    core.as_ref().map_or(0, |c| c.last_status)
}

/// Render a modal to HTML without mounting it
/// Returns a thread-local string pointer (do not free)
///
/// # Safety
/// `title` and `content` must be valid C strings
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_render_modal(
    title: *const c_char,
    content: *const c_char,
    trusted_html: bool,
) -> *const c_char {
    let (Some(title), Some(content)) = (req_str(title), req_str(content)) else {
        return ptr::null();
    };
    let content = if trusted_html {
        ModalContent::TrustedHtml(content.to_string())
    } else {
        ModalContent::Text(content.to_string())
    };
    stash(&RENDERED, Modal::new(title, content).element().to_html())
}

/// Mount an escaped-text modal in the document body; returns its id, 0 on
/// error or when the plugin is not loaded
///
/// # Safety
/// `core` must be valid, `title` and `content` must be valid C strings
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_show_modal(
    core: *mut PlaudClaudeCore,
    title: *const c_char,
    content: *const c_char,
) -> u64 {
    let (Some(core), Some(title), Some(content)) = (core.as_mut(), req_str(title), req_str(content)) else {
        return 0;
    };
    if core.plugin.state() != LifecycleState::Loaded {
        core.not_loaded();
        return 0;
    }
    crate::ui::show_modal(core.plugin.body_mut(), title, content).as_u64()
}

/// Close-button action for a mounted modal
///
/// # Safety
/// `core` must be valid
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_close_modal(core: *mut PlaudClaudeCore, id: u64) -> bool {
    match core.as_mut() {
        Some(core) => Modal::close(core.plugin.body_mut(), ElementId::from_u64(id)),
        None => false,
    }
}

/// Render everything mounted in the document body
/// Returns a thread-local string pointer (do not free)
///
/// # Safety
/// `core` must be valid
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_render_body(core: *const PlaudClaudeCore) -> *const c_char {
    match core.as_ref() {
        Some(core) => stash(&RENDERED, core.plugin.body().render()),
        None => ptr::null(),
    }
}

/// Render the ribbon bar
/// Returns a thread-local string pointer (do not free)
///
/// # Safety
/// `core` must be valid
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_render_ribbons(core: *const PlaudClaudeCore) -> *const c_char {
    match core.as_ref() {
        Some(core) => stash(&RENDERED, core.plugin.ribbon_bar().render()),
        None => ptr::null(),
    }
}

/// Forward a click on the plugin's ribbon button
///
/// # Safety
/// `core` must be valid
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_ribbon_click(core: *const PlaudClaudeCore) -> bool {
    match core.as_ref().and_then(|c| c.plugin.ribbon()) {
        Some(ribbon) => {
            ribbon.click();
            true
        }
        None => false,
    }
}

/// Number of ribbon clicks since load
///
/// # Safety
/// `core` must be valid
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_ribbon_clicks(core: *const PlaudClaudeCore) -> u64 {
    core.as_ref().map_or(0, |c| c.plugin.ribbon_clicks() as u64)
}

/// Queue recordings already sitting in the inbox; returns how many were added,
/// -1 on error
///
/// # Safety
/// `core` must be valid
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_inbox_scan(core: *mut PlaudClaudeCore) -> i32 {
    let core = match core.as_mut() {
        Some(c) => c,
        None => return -1,
    };
    let result = match core.plugin.inbox() {
        Some(inbox) => inbox.scan(),
        None => {
            core.not_loaded();
            return -1;
        }
    };
    match result {
        Ok(n) => i32::try_from(n).unwrap_or(i32::MAX),
        Err(e) => {
            core.fail(CResultCode::InboxError, e.to_string());
            -1
        }
    }
}

/// Next pending recording path, null when none is waiting
///
/// # Safety
/// `core` must be valid. The string is valid until the next call.
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_inbox_next(core: *mut PlaudClaudeCore) -> *const c_char {
    let core = match core.as_mut() {
        Some(c) => c,
        None => return ptr::null(),
    };
    if let Some(inbox) = core.plugin.inbox() {
        let mut fresh = inbox.take_pending();
        fresh.reverse();
        fresh.append(&mut core.pending);
        core.pending = fresh;
    }
    match core.pending.pop() {
        Some(path) => {
            core.last_path = CString::new(path.to_string_lossy().into_owned()).ok();
            core.last_path.as_ref().map_or(ptr::null(), |s| s.as_ptr())
        }
        None => ptr::null(),
    }
}

/// Record a recording's file name as processed
///
/// # Safety
/// `core` must be valid, `name` must be a valid C string
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_inbox_mark_processed(
    core: *mut PlaudClaudeCore,
    name: *const c_char,
) -> CResultCode {
    let core = match core.as_mut() {
        Some(c) => c,
        None => return CResultCode::InvalidArgument,
    };
    let Some(name) = req_str(name) else {
        return core.fail(CResultCode::InvalidArgument, "name is required");
    };
    let result = match core.plugin.inbox() {
        Some(inbox) => inbox.mark_processed(name),
        None => return core.not_loaded(),
    };
    match result {
        Ok(()) => CResultCode::Ok,
        Err(e) => core.fail(CResultCode::InboxError, e.to_string()),
    }
}

/// Move a recording into the inbox's `processed/` archive and mark it processed
///
/// # Safety
/// `core` must be valid, `name` must be a valid C string
#[no_mangle]
pub unsafe extern "C" fn plaud_claude_core_inbox_archive(
    core: *mut PlaudClaudeCore,
    name: *const c_char,
) -> CResultCode {
    let core = match core.as_mut() {
        Some(c) => c,
        None => return CResultCode::InvalidArgument,
    };
    let Some(name) = req_str(name) else {
        return core.fail(CResultCode::InvalidArgument, "name is required");
    };
    let result = match core.plugin.inbox() {
        Some(inbox) => inbox.archive(name),
        None => return core.not_loaded(),
    };
    match result {
        Ok(_) => CResultCode::Ok,
        Err(e) => core.fail(CResultCode::InboxError, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::blocking;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    unsafe fn read(ptr: *const c_char) -> Option<String> {
        (!ptr.is_null()).then(|| CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }

    fn write_settings(dir: &Path, settings: Value) -> CString {
        let path = dir.join("settings.json");
        fs::write(&path, json!({ "settings": settings }).to_string()).unwrap();
        c(path.to_str().unwrap())
    }

    unsafe fn loaded_core(settings_path: &CString) -> *mut PlaudClaudeCore {
        let core = plaud_claude_core_new(settings_path.as_ptr());
        assert_eq!(plaud_claude_core_load(core), CResultCode::Ok);
        core
    }

    /// Outcome of one API call as seen through the C surface
    #[derive(Debug)]
    struct Outcome {
        code: CResultCode,
        status: u16,
        error: Option<String>,
        response: Option<String>,
    }

    unsafe fn outcome(core: *const PlaudClaudeCore, code: CResultCode) -> Outcome {
        Outcome {
            code,
            status: plaud_claude_core_last_status(core),
            error: read(plaud_claude_core_last_error(core)),
            response: read(plaud_claude_core_last_response(core)),
        }
    }

    #[test]
    fn test_lifecycle_and_preferences() {
        let dir = tempfile::tempdir().unwrap();
        let path = c(dir.path().join("settings.json").to_str().unwrap());

        unsafe {
            let core = plaud_claude_core_new(path.as_ptr());
            assert!(!core.is_null());

            let key = c("fontSize");
            let value = c("14");
            assert_eq!(
                plaud_claude_core_set_preference(core, key.as_ptr(), value.as_ptr()),
                CResultCode::InvalidState
            );

            assert_eq!(plaud_claude_core_load(core), CResultCode::Ok);
            assert_eq!(
                plaud_claude_core_set_preference(core, key.as_ptr(), value.as_ptr()),
                CResultCode::Ok
            );
            assert_eq!(read(plaud_claude_core_get_preference(core, key.as_ptr())).as_deref(), Some("14"));
            let missing = c("missing");
            assert!(plaud_claude_core_get_preference(core, missing.as_ptr()).is_null());

            let bad = c("{oops");
            assert_eq!(
                plaud_claude_core_set_preference(core, key.as_ptr(), bad.as_ptr()),
                CResultCode::InvalidArgument
            );

            assert!(plaud_claude_core_ribbon_click(core));
            assert_eq!(plaud_claude_core_ribbon_clicks(core), 1);

            assert_eq!(plaud_claude_core_unload(core), CResultCode::Ok);
            assert_eq!(plaud_claude_core_load(core), CResultCode::InvalidState);
            assert!(read(plaud_claude_core_last_error(core)).unwrap().contains("unloaded"));
            plaud_claude_core_free(core);
        }

        let saved = fs::read_to_string(dir.path().join("settings.json")).unwrap();
        assert!(saved.contains("fontSize"));
    }

    #[test]
    fn test_network_error_code() {
        let dir = tempfile::tempdir().unwrap();
        let settings = dir.path().join("settings.json");
        fs::write(
            &settings,
            r#"{"settings": {"claude_base_url": "http://127.0.0.1:1", "request_timeout_secs": 2}}"#,
        )
        .unwrap();
        let path = c(settings.to_str().unwrap());

        unsafe {
            let core = plaud_claude_core_new(path.as_ptr());
            assert_eq!(plaud_claude_core_load(core), CResultCode::Ok);
            let prompt = c("hello");
            assert_eq!(
                plaud_claude_core_claude_prompt(core, prompt.as_ptr()),
                CResultCode::NetworkError
            );
            assert!(plaud_claude_core_last_response(core).is_null());
            assert!(read(plaud_claude_core_last_error(core)).unwrap().starts_with("Network error"));
            assert_eq!(plaud_claude_core_last_status(core), 0);
            plaud_claude_core_free(core);
        }
    }

    #[test]
    fn test_modal_show_render_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = c(dir.path().join("settings.json").to_str().unwrap());

        unsafe {
            let core = plaud_claude_core_new(path.as_ptr());
            assert_eq!(plaud_claude_core_load(core), CResultCode::Ok);

            let title = c("Reply");
            let content = c("<b>hi</b>");
            let id = plaud_claude_core_show_modal(core, title.as_ptr(), content.as_ptr());
            assert_ne!(id, 0);
            let body = read(plaud_claude_core_render_body(core)).unwrap();
            assert!(body.contains("&lt;b&gt;hi&lt;/b&gt;"));

            assert!(plaud_claude_core_close_modal(core, id));
            assert_eq!(read(plaud_claude_core_render_body(core)).as_deref(), Some(""));

            let ribbons = read(plaud_claude_core_render_ribbons(core)).unwrap();
            assert_eq!(ribbons, "<div class=\"ribbon-element\">Ask Claude</div>");
            plaud_claude_core_free(core);
        }
    }

    #[test]
    fn test_render_modal_trusted_flag() {
        let title = c("T");
        let content = c("<i>x</i>");
        unsafe {
            let escaped = read(plaud_claude_core_render_modal(title.as_ptr(), content.as_ptr(), false)).unwrap();
            assert!(escaped.contains("&lt;i&gt;"));
            let trusted = read(plaud_claude_core_render_modal(title.as_ptr(), content.as_ptr(), true)).unwrap();
            assert!(trusted.contains("<i>x</i>"));
        }
    }

    #[test]
    fn test_null_core_is_rejected() {
        unsafe {
            assert_eq!(plaud_claude_core_load(ptr::null_mut()), CResultCode::InvalidArgument);
            assert!(plaud_claude_core_last_error(ptr::null()).is_null());
            assert_eq!(plaud_claude_core_inbox_scan(ptr::null_mut()), -1);
        }
    }

    #[tokio::test]
    async fn test_plaud_fetch_not_found_is_status_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/notes"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let settings = write_settings(dir.path(), json!({ "plaud_base_url": mock_server.uri() }));

        let result = blocking(move || unsafe {
            let core = loaded_core(&settings);
            let endpoint = c("notes");
            let code = plaud_claude_core_plaud_fetch(core, endpoint.as_ptr(), ptr::null());
            let result = outcome(core, code);
            plaud_claude_core_free(core);
            result
        })
        .await;

        assert_eq!(result.code, CResultCode::StatusError);
        assert_eq!(result.status, 404);
        assert!(result.error.unwrap().contains("Not Found"));
        assert!(result.response.is_none());
    }

    #[tokio::test]
    async fn test_plaud_fetch_non_json_is_malformed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let settings = write_settings(dir.path(), json!({ "plaud_base_url": mock_server.uri() }));

        let result = blocking(move || unsafe {
            let core = loaded_core(&settings);
            let endpoint = c("status");
            let get = c("GET");
            let code = plaud_claude_core_plaud_fetch(core, endpoint.as_ptr(), get.as_ptr());
            let result = outcome(core, code);
            plaud_claude_core_free(core);
            result
        })
        .await;

        assert_eq!(result.code, CResultCode::MalformedResponse);
        assert_eq!(result.status, 0);
        assert!(result.error.unwrap().starts_with("Malformed response"));
    }

    #[tokio::test]
    async fn test_plaud_send_returns_json_reply() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/transcribe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "job": "j-1" })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let settings = write_settings(dir.path(), json!({ "plaud_base_url": mock_server.uri() }));

        let result = blocking(move || unsafe {
            let core = loaded_core(&settings);
            let endpoint = c("transcribe");
            let payload = c(r#"{"file": "memo.m4a"}"#);
            let code = plaud_claude_core_plaud_send(core, endpoint.as_ptr(), payload.as_ptr());
            let result = outcome(core, code);
            plaud_claude_core_free(core);
            result
        })
        .await;

        assert_eq!(result.code, CResultCode::Ok);
        assert!(result.error.is_none());
        let reply: Value = serde_json::from_str(&result.response.unwrap()).unwrap();
        assert_eq!(reply, json!({ "job": "j-1" }));
    }

    #[tokio::test]
    async fn test_claude_prompt_codes() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "hi" })))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "hi" })))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "response": "a\u{0}b" })),
            )
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let settings = write_settings(dir.path(), json!({ "claude_base_url": mock_server.uri() }));

        let results = blocking(move || unsafe {
            let core = loaded_core(&settings);
            let prompt = c("hello");
            let results: Vec<Outcome> = (0..3)
                .map(|_| {
                    let code = plaud_claude_core_claude_prompt(core, prompt.as_ptr());
                    outcome(core, code)
                })
                .collect();
            plaud_claude_core_free(core);
            results
        })
        .await;

        assert_eq!(results[0].code, CResultCode::Ok);
        assert_eq!(results[0].response.as_deref(), Some("hi"));

        assert_eq!(results[1].code, CResultCode::MalformedResponse);
        assert!(results[1].response.is_none());

        assert_eq!(results[2].code, CResultCode::MalformedResponse);
        assert!(results[2].response.is_none());
        assert!(results[2].error.as_deref().unwrap().contains("NUL"));
    }

    #[test]
    fn test_inbox_next_is_fifo_then_empty() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = dir.path().join("inbox");
        fs::create_dir_all(&inbox).unwrap();
        for name in ["b.m4a", "a.m4a", "c.m4a"] {
            fs::write(inbox.join(name), b"audio").unwrap();
        }
        let settings = write_settings(
            dir.path(),
            json!({ "inbox_dir": inbox, "inbox_settle_secs": 0 }),
        );

        unsafe {
            let core = loaded_core(&settings);
            assert_eq!(plaud_claude_core_inbox_scan(core), 3);

            let mut names = Vec::new();
            while let Some(next) = read(plaud_claude_core_inbox_next(core)) {
                names.push(Path::new(&next).file_name().unwrap().to_string_lossy().into_owned());
            }
            assert_eq!(names, vec!["a.m4a", "b.m4a", "c.m4a"]);
            assert!(plaud_claude_core_inbox_next(core).is_null());
            assert_eq!(plaud_claude_core_inbox_scan(core), 0);

            let name = c("a.m4a");
            assert_eq!(plaud_claude_core_inbox_archive(core, name.as_ptr()), CResultCode::Ok);
            assert!(inbox.join("processed").join("a.m4a").is_file());
            assert_eq!(
                plaud_claude_core_inbox_archive(core, name.as_ptr()),
                CResultCode::InboxError
            );
            plaud_claude_core_free(core);
        }
    }

    #[test]
    fn test_show_modal_requires_loaded_plugin() {
        let dir = tempfile::tempdir().unwrap();
        let path = c(dir.path().join("settings.json").to_str().unwrap());
        let title = c("Reply");
        let content = c("hi");

        unsafe {
            let core = plaud_claude_core_new(path.as_ptr());
            assert_eq!(plaud_claude_core_show_modal(core, title.as_ptr(), content.as_ptr()), 0);

            assert_eq!(plaud_claude_core_load(core), CResultCode::Ok);
            assert_ne!(plaud_claude_core_show_modal(core, title.as_ptr(), content.as_ptr()), 0);

            assert_eq!(plaud_claude_core_unload(core), CResultCode::Ok);
            assert_eq!(plaud_claude_core_show_modal(core, title.as_ptr(), content.as_ptr()), 0);
            assert_eq!(read(plaud_claude_core_render_body(core)).as_deref(), Some(""));
            plaud_claude_core_free(core);
        }
    }
}
