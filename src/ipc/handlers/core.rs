use crate::config;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::remote::HttpAuthApi;
use crate::session::SessionManager;
use crate::store::SessionStore;
use serde_json::json;
use std::path::PathBuf;

const API_URL_KEY: &str = "config.apiBaseUrl";

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "apiBaseUrl": state.api_base_url,
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };
    let url_override = match req.params.get("apiBaseUrl") {
        None | Some(serde_json::Value::Null) => None,
        Some(v) => match v.as_str().map(config::parse_api_url) {
            Some(Ok(url)) => Some(url),
            Some(Err(e)) => return err(&req.id, "bad_params", e.to_string(), None),
            None => return err(&req.id, "bad_params", "apiBaseUrl must be a string", None),
        },
    };

    let store = match SessionStore::open(&path) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:#}"), None),
    };

    // An explicit override is remembered for this workspace; otherwise reuse
    // whatever was remembered, falling back to the process config.
    let api_base_url = match url_override {
        Some(url) => {
            if let Err(e) = store.set(API_URL_KEY, &url) {
                return err(&req.id, "db_update_failed", e.to_string(), None);
            }
            url
        }
        None => match store.get(API_URL_KEY) {
            Ok(Some(saved)) => saved,
            Ok(None) => state.config.api_base_url.clone(),
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        },
    };

    let api = match HttpAuthApi::new(&api_base_url, state.config.http_timeout) {
        Ok(api) => api,
        Err(e) => return err(&req.id, "http_client_failed", e.to_string(), None),
    };

    tracing::info!(
        workspace = %path.to_string_lossy(),
        api = %api.base_url(),
        "workspace selected"
    );
    let mut session = SessionManager::new(Box::new(api), store);
    session.restore();

    let snapshot = session.snapshot();
    state.workspace = Some(path.clone());
    state.api_base_url = api_base_url.clone();
    state.session = Some(session);
    ok(
        &req.id,
        json!({
            "workspacePath": path.to_string_lossy(),
            "apiBaseUrl": api_base_url,
            "session": snapshot,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
