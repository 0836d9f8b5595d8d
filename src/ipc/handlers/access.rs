use crate::access::{self, GuardOutcome, RawAccessEntry};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

fn parse_entries(v: &Value, key: &str) -> Result<Option<Vec<RawAccessEntry>>, String> {
    match v.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => serde_json::from_value(raw.clone())
            .map(Some)
            .map_err(|e| format!("invalid {}: {}", key, e)),
    }
}

fn handle_declare(state: &mut AppState, req: &Request) -> Value {
    let routes = match parse_entries(&req.params, "routes") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let nav = match parse_entries(&req.params, "nav") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };

    // Validate against a copy so a bad nav list leaves the routes untouched.
    let mut next = state.access.clone();
    if let Some(routes) = routes {
        if let Err(msg) = next.set_routes(routes) {
            return err(&req.id, "bad_params", msg, None);
        }
    }
    if let Some(nav) = nav {
        if let Err(msg) = next.set_nav(nav) {
            return err(&req.id, "bad_params", msg, None);
        }
    }
    state.access = next;
    ok(
        &req.id,
        json!({
            "routeCount": state.access.routes().len(),
            "navCount": state.access.nav().len(),
        }),
    )
}

fn handle_routes_list(state: &mut AppState, req: &Request) -> Value {
    ok(&req.id, json!({ "routes": state.access.routes() }))
}

fn handle_allowed_roles(state: &mut AppState, req: &Request) -> Value {
    let Some(path) = req.params.get("path").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };
    match state.access.allowed_roles(path) {
        Some(roles) => {
            let ids: Vec<i64> = roles.iter().map(|r| r.id()).collect();
            ok(&req.id, json!({ "path": path, "allowedRoles": ids }))
        }
        None => err(
            &req.id,
            "unknown_route",
            format!("route not declared: {}", path),
            None,
        ),
    }
}

fn handle_guard(state: &mut AppState, req: &Request) -> Value {
    let Some(path) = req.params.get("path").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };
    let Some(destination) = state.access.destination(path) else {
        return err(
            &req.id,
            "unknown_route",
            format!("route not declared: {}", path),
            None,
        );
    };

    // Before a workspace is selected nothing has been restored, so there is no identity.
    let identity = state.session.as_ref().and_then(|s| s.identity());
    match access::guard(destination, identity) {
        GuardOutcome::Allow => ok(&req.id, json!({ "outcome": "allow", "path": destination.path })),
        GuardOutcome::RedirectTo(to) => {
            tracing::debug!(path = %destination.path, to = %to, "navigation redirected");
            ok(
                &req.id,
                json!({ "outcome": "redirect", "path": destination.path, "to": to }),
            )
        }
    }
}

fn handle_nav_visible(state: &mut AppState, req: &Request) -> Value {
    let identity = state.session.as_ref().and_then(|s| s.identity());
    let entries = access::visible_entries(state.access.nav(), identity);
    ok(&req.id, json!({ "entries": entries }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "access.declare" => Some(handle_declare(state, req)),
        "routes.list" => Some(handle_routes_list(state, req)),
        "routes.allowedRoles" => Some(handle_allowed_roles(state, req)),
        "route.guard" => Some(handle_guard(state, req)),
        "nav.visible" => Some(handle_nav_visible(state, req)),
        _ => None,
    }
}
