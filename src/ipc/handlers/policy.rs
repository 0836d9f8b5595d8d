use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::policy::{self, Capability, CapabilitySet, Role};
use serde_json::json;

fn handle_roles(req: &Request) -> serde_json::Value {
    let roles: Vec<_> = Role::ALL
        .iter()
        .map(|r| json!({ "roleId": r.id(), "name": r.display_name() }))
        .collect();
    ok(&req.id, json!({ "roles": roles }))
}

fn handle_capabilities(req: &Request) -> serde_json::Value {
    let Some(role_id) = req.params.get("roleId").and_then(|v| v.as_i64()) else {
        return err(&req.id, "bad_params", "roleId must be an integer", None);
    };
    if let Some(raw) = req.params.get("capability") {
        let Some(cap) = raw.as_str().and_then(Capability::parse) else {
            return err(&req.id, "bad_params", "unknown capability", Some(raw.clone()));
        };
        return ok(
            &req.id,
            json!({
                "roleId": role_id,
                "capability": cap.key(),
                "granted": policy::has_capability(role_id, cap),
            }),
        );
    }
    ok(
        &req.id,
        json!({
            "roleId": role_id,
            "roleName": policy::role_name(role_id),
            "capabilities": CapabilitySet::for_role_id(role_id),
        }),
    )
}

fn handle_map_role(req: &Request) -> serde_json::Value {
    let Some(label) = req.params.get("label").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.label", None);
    };
    let role = Role::from_label(label);
    ok(
        &req.id,
        json!({ "roleId": role.id(), "name": role.display_name() }),
    )
}

pub fn try_handle(_state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "policy.roles" => Some(handle_roles(req)),
        "policy.capabilities" => Some(handle_capabilities(req)),
        "policy.mapRole" => Some(handle_map_role(req)),
        _ => None,
    }
}
