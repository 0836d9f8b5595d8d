use crate::policy::{self, Role};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix of tokens minted locally when the remote API does not return one.
pub const PLACEHOLDER_TOKEN_PREFIX: &str = "local-";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameParts {
    pub primary: String,
    pub secondary: String,
}

impl NameParts {
    /// Splits a combined name ("Ana Maria") into its first two tokens.
    /// An absent field yields two empty parts; a field that splits into
    /// nothing keeps the raw string as primary.
    pub fn split(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        let mut tokens = raw.split_whitespace();
        let primary = tokens.next().unwrap_or(raw).to_string();
        let secondary = tokens.next().unwrap_or("").to_string();
        Self { primary, secondary }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: i64,
    pub email: String,
    pub given_names: NameParts,
    pub family_names: NameParts,
    pub role: Role,
    pub role_name: String,
    pub token: String,
    /// False when `token` is a local placeholder. Placeholders carry no
    /// authority and are never sent to the remote API.
    pub has_token: bool,
}

impl Identity {
    /// Normalizes a remote login payload. Returns `None` when the payload
    /// lacks `correo` or `rol`.
    pub fn from_login_payload(payload: &Value) -> Option<Self> {
        let user = ["usuario", "user"]
            .iter()
            .find_map(|k| payload.get(*k).filter(|v| v.is_object()))
            .unwrap_or(payload);

        let email = non_empty_str(user.get("correo"))?;
        let role_label = user.get("rol").and_then(|v| v.as_str())?;
        let role = Role::from_label(role_label);

        let remote_token = non_empty_str(user.get("token"))
            .or_else(|| non_empty_str(payload.get("token")));
        let (token, has_token) = match remote_token {
            Some(t) => (t.to_string(), true),
            None => (placeholder_token(), false),
        };

        Some(Self {
            user_id: parse_user_id(user.get("usuarioId")),
            email: email.to_string(),
            given_names: NameParts::split(user.get("nombre").and_then(|v| v.as_str())),
            family_names: NameParts::split(user.get("apellido").and_then(|v| v.as_str())),
            role,
            role_name: policy::role_name(role.id()).to_string(),
            token,
            has_token,
        })
    }

    pub fn role_id(&self) -> i64 {
        self.role.id()
    }

    pub fn display_name(&self) -> String {
        let parts = [
            self.given_names.primary.as_str(),
            self.family_names.primary.as_str(),
        ];
        let joined = parts
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            self.email.clone()
        } else {
            joined
        }
    }
}

/// Trimmed value, or `None` when absent or blank. Callers persist the
/// trimmed form.
fn non_empty_str(v: Option<&Value>) -> Option<&str> {
    v.and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_user_id(v: Option<&Value>) -> i64 {
    match v {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    }
}

fn placeholder_token() -> String {
    format!("{}{}", PLACEHOLDER_TOKEN_PREFIX, uuid::Uuid::new_v4())
}
