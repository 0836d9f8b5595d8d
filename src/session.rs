use serde::Serialize;
use serde_json::json;

use crate::error::AuthError;
use crate::identity::Identity;
use crate::policy::CapabilitySet;
use crate::remote::{self, AuthApi};
use crate::store::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    LoggedOut,
    Authenticating,
    LoggedIn,
    Restoring,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Owns the login lifecycle for one workspace. Exactly one instance lives in
/// the process state; handlers borrow it.
pub struct SessionManager {
    api: Box<dyn AuthApi>,
    store: SessionStore,
    state: SessionState,
    identity: Option<Identity>,
}

impl SessionManager {
    pub fn new(api: Box<dyn AuthApi>, store: SessionStore) -> Self {
        Self {
            api,
            store,
            state: SessionState::LoggedOut,
            identity: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self.state {
            SessionState::LoggedIn => self.identity.as_ref(),
            _ => None,
        }
    }

    /// Recomputed from the current identity on every call.
    pub fn capabilities(&self) -> CapabilitySet {
        match self.identity() {
            Some(id) => CapabilitySet::for_role_id(id.role_id()),
            None => CapabilitySet::none(),
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn login(&mut self, email: &str, password: &str) -> LoginOutcome {
        self.state = SessionState::Authenticating;
        self.identity = None;

        match self.authenticate(email, password) {
            Ok(identity) => {
                tracing::info!(
                    email = %identity.email,
                    role = identity.role_id(),
                    has_token = identity.has_token,
                    "login succeeded"
                );
                self.identity = Some(identity);
                self.state = SessionState::LoggedIn;
                LoginOutcome {
                    success: true,
                    message: None,
                }
            }
            Err(e) => {
                tracing::info!(email, error = %e, "login failed");
                self.state = SessionState::LoggedOut;
                LoginOutcome {
                    success: false,
                    message: Some(e.to_string()),
                }
            }
        }
    }

    fn authenticate(&mut self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let payload = self.api.login(email.trim(), password)?;
        let identity = Identity::from_login_payload(&payload)
            .ok_or_else(|| AuthError::rejected(remote::message_field(&payload)))?;
        self.store.save(&identity).map_err(|e| {
            tracing::error!(error = %e, "failed to persist session");
            AuthError::Rejected(format!("no se pudo guardar la sesión: {}", e))
        })?;
        Ok(identity)
    }

    /// Always ends LoggedOut. Remote and storage failures are logged only.
    pub fn logout(&mut self) {
        if let Some(identity) = self.identity.take() {
            if identity.has_token {
                if let Err(e) = self.api.logout(&identity.token) {
                    tracing::warn!(error = %e, "remote logout failed");
                }
            }
            tracing::info!(email = %identity.email, "logged out");
        }
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "failed to clear stored session");
        }
        self.state = SessionState::LoggedOut;
    }

    /// Adopts a stored session without a remote round trip. Anything that
    /// fails to parse is treated as a logout.
    pub fn restore(&mut self) -> SessionState {
        self.state = SessionState::Restoring;
        self.identity = None;

        match self.read_stored() {
            Ok(Some(identity)) => {
                tracing::info!(email = %identity.email, role = identity.role_id(), "session restored");
                self.identity = Some(identity);
                self.state = SessionState::LoggedIn;
            }
            Ok(None) => {
                self.state = SessionState::LoggedOut;
            }
            Err(e) => {
                tracing::warn!(error = %e, "discarding stored session");
                if let Err(e) = self.store.clear() {
                    tracing::warn!(error = %e, "failed to clear stored session");
                }
                self.state = SessionState::LoggedOut;
            }
        }
        self.state
    }

    fn read_stored(&self) -> Result<Option<Identity>, AuthError> {
        let entries = self
            .store
            .load()
            .map_err(|e| AuthError::RestorationCorrupt(e.to_string()))?;
        let Some(entries) = entries else {
            return Ok(None);
        };
        let identity: Identity = serde_json::from_str(&entries.identity_json)
            .map_err(|e| AuthError::RestorationCorrupt(e.to_string()))?;
        if identity.token != entries.token {
            return Err(AuthError::RestorationCorrupt(
                "token entry does not match identity".to_string(),
            ));
        }
        Ok(Some(identity))
    }

    pub fn snapshot(&self) -> serde_json::Value {
        json!({
            "state": self.state(),
            "identity": self.identity().map(public_identity),
            "capabilities": self.capabilities(),
        })
    }
}

/// Identity as shown to the UI; the token itself stays in the sidecar.
fn public_identity(identity: &Identity) -> serde_json::Value {
    json!({
        "userId": identity.user_id,
        "email": identity.email,
        "givenNames": identity.given_names,
        "familyNames": identity.family_names,
        "displayName": identity.display_name(),
        "roleId": identity.role_id(),
        "roleName": identity.role_name,
        "hasToken": identity.has_token,
    })
}
