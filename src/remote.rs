use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::AuthError;

/// Remote authentication endpoints. Implementations return the raw JSON
/// body of a successful login; normalizing it is the session manager's job.
pub trait AuthApi {
    fn login(&self, email: &str, password: &str) -> Result<Value, AuthError>;

    /// Best-effort server-side session teardown.
    fn logout(&self, token: &str) -> Result<(), AuthError>;
}

pub struct HttpAuthApi {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpAuthApi {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            anyhow::bail!("api base url must not be empty");
        }
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(t) = timeout {
            builder = builder.connect_timeout(t).timeout(t);
        }
        let client = builder.build()?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

impl AuthApi for HttpAuthApi {
    fn login(&self, email: &str, password: &str) -> Result<Value, AuthError> {
        let url = self.url("/auth/login");
        tracing::debug!(%url, "remote login");
        let resp = self
            .client
            .post(&url)
            .json(&LoginRequest { email, password })
            .send()
            .map_err(|e| AuthError::transport(Some(e.to_string())))?;

        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| AuthError::transport(Some(e.to_string())))?;
        let body: Option<Value> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "remote login refused");
            return Err(AuthError::rejected(body.as_ref().and_then(message_field)));
        }
        match body {
            Some(v) => Ok(v),
            None => Err(AuthError::rejected(None)),
        }
    }

    fn logout(&self, token: &str) -> Result<(), AuthError> {
        let url = self.url("/auth/logout");
        tracing::debug!(%url, "remote logout");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .send()
            .map_err(|e| AuthError::transport(Some(e.to_string())))?;
        if !resp.status().is_success() {
            return Err(AuthError::rejected(Some(format!(
                "logout returned {}",
                resp.status()
            ))));
        }
        Ok(())
    }
}

/// Human-readable message carried by an API response, used verbatim as the
/// surfaced error text.
pub fn message_field(body: &Value) -> Option<String> {
    ["message", "mensaje", "error"]
        .iter()
        .find_map(|k| body.get(*k).and_then(|v| v.as_str()))
        .map(str::to_string)
}
