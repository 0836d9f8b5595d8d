use std::path::PathBuf;

use serde::Deserialize;

use crate::access::AccessTable;
use crate::config::Config;
use crate::session::SessionManager;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Config,
    pub workspace: Option<PathBuf>,
    pub api_base_url: String,
    pub session: Option<SessionManager>,
    pub access: AccessTable,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            api_base_url: config.api_base_url.clone(),
            config,
            workspace: None,
            session: None,
            access: AccessTable::default(),
        }
    }
}
