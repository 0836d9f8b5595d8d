use anyhow::Context;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: String,
    /// `None` leaves the transport without a timeout.
    pub http_timeout: Option<Duration>,
    pub log_filter: String,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            http_timeout: Some(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS)),
            log_filter: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut cfg = Config::default();
        let get = |k: &str| get(k).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("CAMPUSD_API_URL") {
            cfg.api_base_url = parse_api_url(&url).context("invalid CAMPUSD_API_URL")?;
        }
        if let Some(raw) = get("CAMPUSD_HTTP_TIMEOUT_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid CAMPUSD_HTTP_TIMEOUT_SECS: {}", raw))?;
            cfg.http_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(filter) = get("CAMPUSD_LOG").or_else(|| get("RUST_LOG")) {
            cfg.log_filter = filter;
        }
        if let Some(raw) = get("CAMPUSD_LOG_FORMAT") {
            cfg.log_format = match raw.trim().to_ascii_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                other => anyhow::bail!("invalid CAMPUSD_LOG_FORMAT: {}", other),
            };
        }
        Ok(cfg)
    }
}

pub fn parse_api_url(raw: &str) -> anyhow::Result<String> {
    let url = raw.trim().trim_end_matches('/');
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!("api url must start with http:// or https://: {}", raw);
    }
    Ok(url.to_string())
}
