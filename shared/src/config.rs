use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};

pub const DEFAULT_PLAGIARISM_API_URL: &str = "http://127.0.0.1:5000/api/compare";

fn default_plagiarism_api_url() -> String {
    DEFAULT_PLAGIARISM_API_URL.into()
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    3000
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

/// Runtime settings, read from the process environment.
///
/// Every key maps to the upper-case variable of the same name, e.g.
/// `plagiarism_api_url` ← `PLAGIARISM_API_URL`.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_plagiarism_api_url")]
    pub plagiarism_api_url: String,
    /// Raw `ALLOWED_HOSTS` value, comma and/or whitespace separated.
    #[serde(default)]
    pub allowed_hosts: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Number of HTTP workers; `0` lets actix pick one per CPU.
    #[serde(default)]
    pub web_concurrency: usize,
    #[serde(default)]
    pub secret_key_base: Option<String>,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            plagiarism_api_url: default_plagiarism_api_url(),
            allowed_hosts: String::new(),
            host: default_host(),
            port: default_port(),
            web_concurrency: 0,
            secret_key_base: None,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Settings {
    pub fn new() -> std::result::Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Parsed backend endpoint. Only `http` and `https` are accepted.
    pub fn api_url(&self) -> Result<Url> {
        let url = Url::parse(self.plagiarism_api_url.trim())
            .map_err(|e| AppError::Config(format!("PLAGIARISM_API_URL: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(AppError::Config(format!(
                "PLAGIARISM_API_URL: unsupported scheme {other}"
            ))),
        }
    }

    /// Host names accepted by the front end. Empty means "allow all".
    pub fn allowed_hosts(&self) -> Vec<String> {
        parse_host_list(&self.allowed_hosts)
    }
}

/// Splits a host list on commas and whitespace, dropping empty entries.
pub fn parse_host_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_ascii_lowercase())
        .collect()
}
